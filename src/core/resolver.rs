//! Resolves a surface registry into an index-addressed render tree.
//!
//! Components reference their children by id, and the graph comes from a
//! server (often model-authored), so resolution tracks the ids on the active
//! path and refuses to re-enter one. A repeat is treated as a missing
//! component and recorded as a [`Diagnostic`]. Depth and total node count
//! are bounded as well so diamond-shaped graphs cannot blow up; once the
//! node budget is spent no new component is entered, but containers that
//! are already open still close over the children they got.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::component::{
    Action, ButtonProps, ChartProps, ComponentKind, ComponentRegistry, ContainerProps,
    IFrameProps, ImageProps, StyleSpec, TextFieldProps, TextProps,
};
use crate::core::data_store::DataStore;

pub type NodeId = usize;

pub const MAX_DEPTH: usize = 64;
pub const MAX_NODES: usize = 4096;
pub const DEFAULT_IFRAME_HEIGHT: u32 = 300;
const DEFAULT_BUTTON_LABEL: &str = "Button";
const DEFAULT_FIELD_LABEL: &str = "Label";
const DEFAULT_IMAGE_ALT: &str = "Image";

/// Verbatim `style` overrides, values stringified.
pub type StyleOverrides = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRole {
    Body,
    Heading(u8),
    Caption,
    Link,
    NewsTitle,
    NewsPublisher,
    NewsDate,
    HeaderTitle,
    HeaderSubtitle,
    Custom(String),
}

impl TextRole {
    /// Link roles only apply when there is somewhere to go.
    pub fn from_hint(hint: Option<&str>, has_url: bool) -> Self {
        match hint.unwrap_or("body") {
            "body" => TextRole::Body,
            "h1" => TextRole::Heading(1),
            "h2" => TextRole::Heading(2),
            "h3" => TextRole::Heading(3),
            "caption" => TextRole::Caption,
            "link" if has_url => TextRole::Link,
            "news-title" if has_url => TextRole::NewsTitle,
            "news-publisher" => TextRole::NewsPublisher,
            "news-date" => TextRole::NewsDate,
            "news-header-title" => TextRole::HeaderTitle,
            "news-header-subtitle" => TextRole::HeaderSubtitle,
            other => TextRole::Custom(other.to_string()),
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, TextRole::Link | TextRole::NewsTitle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPreset {
    Plain,
    Card,
    Header,
    /// Inline metadata row (publisher, date).
    Meta,
    /// Children share the row width equally.
    EvenSplit,
}

impl LayoutPreset {
    fn from_name(axis: Axis, name: &str) -> Self {
        match (axis, name) {
            (Axis::Vertical, "news-card" | "product-card") => LayoutPreset::Card,
            (Axis::Vertical, "news-header") => LayoutPreset::Header,
            (Axis::Horizontal, "news-meta") => LayoutPreset::Meta,
            (Axis::Horizontal, "product-row") => LayoutPreset::EvenSplit,
            _ => LayoutPreset::Plain,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameWidth {
    Full,
    Pixels(u32),
    Css(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Area,
    Line,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSample {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    /// Position in the declared series list; drives palette rotation.
    pub index: usize,
    pub kind: SeriesKind,
    pub color: Option<String>,
    pub points: Vec<ChartSample>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSpec {
    pub series: Vec<ChartSeries>,
}

impl ChartSpec {
    pub const MIN_POINTS: usize = 2;

    fn from_props(props: &ChartProps) -> Self {
        let to_samples = |points: &[crate::core::component::ChartPoint]| {
            points
                .iter()
                .map(|p| ChartSample {
                    label: value_label(&p.time),
                    value: p.value,
                })
                .collect::<Vec<_>>()
        };

        let series = if props.series.is_empty() {
            if props.data.len() < Self::MIN_POINTS {
                Vec::new()
            } else {
                vec![ChartSeries {
                    index: 0,
                    kind: SeriesKind::Area,
                    color: props.color.clone(),
                    points: to_samples(&props.data),
                }]
            }
        } else {
            props
                .series
                .iter()
                .enumerate()
                .filter(|(_, s)| s.data.len() >= Self::MIN_POINTS)
                .map(|(index, s)| ChartSeries {
                    index,
                    kind: if index == 0 {
                        SeriesKind::Area
                    } else {
                        SeriesKind::Line
                    },
                    color: s.color.clone(),
                    points: to_samples(&s.data),
                })
                .collect()
        };

        ChartSpec { series }
    }

    /// True when nothing has enough points to plot.
    pub fn is_placeholder(&self) -> bool {
        self.series.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Text {
        content: String,
        role: TextRole,
        link: Option<String>,
        style: StyleOverrides,
    },
    TextField {
        label: String,
        binding: Option<String>,
        value: String,
    },
    Button {
        label: String,
        action: Option<Action>,
    },
    Container {
        axis: Axis,
        preset: LayoutPreset,
        style: StyleOverrides,
        children: Vec<NodeId>,
    },
    Image {
        source: String,
        alt: String,
    },
    IFrame {
        source: String,
        width: FrameWidth,
        height: u32,
    },
    Chart(ChartSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub component_id: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Missing { id: String },
    Cycle { id: String },
    DepthLimit { id: String },
    NodeLimit { id: String },
    Unsupported { id: String, variant: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Missing { id } => write!(f, "component '{id}' not found"),
            Diagnostic::Cycle { id } => write!(f, "component '{id}' references itself"),
            Diagnostic::DepthLimit { id } => {
                write!(f, "component '{id}' exceeds nesting depth {MAX_DEPTH}")
            }
            Diagnostic::NodeLimit { id } => {
                write!(f, "component '{id}' exceeds the {MAX_NODES} node budget")
            }
            Diagnostic::Unsupported { id, variant } => {
                write!(f, "component '{id}' has unsupported shape ({variant})")
            }
        }
    }
}

/// An interactive element in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Button {
        node: NodeId,
        label: String,
        action: Option<Action>,
    },
    Field {
        node: NodeId,
        label: String,
        binding: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderTree {
    nodes: Vec<RenderNode>,
    root: Option<NodeId>,
    diagnostics: Vec<Diagnostic>,
}

impl RenderTree {
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_node(&self) -> Option<&RenderNode> {
        self.root.map(|id| &self.nodes[id])
    }

    pub fn node(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Buttons and fields reachable from the root, depth-first.
    pub fn controls(&self) -> Vec<Control> {
        let mut controls = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            match &node.kind {
                NodeKind::Button { label, action } => controls.push(Control::Button {
                    node: id,
                    label: label.clone(),
                    action: action.clone(),
                }),
                NodeKind::TextField { label, binding, .. } => controls.push(Control::Field {
                    node: id,
                    label: label.clone(),
                    binding: binding.clone(),
                }),
                NodeKind::Container { children, .. } => stack.extend(children.iter().rev()),
                _ => {}
            }
        }
        controls
    }
}

pub struct TreeResolver<'a> {
    registry: &'a ComponentRegistry,
    store: &'a DataStore,
    nodes: Vec<RenderNode>,
    active: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> TreeResolver<'a> {
    pub fn new(registry: &'a ComponentRegistry, store: &'a DataStore) -> Self {
        Self {
            registry,
            store,
            nodes: Vec::new(),
            active: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn resolve(mut self, root_id: &str) -> RenderTree {
        let root = self.resolve_id(root_id, 0);
        for diagnostic in &self.diagnostics {
            match diagnostic {
                Diagnostic::Missing { .. } | Diagnostic::Unsupported { .. } => {
                    debug!(%diagnostic, "dropped from surface")
                }
                _ => warn!(%diagnostic, "dropped from surface"),
            }
        }
        RenderTree {
            nodes: self.nodes,
            root,
            diagnostics: self.diagnostics,
        }
    }

    fn resolve_id(&mut self, id: &str, depth: usize) -> Option<NodeId> {
        if depth >= MAX_DEPTH {
            return self.reject(Diagnostic::DepthLimit { id: id.to_string() });
        }
        if self.nodes.len() >= MAX_NODES {
            return self.reject(Diagnostic::NodeLimit { id: id.to_string() });
        }
        let registry = self.registry;
        let Some(component) = registry.get(id) else {
            return self.reject(Diagnostic::Missing { id: id.to_string() });
        };
        if !self.active.insert(id.to_string()) {
            return self.reject(Diagnostic::Cycle { id: id.to_string() });
        }

        let kind = match &component.kind {
            ComponentKind::Text(props) => Some(self.text(props)),
            ComponentKind::TextField(props) => Some(self.text_field(props)),
            ComponentKind::Button(props) => Some(self.button(props)),
            ComponentKind::Column(props) => Some(self.container(Axis::Vertical, props, depth)),
            ComponentKind::Row(props) => Some(self.container(Axis::Horizontal, props, depth)),
            ComponentKind::Image(props) => Some(self.image(props)),
            ComponentKind::IFrame(props) => Some(iframe(props)),
            ComponentKind::Chart(props) => Some(NodeKind::Chart(ChartSpec::from_props(props))),
            ComponentKind::Unsupported(variant) => {
                self.diagnostics.push(Diagnostic::Unsupported {
                    id: id.to_string(),
                    variant: variant.clone(),
                });
                None
            }
        };

        self.active.remove(id);

        kind.map(|kind| {
            self.nodes.push(RenderNode {
                component_id: id.to_string(),
                kind,
            });
            self.nodes.len() - 1
        })
    }

    fn reject(&mut self, diagnostic: Diagnostic) -> Option<NodeId> {
        self.diagnostics.push(diagnostic);
        None
    }

    fn text(&self, props: &TextProps) -> NodeKind {
        let url = props
            .url
            .as_ref()
            .map(|u| u.read(self.store))
            .filter(|u| !u.is_empty());
        let role = TextRole::from_hint(props.usage_hint.as_deref(), url.is_some());
        let link = if role.is_link() { url } else { None };
        NodeKind::Text {
            content: props.text.read(self.store),
            role,
            link,
            style: style_overrides(props.style.as_ref()),
        }
    }

    fn text_field(&self, props: &TextFieldProps) -> NodeKind {
        let label = props
            .label
            .literal()
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_FIELD_LABEL)
            .to_string();
        let binding = props.text.path.clone();
        let value = binding
            .as_deref()
            .map(|path| self.store.get(path).to_string())
            .unwrap_or_default();
        NodeKind::TextField {
            label,
            binding,
            value,
        }
    }

    fn button(&self, props: &ButtonProps) -> NodeKind {
        let label = props
            .child
            .as_deref()
            .and_then(|child| self.registry.get(child))
            .and_then(|child| match &child.kind {
                ComponentKind::Text(text) => Some(text.text.read(self.store)),
                _ => None,
            })
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| DEFAULT_BUTTON_LABEL.to_string());
        NodeKind::Button {
            label,
            action: props.action.clone(),
        }
    }

    fn container(&mut self, axis: Axis, props: &ContainerProps, depth: usize) -> NodeKind {
        let (preset, style) = match &props.style {
            Some(StyleSpec::Preset(name)) => (LayoutPreset::from_name(axis, name), StyleOverrides::new()),
            Some(spec @ StyleSpec::Overrides(_)) => (LayoutPreset::Plain, style_overrides(Some(spec))),
            Some(StyleSpec::Other(_)) | None => (LayoutPreset::Plain, StyleOverrides::new()),
        };
        let children = props
            .child_ids()
            .iter()
            .filter_map(|child| self.resolve_id(child, depth + 1))
            .collect();
        NodeKind::Container {
            axis,
            preset,
            style,
            children,
        }
    }

    fn image(&self, props: &ImageProps) -> NodeKind {
        let source = props
            .url
            .as_ref()
            .map(|u| u.read(self.store))
            .unwrap_or_default();
        let alt = props
            .alt_text
            .as_ref()
            .map(|a| a.read(self.store))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE_ALT.to_string());
        NodeKind::Image { source, alt }
    }
}

/// Resolves `root_id` against `registry`; an absent root yields an empty tree.
pub fn resolve(root_id: &str, registry: &ComponentRegistry, store: &DataStore) -> RenderTree {
    TreeResolver::new(registry, store).resolve(root_id)
}

fn iframe(props: &IFrameProps) -> NodeKind {
    let source = props
        .url
        .as_ref()
        .and_then(|u| u.literal())
        .unwrap_or_default()
        .to_string();
    let width = match &props.width {
        None | Some(Value::Null) => FrameWidth::Full,
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|w| *w > 0.0)
            .map(|w| FrameWidth::Pixels(w.round() as u32))
            .unwrap_or(FrameWidth::Full),
        Some(Value::String(s)) if s.trim() == "100%" => FrameWidth::Full,
        Some(Value::String(s)) => parse_pixels(s)
            .map(FrameWidth::Pixels)
            .unwrap_or_else(|| FrameWidth::Css(s.clone())),
        Some(other) => FrameWidth::Css(other.to_string()),
    };
    let height = match &props.height {
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|h| *h > 0.0)
            .map(|h| h.round() as u32),
        Some(Value::String(s)) => parse_pixels(s),
        _ => None,
    }
    .unwrap_or(DEFAULT_IFRAME_HEIGHT);
    NodeKind::IFrame {
        source,
        width,
        height,
    }
}

/// Accepts `"450"` and `"450px"`.
fn parse_pixels(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
    digits.parse::<u32>().ok().filter(|v| *v > 0)
}

fn style_overrides(spec: Option<&StyleSpec>) -> StyleOverrides {
    match spec {
        Some(StyleSpec::Overrides(map)) => map
            .iter()
            .map(|(key, value)| (key.clone(), value_label(value)))
            .collect(),
        _ => StyleOverrides::new(),
    }
}

fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
