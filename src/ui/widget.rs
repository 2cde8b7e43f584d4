//! Lays a resolved [`RenderTree`] out as terminal lines.
//!
//! Columns stack, cards get a border, headers get a rule. A row flows
//! inline when every child is a one-line leaf that fits, otherwise its
//! children split the width evenly and are placed side by side. Charts are
//! plotted last, once their column width is known.

use std::collections::HashMap;

use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::core::resolver::{
    Axis, Control, FrameWidth, LayoutPreset, NodeId, NodeKind, RenderTree, StyleOverrides,
    TextRole,
};
use crate::core::router::RenderError;
use crate::ui::chart::ChartPlotter;
use crate::ui::theme::Theme;
use crate::ui::wrap::{line_width, pad_line, wrap_spans};

pub const EMPTY_SURFACE: &str = "[Empty UI Component]";
const COLUMN_GAP: usize = 2;
/// Below this a split row stacks its children instead.
const MIN_COLUMN_WIDTH: usize = 12;
const MIN_WIDTH: usize = 16;

pub struct WidgetLayout<'a> {
    tree: &'a RenderTree,
    theme: &'a Theme,
    plotter: &'a dyn ChartPlotter,
    buttons: HashMap<NodeId, usize>,
    fields: HashMap<NodeId, usize>,
}

impl<'a> WidgetLayout<'a> {
    /// Buttons and fields are numbered from 1 in document order.
    pub fn new(tree: &'a RenderTree, theme: &'a Theme, plotter: &'a dyn ChartPlotter) -> Self {
        let mut buttons = HashMap::new();
        let mut fields = HashMap::new();
        for control in tree.controls() {
            match control {
                Control::Button { node, .. } => {
                    let n = buttons.len() + 1;
                    buttons.insert(node, n);
                }
                Control::Field { node, .. } => {
                    let n = fields.len() + 1;
                    fields.insert(node, n);
                }
            }
        }
        Self {
            tree,
            theme,
            plotter,
            buttons,
            fields,
        }
    }

    pub fn render(&self, width: usize) -> Result<Vec<Line<'static>>, RenderError> {
        match self.tree.root() {
            Some(root) => self.node_lines(root, width.max(MIN_WIDTH)),
            None => Ok(vec![Line::from(Span::styled(
                EMPTY_SURFACE,
                self.theme.placeholder_style,
            ))]),
        }
    }

    fn node_lines(&self, id: NodeId, width: usize) -> Result<Vec<Line<'static>>, RenderError> {
        let Some(node) = self.tree.node(id) else {
            return Ok(Vec::new());
        };
        match &node.kind {
            NodeKind::Container {
                axis: Axis::Vertical,
                preset,
                style,
                children,
            } => self.column(*preset, style, children, width),
            NodeKind::Container {
                axis: Axis::Horizontal,
                preset,
                children,
                ..
            } => self.row(*preset, children, width),
            NodeKind::Chart(spec) => self.plotter.plot(spec, width, self.theme),
            _ => Ok(self
                .leaf_spans(id)
                .map(|spans| wrap_spans(&spans, width))
                .unwrap_or_default()),
        }
    }

    /// Spans for a single-line leaf; `None` for containers and charts.
    fn leaf_spans(&self, id: NodeId) -> Option<Vec<Span<'static>>> {
        let node = self.tree.node(id)?;
        let theme = self.theme;
        let spans = match &node.kind {
            NodeKind::Text {
                content,
                role,
                link,
                style,
            } => {
                let base = theme.apply_overrides(theme.text_style(role), style);
                let mut spans = Vec::new();
                if *role == TextRole::NewsDate {
                    spans.push(Span::styled(format!("• {content}"), base));
                } else {
                    spans.push(Span::styled(content.clone(), base));
                }
                if let Some(url) = link.as_ref().filter(|_| role.is_link()) {
                    spans.push(Span::styled(format!(" <{url}>"), theme.system_text_style));
                }
                spans
            }
            NodeKind::TextField {
                label,
                binding,
                value,
            } => {
                let mut spans = self.control_index(self.fields.get(&id));
                spans.push(Span::styled(format!("{label}: "), theme.field_label_style));
                if value.is_empty() {
                    spans.push(Span::styled("____", theme.placeholder_style));
                } else {
                    spans.push(Span::styled(value.clone(), theme.field_value_style));
                }
                if binding.is_none() {
                    spans.push(Span::styled(" (read-only)", theme.system_text_style));
                }
                spans
            }
            NodeKind::Button { label, .. } => {
                let mut spans = self.control_index(self.buttons.get(&id));
                spans.push(Span::styled(format!(" {label} "), theme.button_style));
                spans
            }
            NodeKind::Image { source, alt } => vec![
                Span::styled(format!("[Image: {alt}]"), theme.placeholder_style),
                Span::styled(format!(" {source}"), theme.link_style),
            ],
            NodeKind::IFrame {
                source,
                width,
                height,
            } => {
                let width = match width {
                    FrameWidth::Full => "full width".to_string(),
                    FrameWidth::Pixels(px) => format!("{px}px"),
                    FrameWidth::Css(css) => css.clone(),
                };
                vec![
                    Span::styled("[Embedded page] ", theme.placeholder_style),
                    Span::styled(source.clone(), theme.link_style),
                    Span::styled(
                        format!(" ({width} × {height}px)"),
                        theme.system_text_style,
                    ),
                ]
            }
            NodeKind::Container { .. } | NodeKind::Chart(_) => return None,
        };
        Some(spans)
    }

    fn control_index(&self, index: Option<&usize>) -> Vec<Span<'static>> {
        index
            .map(|n| vec![Span::styled(format!("[{n}] "), self.theme.control_index_style)])
            .unwrap_or_default()
    }

    fn column(
        &self,
        preset: LayoutPreset,
        style: &StyleOverrides,
        children: &[NodeId],
        width: usize,
    ) -> Result<Vec<Line<'static>>, RenderError> {
        match preset {
            LayoutPreset::Card => {
                let border = self.theme.apply_overrides(self.theme.border_style, style);
                let inner = width.saturating_sub(4).max(1);
                let body = self.stack(children, inner)?;
                Ok(boxed(body, inner, border))
            }
            LayoutPreset::Header => {
                let mut lines = self.stack(children, width)?;
                lines.push(Line::from(Span::styled(
                    "─".repeat(width),
                    self.theme.border_style,
                )));
                Ok(lines)
            }
            _ => self.stack(children, width),
        }
    }

    fn stack(&self, children: &[NodeId], width: usize) -> Result<Vec<Line<'static>>, RenderError> {
        let mut lines = Vec::new();
        for &child in children {
            lines.extend(self.node_lines(child, width)?);
        }
        Ok(lines)
    }

    fn row(
        &self,
        preset: LayoutPreset,
        children: &[NodeId],
        width: usize,
    ) -> Result<Vec<Line<'static>>, RenderError> {
        if children.is_empty() {
            return Ok(Vec::new());
        }
        let leaves: Option<Vec<Vec<Span<'static>>>> =
            children.iter().map(|&child| self.leaf_spans(child)).collect();

        if let Some(leaves) = leaves {
            let inline = join_inline(leaves);
            let fits = line_width(&Line::from(inline.clone())) <= width;
            match preset {
                // Metadata rows always flow, wrapping when long.
                LayoutPreset::Meta => return Ok(wrap_spans(&inline, width)),
                LayoutPreset::EvenSplit => {}
                _ if fits => return Ok(vec![Line::from(inline)]),
                _ => {}
            }
        }
        self.split(children, width)
    }

    fn split(&self, children: &[NodeId], width: usize) -> Result<Vec<Line<'static>>, RenderError> {
        let count = children.len();
        let gaps = COLUMN_GAP * (count - 1);
        let column_width = width.saturating_sub(gaps) / count;
        if column_width < MIN_COLUMN_WIDTH {
            return self.stack(children, width);
        }

        let mut columns = Vec::with_capacity(count);
        for &child in children {
            columns.push(self.node_lines(child, column_width)?);
        }
        let height = columns.iter().map(Vec::len).max().unwrap_or(0);
        let mut lines = Vec::with_capacity(height);
        for row in 0..height {
            let mut spans = Vec::new();
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::raw(" ".repeat(COLUMN_GAP)));
                }
                let cell = column.get(row).cloned().unwrap_or_default();
                spans.extend(pad_line(cell, column_width).spans);
            }
            lines.push(Line::from(spans));
        }
        Ok(lines)
    }
}

fn join_inline(leaves: Vec<Vec<Span<'static>>>) -> Vec<Span<'static>> {
    let mut inline = Vec::new();
    for (i, spans) in leaves.into_iter().enumerate() {
        if i > 0 {
            inline.push(Span::raw(" ".repeat(COLUMN_GAP)));
        }
        inline.extend(spans);
    }
    inline
}

fn boxed(body: Vec<Line<'static>>, inner: usize, border: Style) -> Vec<Line<'static>> {
    let rule = "─".repeat(inner + 2);
    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(Line::from(Span::styled(format!("┌{rule}┐"), border)));
    for line in body {
        let mut spans = vec![Span::styled("│ ", border)];
        spans.extend(pad_line(line, inner).spans);
        spans.push(Span::styled(" │", border));
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(Span::styled(format!("└{rule}┘"), border)));
    lines
}

/// Unstyled text of `lines`, one per row, trailing blanks trimmed.
pub fn plain_text(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
