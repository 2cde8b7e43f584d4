//! Component definitions decoded from `surfaceUpdate.components`.
//!
//! On the wire a component is `{id, component: {<Variant>: {...}}}`. The
//! first recognised variant key wins; fields this client does not know are
//! ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::ComponentEntry;
use crate::core::data_store::DataStore;

type VariantDecoder = fn(Value) -> Result<ComponentKind, serde_json::Error>;

/// Variant keys in the order they are checked, each with its body decoder.
const VARIANTS: [(&str, VariantDecoder); 8] = [
    ("Text", |props| serde_json::from_value(props).map(ComponentKind::Text)),
    ("TextField", |props| serde_json::from_value(props).map(ComponentKind::TextField)),
    ("Button", |props| serde_json::from_value(props).map(ComponentKind::Button)),
    ("Column", |props| serde_json::from_value(props).map(ComponentKind::Column)),
    ("Row", |props| serde_json::from_value(props).map(ComponentKind::Row)),
    ("Image", |props| serde_json::from_value(props).map(ComponentKind::Image)),
    ("IFrame", |props| serde_json::from_value(props).map(ComponentKind::IFrame)),
    ("Chart", |props| serde_json::from_value(props).map(ComponentKind::Chart)),
];

/// A literal or DataStore-bound string field.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundValue {
    #[serde(default)]
    pub literal_string: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl BoundValue {
    pub fn literal(&self) -> Option<&str> {
        self.literal_string.as_deref()
    }

    /// Literal if present, otherwise the bound store value.
    pub fn read(&self, store: &DataStore) -> String {
        match (&self.literal_string, &self.path) {
            (Some(literal), _) => literal.clone(),
            (None, Some(path)) => store.get(path).to_string(),
            (None, None) => String::new(),
        }
    }
}

/// `style` is either a named preset or an object of literal overrides.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StyleSpec {
    Preset(String),
    Overrides(Map<String, Value>),
    Other(Value),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub context: Vec<ActionContextEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ActionContextEntry {
    pub key: String,
    #[serde(default)]
    pub value: BoundValue,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    #[serde(default)]
    pub text: BoundValue,
    #[serde(default)]
    pub usage_hint: Option<String>,
    #[serde(default)]
    pub url: Option<BoundValue>,
    #[serde(default)]
    pub style: Option<StyleSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TextFieldProps {
    #[serde(default)]
    pub label: BoundValue,
    #[serde(default)]
    pub text: BoundValue,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ButtonProps {
    #[serde(default)]
    pub child: Option<String>,
    #[serde(default)]
    pub action: Option<Action>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Children {
    #[serde(default)]
    pub explicit_list: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ContainerProps {
    #[serde(default)]
    pub children: Option<Children>,
    #[serde(default)]
    pub style: Option<StyleSpec>,
}

impl ContainerProps {
    pub fn child_ids(&self) -> &[String] {
        self.children
            .as_ref()
            .map(|c| c.explicit_list.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageProps {
    #[serde(default)]
    pub url: Option<BoundValue>,
    #[serde(default)]
    pub alt_text: Option<BoundValue>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct IFrameProps {
    #[serde(default)]
    pub url: Option<BoundValue>,
    #[serde(default)]
    pub width: Option<Value>,
    #[serde(default)]
    pub height: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChartPoint {
    #[serde(alias = "label")]
    pub time: Value,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChartSeriesProps {
    #[serde(default)]
    pub data: Vec<ChartPoint>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChartProps {
    #[serde(default)]
    pub data: Vec<ChartPoint>,
    #[serde(default)]
    pub series: Vec<ChartSeriesProps>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    Text(TextProps),
    TextField(TextFieldProps),
    Button(ButtonProps),
    Column(ContainerProps),
    Row(ContainerProps),
    Image(ImageProps),
    IFrame(IFrameProps),
    Chart(ChartProps),
    /// Shape this client cannot interpret; carries a short description.
    Unsupported(String),
}

impl ComponentKind {
    pub fn variant_name(&self) -> &str {
        match self {
            ComponentKind::Text(_) => "Text",
            ComponentKind::TextField(_) => "TextField",
            ComponentKind::Button(_) => "Button",
            ComponentKind::Column(_) => "Column",
            ComponentKind::Row(_) => "Row",
            ComponentKind::Image(_) => "Image",
            ComponentKind::IFrame(_) => "IFrame",
            ComponentKind::Chart(_) => "Chart",
            ComponentKind::Unsupported(desc) => desc,
        }
    }

    /// Decodes the `component` object of an entry.
    pub fn from_json(body: &Value) -> Self {
        let Some(object) = body.as_object() else {
            return ComponentKind::Unsupported("non-object component".to_string());
        };

        let Some((name, decode, props)) = VARIANTS
            .iter()
            .find_map(|(name, decode)| object.get(*name).map(|props| (*name, decode, props)))
        else {
            let keys: Vec<&str> = object.keys().map(String::as_str).collect();
            return ComponentKind::Unsupported(format!("unknown variant {{{}}}", keys.join(",")));
        };

        // A null body behaves like an empty one.
        let props = if props.is_null() {
            Value::Object(Map::new())
        } else {
            props.clone()
        };

        decode(props).unwrap_or_else(|err| {
            debug!(variant = name, error = %err, "component body did not decode");
            ComponentKind::Unsupported(format!("malformed {name}"))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: String,
    pub kind: ComponentKind,
}

impl From<&ComponentEntry> for Component {
    fn from(entry: &ComponentEntry) -> Self {
        Component {
            id: entry.id.clone(),
            kind: ComponentKind::from_json(&entry.component),
        }
    }
}

/// Per-surface lookup table from component id to definition.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Component>,
}

impl ComponentRegistry {
    pub fn from_entries(entries: &[ComponentEntry]) -> Self {
        let mut components = HashMap::with_capacity(entries.len());
        for entry in entries {
            let component = Component::from(entry);
            if components.insert(entry.id.clone(), component).is_some() {
                debug!(id = %entry.id, "duplicate component id, keeping the later definition");
            }
        }
        Self { components }
    }

    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl FromIterator<Component> for ComponentRegistry {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }
}
