//! Wire payloads exchanged with an A2UI chat server.
//!
//! Component bodies are kept as raw JSON here; [`crate::core::component`]
//! decides which variant each one is.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Header telling the server whether widget replies are acceptable.
pub const CLIENT_A2UI_HEADER: &str = "X-Client-A2UI";

pub const KIND_A2UI: &str = "a2ui";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_context: Option<BTreeMap<String, String>>,
}

impl ChatRequest {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            client_context: None,
        }
    }
}

/// Non-streaming reply envelope: `{kind, data?, text?}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InboundMessage {
    #[serde(default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl InboundMessage {
    pub fn is_widget(&self) -> bool {
        self.kind == KIND_A2UI
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct A2uiPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_update: Option<SurfaceUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_model_update: Option<DataModelUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_rendering: Option<BeginRendering>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub components: Vec<ComponentEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ComponentEntry {
    pub id: String,
    #[serde(default)]
    pub component: Value,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataModelUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub contents: Vec<DataModelContents>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataModelContents {
    pub key: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub value_map: Vec<DataValue>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    pub key: String,
    #[serde(default, deserialize_with = "scalar_string")]
    pub value_string: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BeginRendering {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_id: Option<String>,
    /// Missing root resolves to nothing, like any unknown id.
    #[serde(default)]
    pub root: String,
}

/// Decodes a list entry by entry, dropping the entries that do not fit `T`.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(err) => {
                debug!(error = %err, "skipping malformed payload entry");
                None
            }
        })
        .collect())
}

/// Accepts any JSON scalar and keeps its text form; `null` becomes `""`.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Null => Ok(String::new()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(de::Error::custom(format!("expected a scalar value, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_missing_context() {
        let body = serde_json::to_string(&ChatRequest::prompt("hi")).unwrap();
        assert_eq!(body, r#"{"text":"hi"}"#);
    }

    #[test]
    fn inbound_message_tolerates_missing_fields() {
        let msg: InboundMessage = serde_json::from_str(r#"{"kind":"text"}"#).unwrap();
        assert!(!msg.is_widget());
        assert!(msg.text.is_none());

        let msg: InboundMessage =
            serde_json::from_str(r#"{"kind":"a2ui","data":{"beginRendering":{"root":"r"}}}"#)
                .unwrap();
        assert!(msg.is_widget());
    }

    #[test]
    fn payload_reads_camel_case_sections() {
        let raw = r#"{
            "surfaceUpdate": {"surfaceId": "s", "components": [{"id": "a", "component": {"Text": {}}}]},
            "dataModelUpdate": {"surfaceId": "s", "contents": [{"key": "calc", "valueMap": [{"key": "rate", "valueString": "5"}]}]},
            "beginRendering": {"surfaceId": "s", "root": "a"}
        }"#;
        let payload: A2uiPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.surface_update.unwrap().components[0].id, "a");
        assert_eq!(
            payload.data_model_update.unwrap().contents[0].value_map[0].value_string,
            "5"
        );
        assert_eq!(payload.begin_rendering.unwrap().root, "a");
    }

    #[test]
    fn malformed_entries_are_dropped_without_failing_the_payload() {
        let raw = r#"{
            "surfaceUpdate": {"components": [
                {"id": "a", "component": {"Text": {}}},
                {"component": {"Text": {}}},
                "stray"
            ]},
            "dataModelUpdate": {"contents": [
                {"valueMap": [{"key": "lost", "valueString": "x"}]},
                {"key": "loan", "valueMap": [
                    {"key": "years", "valueString": 30},
                    {"key": "fixed", "valueString": true},
                    {"key": "rate"},
                    {"valueString": "orphan"},
                    {"key": "nested", "valueString": {"a": 1}}
                ]}
            ]},
            "beginRendering": {}
        }"#;
        let payload: A2uiPayload = serde_json::from_str(raw).unwrap();

        let components = payload.surface_update.unwrap().components;
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].id, "a");

        let contents = payload.data_model_update.unwrap().contents;
        assert_eq!(contents.len(), 1);
        let values: Vec<(&str, &str)> = contents[0]
            .value_map
            .iter()
            .map(|v| (v.key.as_str(), v.value_string.as_str()))
            .collect();
        assert_eq!(values, vec![("years", "30"), ("fixed", "true"), ("rate", "")]);

        assert_eq!(payload.begin_rendering.unwrap().root, "");
    }
}
