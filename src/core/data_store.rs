use std::collections::HashMap;

use crate::api::DataModelUpdate;

/// Session-wide binding store: slash-delimited path to string value.
///
/// Missing paths read as the empty string. Writes are visible to every
/// later read, including reads made during the same resolution pass.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    values: HashMap<String, String>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> &str {
        self.values.get(path).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }

    pub fn set(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.values.insert(path.into(), value.into());
    }

    /// Expands each `{key, valueMap}` entry into `/<key>/<innerKey>` writes.
    pub fn apply_update(&mut self, update: &DataModelUpdate) -> usize {
        let mut written = 0;
        for content in &update.contents {
            for entry in &content.value_map {
                self.set(
                    format!("/{}/{}", content.key, entry.key),
                    entry.value_string.clone(),
                );
                written += 1;
            }
        }
        written
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries sorted by path.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
