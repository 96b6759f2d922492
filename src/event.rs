// Pipeline event: a flat field map plus tags. The surrounding pipeline owns
// event routing; this crate only reads the source field and applies tags.

use serde_json::{Map, Value};

/// Tag applied to records consumed (or rejected) by the statistics filter;
/// downstream stages treat tagged events as terminal.
pub const DROP_TAG: &str = "access_stats_drop";

#[derive(Debug, Clone, Default)]
pub struct LogEvent {
    pub fields: Map<String, Value>,
    pub tags: Vec<String>,
}

impl LogEvent {
    /// Event with a single string field, the usual shape for raw log lines.
    pub fn from_field(field: &str, text: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(field.to_string(), Value::String(text.to_string()));
        Self {
            fields,
            tags: Vec::new(),
        }
    }

    /// String value of a field; empty when absent or not a string.
    pub fn get_str(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
