use serde::Serialize;
use serde_json::{Map, Value};

/// A JavaScript patch to run server-side against a document, with optional
/// named values the script can reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatchRequest {
    script: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<Map<String, Value>>,
}

impl PatchRequest {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            values: None,
        }
    }

    pub fn with_values(mut self, values: Map<String, Value>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}
