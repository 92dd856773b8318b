use serde::Serialize;

/// A server-side index definition. The name is mandatory; commands refuse
/// definitions without one before anything is serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDefinition {
    name: String,
    maps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reduce: Option<String>,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, maps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            maps,
            reduce: None,
        }
    }

    pub fn with_reduce(mut self, reduce: impl Into<String>) -> Self {
        self.reduce = Some(reduce.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::IndexDefinition;

    #[test]
    fn serializes_with_pascal_case_keys() {
        let index = IndexDefinition::new(
            "Orders/ByCompany",
            vec!["from order in docs.Orders select new { order.Company }".to_string()],
        )
        .with_reduce("from result in results group result by result.Company into g select g");

        let value = serde_json::to_value(&index).unwrap();

        assert_eq!(value["Name"], json!("Orders/ByCompany"));
        assert!(value["Maps"].is_array());
        assert!(value["Reduce"].is_string());
    }

    #[test]
    fn reduce_is_omitted_when_absent() {
        let index = IndexDefinition::new("Plain", vec!["map".to_string()]);

        let value = serde_json::to_value(&index).unwrap();

        assert!(value.get("Reduce").is_none());
    }
}
