use std::collections::HashMap;

use serde::Serialize;

use crate::RavenDbError;

/// Prefix under which the server files database documents; admin commands
/// strip it to recover the bare database name.
pub const DATABASES_PREFIX: &str = "Raven/Databases/";

/// Setting that must be present before a database can be created.
pub const DATA_DIRECTORY_SETTING: &str = "Raven/DataDir";

/// The configuration document sent when creating a database.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseDocument {
    #[serde(rename = "Id")]
    database_id: String,
    settings: HashMap<String, String>,
    secured_settings: HashMap<String, String>,
    disabled: bool,
}

impl DatabaseDocument {
    pub fn new(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            settings: HashMap::new(),
            secured_settings: HashMap::new(),
            disabled: false,
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_secured_setting(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.secured_settings.insert(key.into(), value.into());
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn settings(&self) -> &HashMap<String, String> {
        &self.settings
    }
}

/// Database names are restricted to ASCII letters, digits, `_`, `-` and `.`.
pub fn validate_database_name(name: &str) -> Result<(), RavenDbError> {
    if name.is_empty() {
        return Err(RavenDbError::InvalidArgument(
            "database name must not be empty".to_string(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(RavenDbError::InvalidArgument(format!(
            "database name `{name}` contains characters outside [A-Za-z0-9_.-]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::RavenDbError;

    use super::{validate_database_name, DatabaseDocument};

    #[test]
    fn serializes_with_pascal_case_keys() {
        let document = DatabaseDocument::new("Raven/Databases/northwind")
            .with_setting("Raven/DataDir", "~/northwind")
            .with_disabled(false);

        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["Id"], json!("Raven/Databases/northwind"));
        assert_eq!(value["Settings"]["Raven/DataDir"], json!("~/northwind"));
        assert_eq!(value["Disabled"], json!(false));
        assert!(value["SecuredSettings"].is_object());
    }

    #[test]
    fn name_validation_accepts_word_characters() {
        assert!(validate_database_name("north-wind_2.0").is_ok());
    }

    #[test]
    fn name_validation_rejects_separators_and_empty_names() {
        assert!(matches!(
            validate_database_name("north wind"),
            Err(RavenDbError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_database_name(""),
            Err(RavenDbError::InvalidArgument(_))
        ));
    }
}
