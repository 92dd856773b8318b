//! Bulk document operations applied by the server in submission order.

use reqwest::Method;
use serde_json::{json, Value};

use crate::{
    patch_request::PatchRequest,
    raven_command::{
        error_field, require_response, CommandResponse, CommandState, RavenCommand, RavenRequest,
    },
    RavenDbError, ServerNode,
};

/// One entry of a `bulk_docs` request. A closed set: the server understands
/// exactly these sub-command shapes.
#[derive(Debug, Clone)]
pub enum CommandData {
    Put {
        key: String,
        document: Value,
        etag: Option<String>,
    },
    Delete {
        key: String,
        etag: Option<String>,
    },
    Patch {
        key: String,
        patch: PatchRequest,
        patch_if_missing: Option<PatchRequest>,
    },
}

impl CommandData {
    pub fn key(&self) -> &str {
        match self {
            CommandData::Put { key, .. }
            | CommandData::Delete { key, .. }
            | CommandData::Patch { key, .. } => key,
        }
    }

    fn to_json(&self) -> Result<Value, RavenDbError> {
        if self.key().is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "batch sub-command is missing a document key".to_string(),
            ));
        }
        let entry = match self {
            CommandData::Put {
                key,
                document,
                etag,
            } => json!({
                "Method": "PUT",
                "Key": key,
                "Document": document,
                "Etag": etag,
            }),
            CommandData::Delete { key, etag } => json!({
                "Method": "DELETE",
                "Key": key,
                "Etag": etag,
            }),
            CommandData::Patch {
                key,
                patch,
                patch_if_missing,
            } => {
                if patch.script().is_empty() {
                    return Err(RavenDbError::InvalidArgument(
                        "batch patch sub-command has an empty script".to_string(),
                    ));
                }
                json!({
                    "Method": "PATCH",
                    "Key": key,
                    "Patch": patch,
                    "PatchIfMissing": patch_if_missing,
                })
            }
        };
        Ok(entry)
    }
}

/// Sends an ordered sequence of sub-commands as one `bulk_docs` request. The
/// server applies them in submission order, so the body must preserve it.
#[derive(Debug)]
pub struct BatchCommand {
    commands: Vec<CommandData>,
    state: CommandState,
}

impl BatchCommand {
    pub fn new(commands: Vec<CommandData>) -> Self {
        Self {
            commands,
            state: CommandState::default(),
        }
    }
}

impl RavenCommand for BatchCommand {
    type Result = Vec<Value>;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        let mut entries = Vec::with_capacity(self.commands.len());
        for command in &self.commands {
            entries.push(command.to_json()?);
        }
        let url = node.database_url(&["bulk_docs"])?;
        Ok(RavenRequest::with_body(
            Method::POST,
            url,
            Value::Array(entries),
        ))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let response = require_response(response)?;
        let mut body = response.json()?;
        if let Some(message) = error_field(&body) {
            return Err(RavenDbError::ServerError(message));
        }
        match body.get_mut("Results").map(Value::take) {
            Some(Value::Array(results)) => Ok(results),
            _ => Err(RavenDbError::ProtocolError(
                "batch response did not contain a `Results` array".to_string(),
            )),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};
    use serde_json::json;
    use url::Url;

    use crate::{
        raven_command::{CommandResponse, RavenCommand},
        PatchRequest, RavenDbError, ServerNode,
    };

    use super::{BatchCommand, CommandData};

    fn node() -> ServerNode {
        ServerNode::new(Url::parse("http://localhost:8080").unwrap(), "northwind")
    }

    #[test]
    fn body_preserves_submission_order() {
        // Arrange
        let command = BatchCommand::new(vec![
            CommandData::Put {
                key: "people/1".to_string(),
                document: json!({"Name": "A"}),
                etag: None,
            },
            CommandData::Patch {
                key: "people/2".to_string(),
                patch: PatchRequest::new("this.Name = 'B';"),
                patch_if_missing: None,
            },
            CommandData::Delete {
                key: "people/3".to_string(),
                etag: Some("9".to_string()),
            },
        ]);

        // Act
        let request = command.create_request(&node()).unwrap();

        // Assert
        assert_eq!(request.method, Method::POST);
        assert!(request.url.as_str().ends_with("/bulk_docs"));
        let body = request.body.unwrap();
        let methods: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["Method"].as_str().unwrap())
            .collect();
        assert_eq!(methods, vec!["PUT", "PATCH", "DELETE"]);
        assert_eq!(body[2]["Etag"], json!("9"));
    }

    #[test]
    fn sub_command_without_key_is_rejected_before_building_a_body() {
        let command = BatchCommand::new(vec![CommandData::Delete {
            key: String::new(),
            etag: None,
        }]);

        let result = command.create_request(&node());

        assert!(matches!(result, Err(RavenDbError::InvalidArgument(_))));
    }

    #[test]
    fn set_response_returns_the_results_array() {
        let command = BatchCommand::new(Vec::new());
        let response = CommandResponse::new(
            StatusCode::OK,
            json!({"Results": [{"Key": "people/1"}]}).to_string(),
        );

        let results = command.set_response(Some(response)).unwrap();

        assert_eq!(results, vec![json!({"Key": "people/1"})]);
    }

    #[test]
    fn missing_results_array_is_a_protocol_error() {
        let command = BatchCommand::new(Vec::new());
        let response = CommandResponse::new(StatusCode::OK, json!({"Ok": true}).to_string());

        let result = command.set_response(Some(response));

        assert!(matches!(result, Err(RavenDbError::ProtocolError(_))));
    }
}
