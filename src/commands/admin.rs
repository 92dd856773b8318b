//! Server-wide admin operations: creating and deleting databases. These go
//! through `/admin/databases` and are never retried against secondaries.

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::{
    database_document::{validate_database_name, DATABASES_PREFIX, DATA_DIRECTORY_SETTING},
    raven_command::{
        json_value_to_string, require_response, CommandResponse, CommandState, RavenCommand,
        RavenRequest,
    },
    DatabaseDocument, RavenDbError, ServerNode,
};

/// Creates a database from a configuration document. The document must name
/// a data directory; its id may carry the server's `Raven/Databases/` prefix,
/// which is stripped to recover the bare name.
#[derive(Debug)]
pub struct CreateDatabaseCommand {
    database_document: DatabaseDocument,
    state: CommandState,
}

impl CreateDatabaseCommand {
    pub fn new(database_document: DatabaseDocument) -> Self {
        Self {
            database_document,
            state: CommandState::default(),
        }
    }
}

impl RavenCommand for CreateDatabaseCommand {
    type Result = Option<Value>;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        if !self
            .database_document
            .settings()
            .contains_key(DATA_DIRECTORY_SETTING)
        {
            return Err(RavenDbError::InvalidOperation(format!(
                "the `{DATA_DIRECTORY_SETTING}` setting is mandatory"
            )));
        }
        let name = self
            .database_document
            .database_id()
            .strip_prefix(DATABASES_PREFIX)
            .unwrap_or_else(|| self.database_document.database_id());
        validate_database_name(name)?;

        let mut url = node.admin_databases_url()?;
        url.query_pairs_mut().append_pair("name", name);
        let body = serde_json::to_value(&self.database_document).map_err(anyhow::Error::from)?;
        Ok(RavenRequest::with_body(Method::PUT, url, body))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let response = require_response(response)?;
        if response.status() == StatusCode::CREATED {
            Ok(Some(response.json()?))
        } else if response.status() == StatusCode::BAD_REQUEST {
            let body = response.json_or_status()?;
            let message = body
                .get("Message")
                .map(json_value_to_string)
                .unwrap_or_else(|| "the server rejected the database document".to_string());
            Err(RavenDbError::ServerError(message))
        } else {
            Ok(None)
        }
    }

    fn avoid_failover(&self) -> bool {
        true
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}

/// Deletes a database by name; `hard_delete` also removes its data from disk.
#[derive(Debug)]
pub struct DeleteDatabaseCommand {
    name: String,
    hard_delete: bool,
    state: CommandState,
}

impl DeleteDatabaseCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hard_delete: false,
            state: CommandState::default(),
        }
    }

    pub fn hard_delete(mut self, hard_delete: bool) -> Self {
        self.hard_delete = hard_delete;
        self
    }
}

impl RavenCommand for DeleteDatabaseCommand {
    type Result = ();

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        let name = self
            .name
            .strip_prefix(DATABASES_PREFIX)
            .unwrap_or(&self.name);
        if name.is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "database name must not be empty".to_string(),
            ));
        }
        let mut url = node.admin_databases_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("name", name);
            if self.hard_delete {
                pairs.append_pair("hard-delete", "true");
            }
        }
        Ok(RavenRequest::new(Method::DELETE, url))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let response = require_response(response)?;
        if response.status() == StatusCode::OK {
            let body = response.json()?;
            let first = body.get(0);
            let deleted = first
                .and_then(|result| result.get("Deleted"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !deleted {
                let reason = first
                    .and_then(|result| result.get("Reason"))
                    .map(json_value_to_string)
                    .unwrap_or_else(|| "the server did not delete the database".to_string());
                return Err(RavenDbError::ServerError(reason));
            }
        }
        Ok(())
    }

    fn avoid_failover(&self) -> bool {
        true
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}
