//! Index management and set-based operations driven by an index query.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::{
    index_query::{IndexQuery, QueryOperationOptions},
    patch_request::PatchRequest,
    raven_command::{
        error_field, require_response, CommandResponse, CommandState, RavenCommand, RavenRequest,
    },
    IndexDefinition, RavenDbError, ServerNode,
};

/// Creates or updates one or more indexes. Every definition must carry a
/// name; that is checked at construction, before any request exists.
#[derive(Debug)]
pub struct PutIndexesCommand {
    indexes: Vec<IndexDefinition>,
    state: CommandState,
}

impl PutIndexesCommand {
    pub fn new(indexes: Vec<IndexDefinition>) -> Result<Self, RavenDbError> {
        if indexes.is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "at least one index definition is required".to_string(),
            ));
        }
        if indexes.iter().any(|index| index.name().is_empty()) {
            return Err(RavenDbError::InvalidArgument(
                "every index definition must carry a non-empty name".to_string(),
            ));
        }
        Ok(Self {
            indexes,
            state: CommandState::default(),
        })
    }
}

impl RavenCommand for PutIndexesCommand {
    type Result = Value;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        let url = node.database_url(&["indexes"])?;
        let body = serde_json::to_value(&self.indexes).map_err(anyhow::Error::from)?;
        Ok(RavenRequest::with_body(Method::PUT, url, body))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let response = require_response(response)?;
        let body = response.json_or_status()?;
        if let Some(message) = error_field(&body) {
            return Err(RavenDbError::ServerError(message));
        }
        Ok(body)
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}

/// Fetches index definitions, optionally filtered by name. A missing
/// response means no index matched.
#[derive(Debug, Default)]
pub struct GetIndexCommand {
    index_name: Option<String>,
    state: CommandState,
}

impl GetIndexCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }
}

impl RavenCommand for GetIndexCommand {
    type Result = Option<Vec<Value>>;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        let mut url = node.database_url(&["indexes"])?;
        if let Some(name) = &self.index_name {
            url.query_pairs_mut().append_pair("name", name);
        }
        Ok(RavenRequest::new(Method::GET, url))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let Some(response) = response else {
            return Ok(None);
        };
        let mut body = response.json()?;
        match body.get_mut("Results").map(Value::take) {
            Some(Value::Array(results)) => Ok(Some(results)),
            _ => Err(RavenDbError::ProtocolError(
                "index response did not contain a `Results` array".to_string(),
            )),
        }
    }

    fn is_read_request(&self) -> bool {
        true
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}

/// Deletes an index by name. The server sends no body back.
#[derive(Debug)]
pub struct DeleteIndexCommand {
    index_name: String,
    state: CommandState,
}

impl DeleteIndexCommand {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            state: CommandState::default(),
        }
    }
}

impl RavenCommand for DeleteIndexCommand {
    type Result = ();

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        if self.index_name.is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "index name must not be empty".to_string(),
            ));
        }
        let mut url = node.database_url(&["indexes"])?;
        url.query_pairs_mut().append_pair("name", &self.index_name);
        Ok(RavenRequest::new(Method::DELETE, url))
    }

    fn set_response(
        &self,
        _response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        Ok(())
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}

/// `queries/{index}` URL shared by the set-based operations.
fn by_index_url(
    node: &ServerNode,
    index_name: &str,
    query: &IndexQuery,
    options: &QueryOperationOptions,
) -> Result<Url, RavenDbError> {
    if index_name.is_empty() {
        return Err(RavenDbError::InvalidArgument(
            "index name must not be empty".to_string(),
        ));
    }
    let mut url = node.database_url(&["queries", index_name])?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("allowStale", bool_str(options.allow_stale()));
        pairs.append_pair("details", bool_str(options.retrieve_details()));
        if !query.query().is_empty() {
            pairs.append_pair("query", query.query());
        }
        if let Some(max) = options.max_ops_per_sec() {
            pairs.append_pair("maxOpsPerSec", &max.to_string());
        }
        if let Some(timeout) = options.stale_timeout() {
            pairs.append_pair("staleTimeout", &timeout.as_secs().to_string());
        }
    }
    Ok(url)
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Response handling shared by patch-by-index and delete-by-index: a missing
/// response means the index does not exist; anything outside 200/202 failed.
fn operation_response(
    index_name: &str,
    response: Option<CommandResponse>,
) -> Result<Value, RavenDbError> {
    let Some(response) = response else {
        return Err(RavenDbError::NotFound(format!(
            "could not find index `{index_name}`"
        )));
    };
    let status = response.status();
    if status != StatusCode::OK && status != StatusCode::ACCEPTED {
        return match response.json().ok().as_ref().and_then(error_field) {
            Some(message) => Err(RavenDbError::ServerError(message)),
            None => Err(response.status_error()),
        };
    }
    response.json()
}

/// Patches every document matched by a query over an index.
#[derive(Debug)]
pub struct PatchByIndexCommand {
    index_name: String,
    query: IndexQuery,
    patch: PatchRequest,
    options: QueryOperationOptions,
    state: CommandState,
}

impl PatchByIndexCommand {
    pub fn new(index_name: impl Into<String>, query: IndexQuery, patch: PatchRequest) -> Self {
        Self {
            index_name: index_name.into(),
            query,
            patch,
            options: QueryOperationOptions::default(),
            state: CommandState::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOperationOptions) -> Self {
        self.options = options;
        self
    }
}

impl RavenCommand for PatchByIndexCommand {
    type Result = Value;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        if self.patch.script().is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "patch script must not be empty".to_string(),
            ));
        }
        let url = by_index_url(node, &self.index_name, &self.query, &self.options)?;
        let body = serde_json::to_value(&self.patch).map_err(anyhow::Error::from)?;
        Ok(RavenRequest::with_body(Method::PATCH, url, body))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        operation_response(&self.index_name, response)
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}

/// Deletes every document matched by a query over an index.
#[derive(Debug)]
pub struct DeleteByIndexCommand {
    index_name: String,
    query: IndexQuery,
    options: QueryOperationOptions,
    state: CommandState,
}

impl DeleteByIndexCommand {
    pub fn new(index_name: impl Into<String>, query: IndexQuery) -> Self {
        Self {
            index_name: index_name.into(),
            query,
            options: QueryOperationOptions::default(),
            state: CommandState::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOperationOptions) -> Self {
        self.options = options;
        self
    }
}

impl RavenCommand for DeleteByIndexCommand {
    type Result = Value;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        let url = by_index_url(node, &self.index_name, &self.query, &self.options)?;
        Ok(RavenRequest::new(Method::DELETE, url))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        operation_response(&self.index_name, response)
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}
