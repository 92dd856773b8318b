//! Meta operations: database statistics, topology, and long-running
//! operation state.

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::{
    raven_command::{
        error_field, require_response, CommandResponse, CommandState, RavenCommand, RavenRequest,
    },
    RavenDbError, ServerNode,
};

/// Fetches database statistics. Only a 200 carries a result.
#[derive(Debug, Default)]
pub struct GetStatisticsCommand {
    state: CommandState,
}

impl GetStatisticsCommand {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RavenCommand for GetStatisticsCommand {
    type Result = Option<Value>;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        let url = node.database_url(&["stats"])?;
        Ok(RavenRequest::new(Method::GET, url))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        match response {
            Some(response) if response.status() == StatusCode::OK => Ok(Some(response.json()?)),
            _ => Ok(None),
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}

/// Fetches the database topology from the node actually asked; failover
/// would defeat the point, so the command opts out of it.
#[derive(Debug, Default)]
pub struct GetTopologyCommand {
    state: CommandState,
}

impl GetTopologyCommand {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RavenCommand for GetTopologyCommand {
    type Result = Option<Value>;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        let mut url = node.database_url(&["topology"])?;
        url.query_pairs_mut().append_pair("url", node.url.as_str());
        Ok(RavenRequest::new(Method::GET, url))
    }

    /// A 400 is expected while a cluster bootstraps; it is logged and
    /// reported as "no topology yet" rather than raised.
    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let Some(response) = response else {
            return Ok(None);
        };
        if response.status() == StatusCode::OK {
            return Ok(Some(response.json()?));
        }
        if response.status() == StatusCode::BAD_REQUEST {
            if let Some(message) = response.json().ok().as_ref().and_then(error_field) {
                tracing::debug!(error = %message, "topology fetch rejected by the server");
            }
        }
        Ok(None)
    }

    fn is_read_request(&self) -> bool {
        true
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

/// Polls the state of a long-running server-side operation by id.
#[derive(Debug)]
pub struct GetOperationStateCommand {
    id: i64,
    state: CommandState,
}

impl GetOperationStateCommand {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            state: CommandState::default(),
        }
    }
}

impl RavenCommand for GetOperationStateCommand {
    type Result = Value;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        let mut url = node.database_url(&["operations", "state"])?;
        url.query_pairs_mut()
            .append_pair("id", &self.id.to_string());
        Ok(RavenRequest::new(Method::GET, url))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let response = require_response(response)?;
        response.json_or_status()
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}
