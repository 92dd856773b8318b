//! The two-phase command contract every server operation implements.
//!
//! A command is constructed with its operation-specific arguments, asked to
//! build its request with [`RavenCommand::create_request`], and later handed
//! the transport's outcome through [`RavenCommand::set_response`]. Commands
//! are single-use and hold no state beyond their own arguments plus the
//! per-send bookkeeping in [`CommandState`]; the transport performs the HTTP
//! exchange in between the two phases.

use std::collections::{HashMap, HashSet};

use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::{RavenDbError, ServerNode};

/// A fully-built request descriptor, ready for the transport to send
/// verbatim.
#[derive(Debug, Clone)]
pub struct RavenRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl RavenRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_body(method: Method, url: Url, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(method, url)
        }
    }

    /// Adds an `If-Match` header carrying the given etag, opting the request
    /// in to the server's optimistic concurrency check.
    pub fn if_match(mut self, etag: &str) -> Self {
        self.headers
            .insert("If-Match".to_string(), format!("\"{etag}\""));
        self
    }

    /// Converts the descriptor into a [`reqwest::Request`] for transports
    /// built on reqwest.
    pub fn http_request(&self, client: &reqwest::Client) -> anyhow::Result<reqwest::Request> {
        let mut builder = client.request(self.method.clone(), self.url.clone());
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &self.body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }
}

/// The raw outcome of one HTTP exchange: status code plus the unparsed body.
/// The body is only parsed as JSON when a command asks for it.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    status: StatusCode,
    body: Option<String>,
}

impl CommandResponse {
    pub fn new(status: StatusCode, body: impl Into<Option<String>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Parses the body as JSON, failing with a `ProtocolError` when the body
    /// is absent or not valid JSON.
    pub fn json(&self) -> Result<Value, RavenDbError> {
        let body = self.body.as_deref().ok_or_else(|| {
            RavenDbError::ProtocolError("expected a JSON body but the response was empty".to_string())
        })?;
        serde_json::from_str(body).map_err(|e| {
            RavenDbError::ProtocolError(format!("response body is not valid JSON: {e}"))
        })
    }

    /// Like [`json`](Self::json), but an unparseable body on an HTTP error
    /// status reports the status failure itself rather than the parse
    /// failure.
    pub fn json_or_status(&self) -> Result<Value, RavenDbError> {
        match self.json() {
            Ok(body) => Ok(body),
            Err(_) if self.status.is_client_error() || self.status.is_server_error() => {
                Err(self.status_error())
            }
            Err(e) => Err(e),
        }
    }

    /// The transport-level failure for this response's status code.
    pub fn status_error(&self) -> RavenDbError {
        RavenDbError::TransportError {
            status: self.status,
            body: self.body.clone(),
        }
    }
}

/// Per-send bookkeeping owned by one command instance. The transport records
/// into it between retries; nothing here is shared across commands.
#[derive(Debug, Clone, Default)]
pub struct CommandState {
    failed_nodes: HashSet<ServerNode>,
    authentication_retries: u32,
}

impl CommandState {
    pub fn record_failed_node(&mut self, node: ServerNode) {
        self.failed_nodes.insert(node);
    }

    pub fn is_failed_with(&self, node: &ServerNode) -> bool {
        self.failed_nodes.contains(node)
    }

    pub fn failed_nodes(&self) -> &HashSet<ServerNode> {
        &self.failed_nodes
    }

    pub fn authentication_retries(&self) -> u32 {
        self.authentication_retries
    }

    pub fn record_authentication_retry(&mut self) {
        self.authentication_retries += 1;
    }
}

/// One server operation. Implementations are leaves; each builds exactly one
/// request shape and knows how to classify its own response.
pub trait RavenCommand {
    type Result;

    /// Validates the command's arguments and builds the request for `node`.
    /// Precondition failures surface as `InvalidArgument`/`InvalidOperation`
    /// before any request exists, so no partially-built URL ever reaches the
    /// transport.
    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError>;

    /// Interprets the transport's outcome. `None` means no response was
    /// obtained; whether that is meaningful absence or a failure is up to
    /// the individual operation.
    fn set_response(&self, response: Option<CommandResponse>)
        -> Result<Self::Result, RavenDbError>;

    /// True for operations the transport may serve from a read-preferred
    /// node, regardless of the HTTP verb ultimately used.
    fn is_read_request(&self) -> bool {
        false
    }

    /// True for operations that must be answered by the node actually asked,
    /// never retried against a secondary.
    fn avoid_failover(&self) -> bool {
        false
    }

    fn state(&self) -> &CommandState;

    fn state_mut(&mut self) -> &mut CommandState;

    /// Pure query used by the transport's failover selection.
    fn is_failed_with_node(&self, node: &ServerNode) -> bool {
        self.state().is_failed_with(node)
    }
}

/// Renders a JSON value as a plain string, without quoting string values.
pub(crate) fn json_value_to_string(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_owned)
        .unwrap_or_else(|| value.to_string())
}

/// The server-reported `"Error"` field, when present.
pub(crate) fn error_field(body: &Value) -> Option<String> {
    body.get("Error").map(json_value_to_string)
}

/// For operations where a missing response is itself a protocol failure.
pub(crate) fn require_response(
    response: Option<CommandResponse>,
) -> Result<CommandResponse, RavenDbError> {
    response.ok_or_else(|| {
        RavenDbError::ProtocolError("no response was received from the server".to_string())
    })
}

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};
    use serde_json::json;
    use url::Url;

    use crate::{RavenDbError, ServerNode};

    use super::{CommandResponse, CommandState, RavenRequest};

    #[test]
    fn if_match_wraps_etag_in_quotes() {
        let url = Url::parse("http://localhost:8080/databases/db/docs").unwrap();

        let request = RavenRequest::new(Method::PUT, url).if_match("etag-123");

        assert_eq!(
            request.headers.get("If-Match").map(String::as_str),
            Some("\"etag-123\"")
        );
    }

    #[test]
    fn json_on_empty_body_is_a_protocol_error() {
        let response = CommandResponse::new(StatusCode::OK, None);

        let result = response.json();

        assert!(matches!(result, Err(RavenDbError::ProtocolError(_))));
    }

    #[test]
    fn json_or_status_reports_the_status_for_garbage_error_bodies() {
        let response = CommandResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "<html>oops</html>".to_string(),
        );

        let result = response.json_or_status();

        assert!(matches!(
            result,
            Err(RavenDbError::TransportError { status, .. })
                if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[test]
    fn json_or_status_keeps_the_parse_error_on_success_statuses() {
        let response = CommandResponse::new(StatusCode::OK, "not json".to_string());

        let result = response.json_or_status();

        assert!(matches!(result, Err(RavenDbError::ProtocolError(_))));
    }

    #[test]
    fn command_state_tracks_failed_nodes() {
        // Arrange
        let node = ServerNode::new(Url::parse("http://localhost:8080").unwrap(), "db");
        let other = ServerNode::new(Url::parse("http://localhost:8081").unwrap(), "db");
        let mut state = CommandState::default();

        // Act
        state.record_failed_node(node.clone());

        // Assert
        assert!(state.is_failed_with(&node));
        assert!(!state.is_failed_with(&other));
    }

    #[test]
    fn http_request_carries_method_headers_and_json_body() {
        let client = reqwest::Client::new();
        let url = Url::parse("http://localhost:8080/databases/db/docs?id=a").unwrap();
        let raven_request =
            RavenRequest::with_body(Method::PUT, url.clone(), json!({"Name": "x"})).if_match("1");

        let request = raven_request.http_request(&client).unwrap();

        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().as_str(), url.as_str());
        assert!(request.headers().contains_key("If-Match"));
        assert!(request.body().is_some());
    }
}
