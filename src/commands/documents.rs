//! Single-document CRUD: get, put, delete, patch.

use std::collections::HashSet;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use crate::{
    patch_request::PatchRequest,
    raven_command::{
        error_field, json_value_to_string, require_response, CommandResponse, CommandState,
        RavenCommand, RavenRequest,
    },
    RavenDbError, ServerNode,
};

/// Cumulative id length beyond which a multi-get drops from GET with
/// query-string ids to POST with a JSON id array; very long GET URLs are
/// unreliable across proxies and servers. The POST form is no longer
/// HTTP-cache eligible.
const MAX_GET_URL_ID_LENGTH: usize = 1024;

/// The document key(s) a [`GetDocumentsCommand`] loads.
#[derive(Debug, Clone)]
pub enum DocumentKeys {
    Single(String),
    Many(Vec<String>),
}

impl From<&str> for DocumentKeys {
    fn from(key: &str) -> Self {
        DocumentKeys::Single(key.to_string())
    }
}

impl From<String> for DocumentKeys {
    fn from(key: String) -> Self {
        DocumentKeys::Single(key)
    }
}

impl From<Vec<String>> for DocumentKeys {
    fn from(keys: Vec<String>) -> Self {
        DocumentKeys::Many(keys)
    }
}

impl From<&[&str]> for DocumentKeys {
    fn from(keys: &[&str]) -> Self {
        DocumentKeys::Many(keys.iter().map(|k| k.to_string()).collect())
    }
}

/// Loads one or more documents by key, optionally pulling referenced
/// documents along via `includes`.
#[derive(Debug)]
pub struct GetDocumentsCommand {
    keys: DocumentKeys,
    includes: Vec<String>,
    metadata_only: bool,
    state: CommandState,
}

impl GetDocumentsCommand {
    pub fn new(keys: impl Into<DocumentKeys>) -> Self {
        Self {
            keys: keys.into(),
            includes: Vec::new(),
            metadata_only: false,
            state: CommandState::default(),
        }
    }

    /// Paths in the requested documents the server should follow to include
    /// referenced documents in the same response.
    pub fn with_includes(mut self, includes: Vec<String>) -> Self {
        self.includes = includes;
        self
    }

    pub fn metadata_only(mut self, metadata_only: bool) -> Self {
        self.metadata_only = metadata_only;
        self
    }
}

impl RavenCommand for GetDocumentsCommand {
    type Result = Option<Value>;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        match &self.keys {
            DocumentKeys::Single(key) if key.is_empty() => {
                return Err(RavenDbError::InvalidArgument(
                    "document key must not be empty".to_string(),
                ));
            }
            DocumentKeys::Many(keys) if keys.is_empty() => {
                return Err(RavenDbError::InvalidArgument(
                    "at least one document key is required".to_string(),
                ));
            }
            _ => {}
        }

        let mut url = node.database_url(&["docs"])?;
        if !self.includes.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for include in &self.includes {
                pairs.append_pair("include", include);
            }
        }

        let request = match &self.keys {
            DocumentKeys::Single(key) => {
                url.query_pairs_mut().append_pair("id", key);
                RavenRequest::new(Method::GET, url)
            }
            DocumentKeys::Many(keys) => {
                let keys = dedup_preserving_order(keys);
                if self.metadata_only {
                    url.query_pairs_mut().append_pair("metadata-only", "true");
                }
                let total_length: usize = keys.iter().map(|k| k.len()).sum();
                if total_length > MAX_GET_URL_ID_LENGTH {
                    RavenRequest::with_body(Method::POST, url, json!(keys))
                } else {
                    {
                        let mut pairs = url.query_pairs_mut();
                        for key in &keys {
                            pairs.append_pair("id", key);
                        }
                    }
                    RavenRequest::new(Method::GET, url)
                }
            }
        };
        Ok(request)
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let Some(response) = response else {
            return Ok(None);
        };
        let body = response.json().map_err(|_| {
            RavenDbError::ProtocolError(
                "failed to load documents from the database; check the connection to the server"
                    .to_string(),
            )
        })?;
        if let Some(message) = error_field(&body) {
            return Err(RavenDbError::ServerError(message));
        }
        Ok(Some(body))
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

fn dedup_preserving_order(keys: &[String]) -> Vec<&String> {
    let mut seen = HashSet::new();
    keys.iter().filter(|key| seen.insert(key.as_str())).collect()
}

/// Stores a document under a key, optionally guarded by an etag.
#[derive(Debug)]
pub struct PutDocumentCommand {
    key: String,
    document: Value,
    etag: Option<String>,
    state: CommandState,
}

impl PutDocumentCommand {
    /// A `None` document stores an empty one.
    pub fn new(key: impl Into<String>, document: impl Into<Option<Value>>) -> Self {
        Self {
            key: key.into(),
            document: document
                .into()
                .unwrap_or_else(|| Value::Object(Default::default())),
            etag: None,
            state: CommandState::default(),
        }
    }

    /// Enforce optimistic concurrency: the put only succeeds if the server's
    /// current etag for the document matches.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

impl RavenCommand for PutDocumentCommand {
    type Result = Value;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        if self.key.is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "document key must not be empty".to_string(),
            ));
        }
        if !self.document.is_object() {
            return Err(RavenDbError::InvalidArgument(
                "document must be a JSON object".to_string(),
            ));
        }

        let mut url = node.database_url(&["docs"])?;
        url.query_pairs_mut().append_pair("id", &self.key);
        let mut request = RavenRequest::with_body(Method::PUT, url, self.document.clone());
        if let Some(etag) = &self.etag {
            request = request.if_match(etag);
        }
        Ok(request)
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let response = require_response(response)?;
        let body = response.json().map_err(|_| {
            RavenDbError::ProtocolError(
                "failed to put document in the database; check the connection to the server"
                    .to_string(),
            )
        })?;
        if let Some(message) = error_field(&body) {
            if let Some(actual_etag) = body.get("ActualEtag") {
                return Err(RavenDbError::ConcurrencyConflict {
                    message,
                    actual_etag: Some(json_value_to_string(actual_etag)),
                });
            }
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

/// Deletes a document by key, optionally guarded by an etag.
#[derive(Debug)]
pub struct DeleteDocumentCommand {
    key: String,
    etag: Option<String>,
    state: CommandState,
}

impl DeleteDocumentCommand {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            etag: None,
            state: CommandState::default(),
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

impl RavenCommand for DeleteDocumentCommand {
    type Result = ();

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        if self.key.is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "document key must not be empty".to_string(),
            ));
        }
        let mut url = node.database_url(&["docs"])?;
        url.query_pairs_mut().append_pair("id", &self.key);
        let mut request = RavenRequest::new(Method::DELETE, url);
        if let Some(etag) = &self.etag {
            request = request.if_match(etag);
        }
        Ok(request)
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        match response {
            // The document was already absent; nothing to do.
            None => {
                tracing::info!(key = %self.key, "could not find the document to delete");
                Ok(())
            }
            Some(response) if response.status() == StatusCode::NO_CONTENT => Ok(()),
            Some(response) => {
                let body = response.json_or_status()?;
                match error_field(&body) {
                    Some(message) => Err(RavenDbError::ServerError(message)),
                    None => Err(response.status_error()),
                }
            }
        }
    }

    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}

/// Applies a JavaScript patch to a document, with an optional fallback patch
/// for when the document does not exist.
#[derive(Debug)]
pub struct PatchCommand {
    key: String,
    patch: PatchRequest,
    patch_if_missing: Option<PatchRequest>,
    etag: Option<String>,
    skip_patch_if_etag_mismatch: bool,
    return_debug_information: bool,
    state: CommandState,
}

impl PatchCommand {
    pub fn new(key: impl Into<String>, patch: PatchRequest) -> Self {
        Self {
            key: key.into(),
            patch,
            patch_if_missing: None,
            etag: None,
            skip_patch_if_etag_mismatch: false,
            return_debug_information: false,
            state: CommandState::default(),
        }
    }

    pub fn with_patch_if_missing(mut self, patch: PatchRequest) -> Self {
        self.patch_if_missing = Some(patch);
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn skip_patch_if_etag_mismatch(mut self, skip: bool) -> Self {
        self.skip_patch_if_etag_mismatch = skip;
        self
    }

    pub fn return_debug_information(mut self, debug: bool) -> Self {
        self.return_debug_information = debug;
        self
    }
}

impl RavenCommand for PatchCommand {
    type Result = Option<Value>;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        if self.key.is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "document key must not be empty".to_string(),
            ));
        }
        if self.patch.script().is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "patch script must not be empty".to_string(),
            ));
        }
        if let Some(patch_if_missing) = &self.patch_if_missing {
            if patch_if_missing.script().is_empty() {
                return Err(RavenDbError::InvalidArgument(
                    "patch-if-missing script must not be empty".to_string(),
                ));
            }
        }

        let mut url = node.database_url(&["docs"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("id", &self.key);
            if self.skip_patch_if_etag_mismatch {
                pairs.append_pair("skipPatchIfEtagMismatch", "true");
            }
            if self.return_debug_information {
                pairs.append_pair("debug", "true");
            }
        }
        let body = json!({
            "Patch": self.patch,
            "PatchIfMissing": self.patch_if_missing,
        });
        let mut request = RavenRequest::with_body(Method::PATCH, url, body);
        if let Some(etag) = &self.etag {
            request = request.if_match(etag);
        }
        Ok(request)
    }

    /// Anything but a 200 yields `None`: the patch was not applied, whether
    /// because the document is missing, the etag mismatch was skipped, or the
    /// server refused. Callers must treat `None` as "no patch applied".
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

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};
    use serde_json::json;
    use url::Url;

    use crate::{
        raven_command::{CommandResponse, RavenCommand},
        PatchRequest, RavenDbError, ServerNode,
    };

    use super::{
        DeleteDocumentCommand, GetDocumentsCommand, PatchCommand, PutDocumentCommand,
        MAX_GET_URL_ID_LENGTH,
    };

    fn node() -> ServerNode {
        ServerNode::new(Url::parse("http://localhost:8080").unwrap(), "northwind")
    }

    #[test]
    fn get_single_key_is_percent_encoded() {
        let command = GetDocumentsCommand::new("people/1 2");

        let request = command.create_request(&node()).unwrap();

        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.url.as_str(),
            "http://localhost:8080/databases/northwind/docs?id=people%2F1+2"
        );
    }

    #[test]
    fn get_many_keys_deduplicates_preserving_first_seen_order() {
        let keys = vec![
            "people/2".to_string(),
            "people/1".to_string(),
            "people/2".to_string(),
            "people/3".to_string(),
        ];
        let command = GetDocumentsCommand::new(keys);

        let request = command.create_request(&node()).unwrap();

        let ids: Vec<String> = request
            .url
            .query_pairs()
            .filter(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(ids, vec!["people/2", "people/1", "people/3"]);
    }

    #[test]
    fn get_switches_to_post_when_keys_exceed_the_get_url_limit() {
        let keys: Vec<String> = (0..8).map(|i| format!("{i}{}", "x".repeat(200))).collect();
        assert!(keys.iter().map(|k| k.len()).sum::<usize>() > MAX_GET_URL_ID_LENGTH);
        let command = GetDocumentsCommand::new(keys.clone());

        let request = command.create_request(&node()).unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(json!(keys)));
        assert!(!request.url.query_pairs().any(|(k, _)| k == "id"));
    }

    #[test]
    fn get_emits_includes_and_metadata_only() {
        let command = GetDocumentsCommand::new(vec!["people/1".to_string()])
            .with_includes(vec!["Manager".to_string()])
            .metadata_only(true);

        let request = command.create_request(&node()).unwrap();

        let query = request.url.query().unwrap();
        assert!(query.contains("include=Manager"));
        assert!(query.contains("metadata-only=true"));
    }

    #[test]
    fn get_rejects_empty_keys() {
        let empty_single = GetDocumentsCommand::new("").create_request(&node());
        let empty_many = GetDocumentsCommand::new(Vec::<String>::new()).create_request(&node());

        assert!(matches!(empty_single, Err(RavenDbError::InvalidArgument(_))));
        assert!(matches!(empty_many, Err(RavenDbError::InvalidArgument(_))));
    }

    #[test]
    fn get_set_response_passes_server_errors_through() {
        let command = GetDocumentsCommand::new("people/1");
        let response = CommandResponse::new(
            StatusCode::OK,
            json!({"Error": "index corrupted"}).to_string(),
        );

        let result = command.set_response(Some(response));

        assert!(matches!(result, Err(RavenDbError::ServerError(m)) if m == "index corrupted"));
    }

    #[test]
    fn get_set_response_tolerates_missing_response() {
        let command = GetDocumentsCommand::new("people/1");

        assert!(matches!(command.set_response(None), Ok(None)));
    }

    #[test]
    fn put_with_etag_sets_if_match_header() {
        let command =
            PutDocumentCommand::new("people/1", json!({"Name": "Oren"})).with_etag("etag-7");

        let request = command.create_request(&node()).unwrap();

        assert_eq!(request.method, Method::PUT);
        assert_eq!(
            request.headers.get("If-Match").map(String::as_str),
            Some("\"etag-7\"")
        );
    }

    #[test]
    fn put_without_etag_has_no_if_match_header() {
        let command = PutDocumentCommand::new("people/1", json!({}));

        let request = command.create_request(&node()).unwrap();

        assert!(!request.headers.contains_key("If-Match"));
    }

    #[test]
    fn put_rejects_non_object_documents() {
        let command = PutDocumentCommand::new("people/1", json!(["not", "an", "object"]));

        let result = command.create_request(&node());

        assert!(matches!(result, Err(RavenDbError::InvalidArgument(_))));
    }

    #[test]
    fn put_conflict_response_is_a_concurrency_conflict() {
        let command = PutDocumentCommand::new("people/1", json!({}));
        let response = CommandResponse::new(
            StatusCode::CONFLICT,
            json!({"Error": "etag mismatch", "ActualEtag": "42"}).to_string(),
        );

        let result = command.set_response(Some(response));

        assert!(matches!(
            result,
            Err(RavenDbError::ConcurrencyConflict { actual_etag: Some(etag), .. }) if etag == "42"
        ));
    }

    #[test]
    fn put_error_without_etag_is_a_server_error() {
        let command = PutDocumentCommand::new("people/1", json!({}));
        let response = CommandResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"Error": "disk full"}).to_string(),
        );

        let result = command.set_response(Some(response));

        assert!(matches!(result, Err(RavenDbError::ServerError(_))));
    }

    #[test]
    fn delete_tolerates_missing_response() {
        let command = DeleteDocumentCommand::new("people/1");

        assert!(command.set_response(None).is_ok());
    }

    #[test]
    fn delete_accepts_204() {
        let command = DeleteDocumentCommand::new("people/1");
        let response = CommandResponse::new(StatusCode::NO_CONTENT, None);

        assert!(command.set_response(Some(response)).is_ok());
    }

    #[test]
    fn delete_raises_on_error_body() {
        let command = DeleteDocumentCommand::new("people/1");
        let response = CommandResponse::new(
            StatusCode::OK,
            json!({"Error": "document is locked"}).to_string(),
        );

        let result = command.set_response(Some(response));

        assert!(matches!(result, Err(RavenDbError::ServerError(_))));
    }

    #[test]
    fn patch_encodes_flags_as_query_parameters() {
        let command = PatchCommand::new("people/1", PatchRequest::new("this.X = 1;"))
            .skip_patch_if_etag_mismatch(true)
            .return_debug_information(true);

        let request = command.create_request(&node()).unwrap();

        let query = request.url.query().unwrap();
        assert_eq!(request.method, Method::PATCH);
        assert!(query.contains("skipPatchIfEtagMismatch=true"));
        assert!(query.contains("debug=true"));
    }

    #[test]
    fn patch_body_carries_both_patches() {
        let command = PatchCommand::new("people/1", PatchRequest::new("this.X = 1;"))
            .with_patch_if_missing(PatchRequest::new("this.X = 0;"));

        let request = command.create_request(&node()).unwrap();

        let body = request.body.unwrap();
        assert_eq!(body["Patch"]["Script"], json!("this.X = 1;"));
        assert_eq!(body["PatchIfMissing"]["Script"], json!("this.X = 0;"));
    }

    #[test]
    fn patch_rejects_empty_fallback_script() {
        let command = PatchCommand::new("people/1", PatchRequest::new("this.X = 1;"))
            .with_patch_if_missing(PatchRequest::new(""));

        let result = command.create_request(&node());

        assert!(matches!(result, Err(RavenDbError::InvalidArgument(_))));
    }

    #[test]
    fn patch_non_200_yields_no_result() {
        let command = PatchCommand::new("people/1", PatchRequest::new("this.X = 1;"));
        let response = CommandResponse::new(StatusCode::NOT_FOUND, None);

        assert!(matches!(command.set_response(Some(response)), Ok(None)));
        assert!(matches!(command.set_response(None), Ok(None)));
    }
}
