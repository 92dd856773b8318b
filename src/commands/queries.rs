//! Query execution against a named index.

use reqwest::Method;
use serde_json::Value;

use crate::{
    index_query::{IndexQuery, QueryOperator},
    raven_command::{error_field, CommandResponse, CommandState, RavenCommand, RavenRequest},
    DocumentConventions, RavenDbError, ServerNode,
};

/// Runs an [`IndexQuery`] against a named index. Conceptually always a read,
/// whichever verb ends up on the wire.
#[derive(Debug)]
pub struct QueryCommand {
    index_name: String,
    query: IndexQuery,
    conventions: DocumentConventions,
    includes: Vec<String>,
    metadata_only: bool,
    index_entries_only: bool,
    state: CommandState,
}

impl QueryCommand {
    pub fn new(
        index_name: impl Into<String>,
        query: IndexQuery,
        conventions: DocumentConventions,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            query,
            conventions,
            includes: Vec::new(),
            metadata_only: false,
            index_entries_only: false,
            state: CommandState::default(),
        }
    }

    pub fn with_includes(mut self, includes: Vec<String>) -> Self {
        self.includes = includes;
        self
    }

    pub fn metadata_only(mut self, metadata_only: bool) -> Self {
        self.metadata_only = metadata_only;
        self
    }

    /// Debug mode: return raw index entries instead of documents.
    pub fn index_entries_only(mut self, index_entries_only: bool) -> Self {
        self.index_entries_only = index_entries_only;
        self
    }
}

impl RavenCommand for QueryCommand {
    type Result = Value;

    fn create_request(&self, node: &ServerNode) -> Result<RavenRequest, RavenDbError> {
        if self.index_name.is_empty() {
            return Err(RavenDbError::InvalidArgument(
                "index name must not be empty".to_string(),
            ));
        }

        let mut url = node.database_url(&["queries", &self.index_name])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("pageSize", &self.query.page_size().to_string());
            // OR is the server's implicit default; only deviations go on the wire.
            if self.query.default_operator() == QueryOperator::And {
                pairs.append_pair("operator", QueryOperator::And.as_str());
            }
            if !self.query.query().is_empty() {
                pairs.append_pair("query", self.query.query());
            }
            for hint in self.query.sort_hints() {
                match hint.split_once('=') {
                    Some((key, value)) => {
                        pairs.append_pair(key, value);
                    }
                    None => {
                        pairs.append_key_only(hint);
                    }
                }
            }
            for field in self.query.sort_fields() {
                pairs.append_pair("sort", field);
            }
            for field in self.query.fetch() {
                pairs.append_pair("fetch", field);
            }
            if self.metadata_only {
                pairs.append_pair("metadata-only", "true");
            }
            if self.index_entries_only {
                pairs.append_pair("debug", "entries");
            }
            for include in &self.includes {
                pairs.append_pair("include", include);
            }
            if let Some(timeout) = self.query.wait_for_non_stale_results_timeout() {
                pairs.append_pair(
                    "waitForNonStaleResultsTimeout",
                    &timeout.as_secs().to_string(),
                );
            }
        }

        // Query texts within the conventions threshold travel as POST; the
        // server accepts both and the operation stays a read either way.
        let method = if self.query.query().len()
            <= self.conventions.max_length_of_query_using_get_url()
        {
            Method::POST
        } else {
            Method::GET
        };
        Ok(RavenRequest::new(method, url))
    }

    fn set_response(
        &self,
        response: Option<CommandResponse>,
    ) -> Result<Self::Result, RavenDbError> {
        let Some(response) = response else {
            return Err(RavenDbError::NotFound(format!(
                "could not find index `{}`",
                self.index_name
            )));
        };
        let body = response.json()?;
        if let Some(message) = error_field(&body) {
            return Err(RavenDbError::ServerError(message));
        }
        Ok(body)
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
