/*!
ravendb_commands is the request/response abstraction layer of a RavenDB
client: each command encapsulates one REST operation against a document
database, building the request for a [`ServerNode`] and interpreting the
transport's response into a typed result or a classified [`RavenDbError`].

The transport itself (connections, retries across failover nodes, TLS) lives
elsewhere. It drives the two-phase contract: call
[`RavenCommand::create_request`] to obtain a [`RavenRequest`], perform the
HTTP exchange, then hand the outcome back through
[`RavenCommand::set_response`]. Commands are single-use values with no shared
state, so the transport may run any number of them concurrently.

# Example
```no_run
use ravendb_commands::{commands::GetDocumentsCommand, RavenCommand, ServerNode};
use url::Url;

let node = ServerNode::new(Url::parse("http://localhost:8080")?, "northwind");
let command = GetDocumentsCommand::new("people/1");
let request = command.create_request(&node)?;

// ...the transport sends `request` and produces a `CommandResponse`...
# let response = None;

let document = command.set_response(response)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

mod database_document;
mod document_conventions;
mod index_definition;
mod index_query;
mod patch_request;
mod ravendb_error;
mod server_node;

pub mod commands;
pub mod raven_command;

pub use database_document::{
    validate_database_name, DatabaseDocument, DATABASES_PREFIX, DATA_DIRECTORY_SETTING,
};
pub use document_conventions::DocumentConventions;
pub use index_definition::IndexDefinition;
pub use index_query::{IndexQuery, QueryOperationOptions, QueryOperator};
pub use patch_request::PatchRequest;
pub use raven_command::{CommandResponse, CommandState, RavenCommand, RavenRequest};
pub use ravendb_error::RavenDbError;
pub use server_node::ServerNode;

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
