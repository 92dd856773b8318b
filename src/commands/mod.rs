//! The concrete command set: one type per server operation.

mod admin;
mod batch;
mod documents;
mod indexes;
mod operations;
mod queries;

pub use admin::{CreateDatabaseCommand, DeleteDatabaseCommand};
pub use batch::{BatchCommand, CommandData};
pub use documents::{
    DeleteDocumentCommand, DocumentKeys, GetDocumentsCommand, PatchCommand, PutDocumentCommand,
};
pub use indexes::{
    DeleteByIndexCommand, DeleteIndexCommand, GetIndexCommand, PatchByIndexCommand,
    PutIndexesCommand,
};
pub use operations::{GetOperationStateCommand, GetStatisticsCommand, GetTopologyCommand};
pub use queries::QueryCommand;
