//! Retrieval-augmented answering over the indexed legal corpus.

pub mod context;
pub mod pipeline;
pub mod ranker;
pub mod sqlite;
pub mod store;

use thiserror::Error;

use crate::core::errors::ApiError;

pub use context::ContextAssembler;
pub use pipeline::{AskOutcome, RetrievalPipeline, SourceRef};
pub use ranker::ScoredSection;
pub use sqlite::SqliteSectionStore;
pub use store::{DocumentSection, SectionStore};

/// Failure of a retrieval stage. Each variant maps to exactly one
/// pipeline stage so callers can branch without string matching.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("embedding backend error: {0}")]
    Encoding(String),
    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("invalid section: {0}")]
    InvalidSection(String),
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::EmptyQuery => ApiError::BadRequest("query is required".to_string()),
            RetrievalError::Encoding(msg) => {
                ApiError::ServiceUnavailable(format!("embedding backend error: {msg}"))
            }
            RetrievalError::StoreUnavailable(msg) => {
                ApiError::ServiceUnavailable(format!("document store unavailable: {msg}"))
            }
            RetrievalError::InvalidSection(msg) => ApiError::BadRequest(msg),
        }
    }
}
