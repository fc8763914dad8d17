//! SectionStore trait — abstract interface over the indexed corpus.
//!
//! The retrieval path only reads; ingestion lives on the concrete
//! backend (`SqliteSectionStore`), which is the sole writer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::RetrievalError;

/// One indexed section of a legal document, with its precomputed
/// embedding. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSection {
    /// Unique identifier within the corpus.
    pub doc_id: i64,
    /// Section label (e.g. "Section 12 - Incorporation").
    pub section: String,
    /// Full section text, unbounded length.
    pub content: String,
    /// Embedding vector; every section in a corpus shares one dimension.
    pub embedding: Vec<f32>,
}

/// Read-only view of the corpus.
#[async_trait]
pub trait SectionStore: Send + Sync {
    /// Fetch every indexed section. An empty corpus is a valid,
    /// non-error state.
    async fn fetch_all(&self) -> Result<Vec<DocumentSection>, RetrievalError>;

    /// Total number of indexed sections.
    async fn count(&self) -> Result<usize, RetrievalError>;
}
