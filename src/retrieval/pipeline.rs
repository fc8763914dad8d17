//! Retrieval pipeline — one request/response cycle.
//!
//! Validating → Encoding → Retrieving → Ranking → Assembling →
//! Generating. Validation, encoding and store failures stop the
//! pipeline; a generation failure degrades the outcome but never
//! discards the retrieved sources.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context::ContextAssembler;
use super::ranker::{self, ScoredSection};
use super::store::SectionStore;
use super::RetrievalError;
use crate::core::config::service::{LlmSettings, RetrievalSettings};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

const SYSTEM_PROMPT: &str = "You are a helpful legal assistant. \
Use the provided context to answer queries.";

/// One cited section in the response, content already capped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub doc_id: i64,
    pub section: String,
    pub content: String,
    pub score: f32,
}

/// Final pipeline outcome.
///
/// `answer` and `generation_error` are separate fields: a generation
/// failure sets the error and leaves the answer empty, it never writes
/// error text into the answer channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskOutcome {
    pub answer: Option<String>,
    pub generation_error: Option<String>,
    pub sources: Vec<SourceRef>,
}

/// Sequences encoder, store, ranker, assembler and generative model
/// into one request cycle. Collaborators are injected; the pipeline
/// holds no ambient globals and no per-request state.
#[derive(Clone)]
pub struct RetrievalPipeline {
    store: Arc<dyn SectionStore>,
    llm: Arc<dyn LlmProvider>,
    assembler: ContextAssembler,
    top_k: usize,
    chat_model: String,
    embedding_model: String,
}

impl RetrievalPipeline {
    pub fn new(
        store: Arc<dyn SectionStore>,
        llm: Arc<dyn LlmProvider>,
        retrieval: &RetrievalSettings,
        llm_settings: &LlmSettings,
    ) -> Self {
        Self {
            store,
            llm,
            assembler: ContextAssembler::new(retrieval.max_snippet_chars),
            top_k: retrieval.top_k,
            chat_model: llm_settings.chat_model.clone(),
            embedding_model: llm_settings.embedding_model.clone(),
        }
    }

    /// Run the full cycle for one query.
    pub async fn answer(&self, query: &str) -> Result<AskOutcome, RetrievalError> {
        // Validating
        let query = query.trim();
        if query.is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        // Encoding
        let query_vec = self.encode(query).await?;

        // Retrieving
        let sections = self.store.fetch_all().await?;
        tracing::debug!(candidates = sections.len(), "fetched corpus");

        // Ranking
        let ranked = ranker::rank(&query_vec, sections, self.top_k);

        // Assembling
        let context = self.assembler.assemble(&ranked);

        // Generating
        let (answer, generation_error) = match self.generate(&context, query).await {
            Ok(text) => (Some(text), None),
            Err(err) => {
                tracing::warn!("generation failed, returning sources only: {err}");
                (None, Some(err.to_string()))
            }
        };

        Ok(AskOutcome {
            answer,
            generation_error,
            sources: self.to_sources(&ranked),
        })
    }

    async fn encode(&self, query: &str) -> Result<Vec<f32>, RetrievalError> {
        let mut vectors = self
            .llm
            .embed(&[query.to_string()], &self.embedding_model)
            .await
            .map_err(|e| RetrievalError::Encoding(e.to_string()))?;

        if vectors.len() != 1 {
            return Err(RetrievalError::Encoding(format!(
                "expected one query vector, got {}",
                vectors.len()
            )));
        }

        Ok(vectors.remove(0))
    }

    async fn generate(&self, context: &str, query: &str) -> Result<String, crate::llm::LlmError> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("Context:\n{context}\n\nQuery: {query}")),
        ];

        self.llm
            .chat(ChatRequest::new(messages), &self.chat_model)
            .await
    }

    fn to_sources(&self, ranked: &[ScoredSection]) -> Vec<SourceRef> {
        ranked
            .iter()
            .map(|r| SourceRef {
                doc_id: r.section.doc_id,
                section: r.section.section.clone(),
                content: self.assembler.truncate(&r.section.content),
                score: r.score,
            })
            .collect()
    }
}
