//! End-to-end pipeline tests against in-memory store and LLM mocks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use counsel_backend::core::config::service::{LlmSettings, RetrievalSettings};
use counsel_backend::llm::{ChatRequest, LlmError, LlmProvider};
use counsel_backend::retrieval::{
    DocumentSection, RetrievalError, RetrievalPipeline, SectionStore,
};

struct MockStore {
    sections: Vec<DocumentSection>,
    unavailable: bool,
}

impl MockStore {
    fn with_sections(sections: Vec<DocumentSection>) -> Self {
        Self {
            sections,
            unavailable: false,
        }
    }

    fn unavailable() -> Self {
        Self {
            sections: Vec::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl SectionStore for MockStore {
    async fn fetch_all(&self) -> Result<Vec<DocumentSection>, RetrievalError> {
        if self.unavailable {
            return Err(RetrievalError::StoreUnavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(self.sections.clone())
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.sections.len())
    }
}

struct MockLlm {
    query_vector: Vec<f32>,
    embed_fails: bool,
    chat_fails: bool,
    embed_calls: AtomicUsize,
    last_user_message: Mutex<Option<String>>,
}

impl MockLlm {
    fn new(query_vector: Vec<f32>) -> Self {
        Self {
            query_vector,
            embed_fails: false,
            chat_fails: false,
            embed_calls: AtomicUsize::new(0),
            last_user_message: Mutex::new(None),
        }
    }

    fn failing_embed() -> Self {
        Self {
            embed_fails: true,
            ..Self::new(vec![1.0, 0.0])
        }
    }

    fn failing_chat(query_vector: Vec<f32>) -> Self {
        Self {
            chat_fails: true,
            ..Self::new(query_vector)
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, LlmError> {
        if self.chat_fails {
            return Err(LlmError::Timeout(Duration::from_secs(30)));
        }
        let user = request
            .messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone());
        *self.last_user_message.lock().unwrap() = user;
        Ok("Per the cited sections, yes.".to_string())
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, LlmError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.embed_fails {
            return Err(LlmError::Request("encoder offline".to_string()));
        }
        Ok(vec![self.query_vector.clone(); inputs.len()])
    }
}

fn section(doc_id: i64, label: &str, content: &str, embedding: Vec<f32>) -> DocumentSection {
    DocumentSection {
        doc_id,
        section: label.to_string(),
        content: content.to_string(),
        embedding,
    }
}

fn pipeline_with(
    store: MockStore,
    llm: Arc<MockLlm>,
    top_k: usize,
) -> RetrievalPipeline {
    let retrieval = RetrievalSettings {
        top_k,
        max_snippet_chars: 500,
    };
    RetrievalPipeline::new(Arc::new(store), llm, &retrieval, &LlmSettings::default())
}

#[tokio::test]
async fn empty_query_never_reaches_the_encoder() {
    let llm = Arc::new(MockLlm::new(vec![1.0, 0.0]));
    let pipeline = pipeline_with(MockStore::with_sections(Vec::new()), llm.clone(), 5);

    let err = pipeline.answer("   ").await.unwrap_err();
    assert!(matches!(err, RetrievalError::EmptyQuery));
    assert_eq!(llm.embed_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn picks_the_closest_section_for_k_one() {
    let store = MockStore::with_sections(vec![
        section(1, "S1", "text A", vec![1.0, 0.0]),
        section(2, "S2", "text B", vec![0.0, 1.0]),
    ]);
    let llm = Arc::new(MockLlm::new(vec![1.0, 0.0]));
    let pipeline = pipeline_with(store, llm, 1);

    let outcome = pipeline.answer("incorporation").await.unwrap();
    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.sources[0].doc_id, 1);
    assert!((outcome.sources[0].score - 1.0).abs() < 1e-5);
    assert_eq!(outcome.answer.as_deref(), Some("Per the cited sections, yes."));
    assert!(outcome.generation_error.is_none());
}

#[tokio::test]
async fn generation_failure_keeps_sources_and_flags_the_error() {
    let store = MockStore::with_sections(vec![
        section(1, "S1", "text A", vec![1.0, 0.0]),
        section(2, "S2", "text B", vec![0.0, 1.0]),
    ]);
    let llm = Arc::new(MockLlm::failing_chat(vec![1.0, 0.0]));
    let pipeline = pipeline_with(store, llm, 5);

    let outcome = pipeline.answer("timeout case").await.unwrap();
    assert_eq!(outcome.sources.len(), 2);
    assert!(outcome.answer.is_none());
    let marker = outcome.generation_error.expect("generation error marker");
    assert!(marker.contains("timed out"));
}

#[tokio::test]
async fn empty_corpus_yields_empty_sources_but_still_answers() {
    let llm = Arc::new(MockLlm::new(vec![1.0, 0.0]));
    let pipeline = pipeline_with(MockStore::with_sections(Vec::new()), llm.clone(), 5);

    let outcome = pipeline.answer("anything").await.unwrap();
    assert!(outcome.sources.is_empty());
    assert!(outcome.answer.is_some());

    let prompt = llm.last_user_message.lock().unwrap().clone().unwrap();
    assert!(prompt.starts_with("Context:\n\n"));
    assert!(prompt.contains("Query: anything"));
}

#[tokio::test]
async fn long_content_is_truncated_in_results_and_context() {
    let long = "a".repeat(1200);
    let store = MockStore::with_sections(vec![section(1, "S1", &long, vec![1.0, 0.0])]);
    let llm = Arc::new(MockLlm::new(vec![1.0, 0.0]));
    let pipeline = pipeline_with(store, llm.clone(), 5);

    let outcome = pipeline.answer("long one").await.unwrap();
    assert_eq!(outcome.sources[0].content.chars().count(), 500);

    let prompt = llm.last_user_message.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("[1 - S1]"));
    assert!(!prompt.contains(&long));
}

#[tokio::test]
async fn encoder_failure_stops_the_pipeline() {
    let store = MockStore::with_sections(vec![section(1, "S1", "text", vec![1.0, 0.0])]);
    let llm = Arc::new(MockLlm::failing_embed());
    let pipeline = pipeline_with(store, llm, 5);

    let err = pipeline.answer("query").await.unwrap_err();
    assert!(matches!(err, RetrievalError::Encoding(_)));
}

#[tokio::test]
async fn unreachable_store_stops_the_pipeline() {
    let llm = Arc::new(MockLlm::new(vec![1.0, 0.0]));
    let pipeline = pipeline_with(MockStore::unavailable(), llm, 5);

    let err = pipeline.answer("query").await.unwrap_err();
    assert!(matches!(err, RetrievalError::StoreUnavailable(_)));
}

#[tokio::test]
async fn repeated_runs_return_identical_order() {
    let sections = vec![
        section(4, "S4", "d", vec![1.0, 0.0]),
        section(2, "S2", "b", vec![1.0, 0.0]),
        section(9, "S9", "i", vec![1.0, 0.0]),
        section(1, "S1", "a", vec![0.0, 1.0]),
    ];
    let llm = Arc::new(MockLlm::new(vec![1.0, 0.0]));
    let pipeline = pipeline_with(MockStore::with_sections(sections), llm, 3);

    let first = pipeline.answer("same query").await.unwrap();
    let second = pipeline.answer("same query").await.unwrap();

    let ids = |o: &counsel_backend::retrieval::AskOutcome| {
        o.sources.iter().map(|s| s.doc_id).collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), vec![2, 4, 9]);
    assert_eq!(ids(&first), ids(&second));
}
