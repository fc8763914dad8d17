use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::llm::{LlmProvider, OllamaProvider};
use crate::retrieval::{RetrievalPipeline, SectionStore, SqliteSectionStore};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to open corpus store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] anyhow::Error),
}

/// Shared application state.
///
/// The store and LLM provider are constructed here and injected into
/// the pipeline; request handlers see only this container.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub store: Arc<dyn SectionStore>,
    pub llm: Arc<dyn LlmProvider>,
    pub pipeline: RetrievalPipeline,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let settings = config.load().map_err(InitializationError::Config)?;

        let db_path = config.db_path(&settings);
        let store: Arc<dyn SectionStore> = Arc::new(
            SqliteSectionStore::new(db_path)
                .await
                .map_err(|e| InitializationError::Store(e.into()))?,
        );

        let llm: Arc<dyn LlmProvider> = Arc::new(
            OllamaProvider::new(
                settings.llm.base_url.clone(),
                Duration::from_secs(settings.llm.request_timeout_secs),
            )
            .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let pipeline = RetrievalPipeline::new(
            store.clone(),
            llm.clone(),
            &settings.retrieval,
            &settings.llm,
        );

        Ok(Arc::new(AppState {
            paths,
            settings,
            store,
            llm,
            pipeline,
        }))
    }
}
