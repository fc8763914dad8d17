use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;

/// Typed application settings, loaded from `config.yml`.
///
/// Every section is optional in the file; missing sections fall back to
/// their defaults so a bare install starts with no config at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of sections forwarded to the generative model.
    pub top_k: usize,
    /// Per-section content cap in the assembled context and in results.
    pub max_snippet_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Overrides the default `<data dir>/corpus.db` location when set.
    pub db_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            llm: LlmSettings::default(),
            retrieval: RetrievalSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            chat_model: "mistral".to_string(),
            embedding_model: "all-minilm".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_snippet_chars: 500,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { db_path: None }
    }
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("COUNSEL_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Loads settings from the resolved config path.
    ///
    /// A missing file yields defaults; a malformed file is reported so a
    /// typo never silently reverts the whole configuration.
    pub fn load(&self) -> anyhow::Result<Settings> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(Settings::default());
        }

        let raw = fs::read_to_string(&path)?;
        let settings: Settings = serde_yaml::from_str(&raw)?;
        Ok(settings)
    }

    pub fn db_path(&self, settings: &Settings) -> PathBuf {
        settings
            .storage
            .db_path
            .clone()
            .unwrap_or_else(|| self.paths.db_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_retrieval_contract() {
        let settings = Settings::default();
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.retrieval.max_snippet_chars, 500);
    }

    #[test]
    fn partial_yaml_keeps_section_defaults() {
        let settings: Settings =
            serde_yaml::from_str("retrieval:\n  top_k: 3\n").expect("valid yaml");
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.retrieval.max_snippet_chars, 500);
        assert_eq!(settings.llm.chat_model, "mistral");
    }
}
