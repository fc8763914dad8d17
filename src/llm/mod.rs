pub mod ollama;
pub mod provider;
pub mod types;

pub use ollama::OllamaProvider;
pub use provider::{LlmError, LlmProvider};
pub use types::{ChatMessage, ChatRequest};
