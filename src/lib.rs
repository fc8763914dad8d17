pub mod core;
pub mod llm;
pub mod logging;
pub mod retrieval;
pub mod server;
pub mod state;
