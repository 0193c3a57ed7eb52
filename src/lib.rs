//! Drives a browser toward a natural-language goal by asking a language
//! model for one small batch of actions at a time.

pub mod actions;
pub mod agent;
pub mod brain;
pub mod chunk;
pub mod config;
pub mod dom;
pub mod error;
pub mod gemini;
pub mod hands;
pub mod logging;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent::AgentLoop;
pub use brain::{Brain, LanguageModel};
pub use config::{AgentConfig, BrowserConfig, ModelConfig};
pub use error::{BrowserError, ExecutionError, ModelError, ScriptRejection};
pub use gemini::GeminiClient;
pub use hands::{ChromePage, PageHandle};
pub use retry::RetryPolicy;
pub use types::{AgentEvent, Goal, SessionEvent, SessionId, SessionReport, SessionStatus};
