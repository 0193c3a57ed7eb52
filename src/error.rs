//! Error types shared across the agent.

use std::time::Duration;

use thiserror::Error;

/// Failures of the language-model boundary.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Wait suggested by the provider, if the payload carried one.
        retry_after: Option<Duration>,
    },

    #[error("Malformed reply: {0}")]
    Malformed(String),

    #[error("Model call failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ModelError>,
    },
}

impl ModelError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ModelError::RateLimited { .. })
    }

    /// Provider-suggested wait, only present on rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ModelError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Failures of a browser primitive.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element {selector} unavailable: {reason}")]
    Element { selector: String, reason: String },

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser task failed: {0}")]
    Task(String),
}

/// A step whose action failed in the browser.
#[derive(Debug, Error)]
#[error("action {index} `{action}` failed: {source}")]
pub struct ExecutionError {
    /// 1-based position of the failing action in the script.
    pub index: usize,
    pub action: String,
    #[source]
    pub source: BrowserError,
}

/// Why a generated script was refused before execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptRejection {
    #[error("contains forbidden pattern `{pattern}`")]
    Denylisted { pattern: &'static str },

    #[error("no action lines")]
    Empty,

    #[error("{count} action lines, at most {max} allowed")]
    TooManyActions { count: usize, max: usize },

    #[error("line {line} is not a known action: {reason}")]
    Unparseable { line: usize, reason: String },
}
