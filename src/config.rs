//! Configuration objects, built once at startup and passed into constructors.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_URL: &str = "https://www.amazon.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Knobs of the agent loop itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Site every session starts on.
    pub target_url: String,
    pub max_steps: usize,
    /// Hard cap on snapshot length, in characters.
    pub snapshot_max_chars: usize,
    pub chunk_max_chars: usize,
    /// Most action lines the model may request in one step.
    pub max_actions_per_step: usize,
    /// Extra wait after navigation-like actions.
    #[serde(with = "millis")]
    pub settle_delay: Duration,
    /// Selectors tried in order when building a snapshot.
    pub snapshot_selectors: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            max_steps: 6,
            snapshot_max_chars: 60_000,
            chunk_max_chars: 15_000,
            max_actions_per_step: 4,
            settle_delay: Duration::from_secs(1),
            snapshot_selectors: [
                "#nav-search-bar-form",
                "#search",
                ".s-main-slot",
                "#dp",
                "#productTitle",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// How the Chrome process is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    /// Explicit Chrome binary; auto-detected when unset.
    pub chrome_path: Option<std::path::PathBuf>,
    pub sandbox: bool,
    #[serde(with = "millis")]
    pub idle_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_path: None,
            sandbox: true,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Model identity, credentials and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub attempts: u32,
    #[serde(with = "millis")]
    pub base_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    /// Added on top of a provider-suggested wait.
    #[serde(with = "millis")]
    pub hint_margin: Duration,
    #[serde(with = "millis")]
    pub connect_timeout: Duration,
    #[serde(with = "millis")]
    pub request_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            attempts: 3,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            hint_margin: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl ModelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
