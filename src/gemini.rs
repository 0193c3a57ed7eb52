//! Gemini `generateContent` transport.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::brain::LanguageModel;
use crate::config::ModelConfig;
use crate::error::ModelError;

const API_KEY_HEADER: &str = "x-goog-api-key";

static RETRY_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry_?delay[^0-9]*(\d+)").expect("retry hint pattern is valid")
});

/// Generate content response, reduced to what reply extraction reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate that has any, its parts concatenated in
    /// order. Empty when no candidate carries text.
    pub fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }
}

/// Wait suggested inside a provider error payload, in seconds.
pub fn parse_retry_hint(payload: &str) -> Option<Duration> {
    RETRY_HINT
        .captures(payload)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Maps a non-success reply onto the error taxonomy.
pub fn classify_error(status: StatusCode, body: &str) -> ModelError {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        return ModelError::RateLimited {
            message: format!("{status}: {body}"),
            retry_after: parse_retry_hint(body),
        };
    }
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string());
    ModelError::ApiError {
        status: status.as_u16(),
        message,
    }
}

/// Gemini API client. One per process; cheap to share.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ModelError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One `generateContent` call, no retries.
    pub async fn generate_content(&self, prompt: &str) -> Result<GenerateContentResponse, ModelError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "Gemini generate_content"
        );

        // The key travels in a header so transport errors, which quote the
        // URL, never carry it.
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            }))
            .send()
            .await
            .map_err(|e| ModelError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| ModelError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let response = self.generate_content(prompt).await?;
        if let Some(reason) = response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            debug!(finish_reason = reason, "Gemini reply");
        }
        Ok(response.text())
    }
}

#[cfg(test)]
#[path = "gemini_tests.rs"]
mod tests;
