use async_trait::async_trait;
use tracing::{info, warn};

use crate::chunk::DomChunk;
use crate::error::ModelError;
use crate::retry::{Backoff, RetryPolicy};
use crate::types::{ActionHistory, Goal};

/// A single model generation call, normalized to plain text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

const PROMPT_RULES: &str = r#"Return ONLY the next 1-4 action lines OR a single line 'DONE <reason>'.
Each action line is one JSON object on its own line. Available actions:
{"action":"Navigate","url":"https://..."}
{"action":"Click","selector":"css selector"}
{"action":"Fill","selector":"css selector","text":"text to type"}
{"action":"SelectOption","selector":"css selector","value":"option value or label"}
{"action":"PressKey","key":"Enter"}
{"action":"PressKey","key":"Enter","selector":"css selector"}
{"action":"WaitForLoad"}
Rules:
- Use only selectors that plausibly exist in the DOM above.
- Prefer selectors you have used before.
- After filling the search box, press Enter or click the search button.
- Output raw lines only: no backticks, no commentary."#;

/// Builds the prompt for one step.
pub fn build_prompt<'a>(
    goal: &Goal,
    history: &ActionHistory,
    chunks: impl IntoIterator<Item = DomChunk<'a>>,
) -> String {
    let dom = chunks
        .into_iter()
        .map(|chunk| chunk.to_string())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an iterative browser automation assistant.\n\
         Goal: {goal}\n\
         Previously executed actions (in order):\n{history}\n\n\
         You are currently on a page whose REDUCED HTML DOM (important sections only) \
         is provided below in chunks.\n\
         {dom}\n\n\
         {PROMPT_RULES}\n",
        history = history.for_prompt(),
    )
}

/// Talks to the model: one prompt in, plain text out, with retries.
pub struct Brain<M> {
    model: M,
    policy: RetryPolicy,
}

impl<M: LanguageModel> Brain<M> {
    pub fn new(model: M, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    /// Sends `prompt`, retrying failures per the policy.
    ///
    /// An empty string means the model produced nothing usable. Once the
    /// attempts run out the last failure comes back wrapped in
    /// [`ModelError::Exhausted`].
    pub async fn send(&self, prompt: &str) -> Result<String, ModelError> {
        let mut exponential = self.policy.exponential();
        let mut attempt = 1;
        loop {
            let err = match self.model.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };

            if attempt >= self.policy.attempts {
                warn!(attempt, "model call failed, giving up: {}", err);
                return Err(ModelError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let backoff = self.policy.backoff_for(&err, &mut exponential);
            match backoff {
                Backoff::ProviderHinted(delay) => {
                    info!(attempt, ?delay, "rate limited, waiting as the provider asked");
                }
                Backoff::Exponential(delay) => {
                    warn!(attempt, ?delay, "model call failed, backing off: {}", err);
                }
            }
            tokio::time::sleep(backoff.delay()).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
#[path = "brain_tests.rs"]
mod tests;
