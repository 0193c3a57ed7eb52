use std::fmt;

use serde::{Deserialize, Serialize};

/// The natural-language objective of one session. Set once, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal(String);

impl Goal {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one session's events on a shared channel.
///
/// Minted from 128 random bits, so a subscriber cannot guess another
/// session's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn random() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Action lines that were accepted and executed, in order.
///
/// Append-only. Only used as prompt context, never replayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionHistory {
    lines: Vec<String>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Newline-joined transcript returned to the caller.
    pub fn transcript(&self) -> String {
        self.lines.join("\n")
    }

    /// History as it is shown to the model; `(none)` when empty.
    pub fn for_prompt(&self) -> String {
        if self.lines.is_empty() {
            "(none)".to_string()
        } else {
            self.transcript()
        }
    }
}

/// Bounded text capture of the page, recomputed after every step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub text: String,
}

impl PageSnapshot {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Continue(PageSnapshot),
    Done(String),
    EmptyReply,
    Rejected(String),
    ExecutionError(String),
    ModelError(String),
    BrowserError(String),
}

/// Terminal status of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SessionStatus {
    /// The model replied with the terminal marker; holds the full reply.
    Done(String),
    EmptyOutput,
    ModelError { step: usize, detail: String },
    Rejected(String),
    ExecutionError { step: usize, detail: String },
    MaxStepsReached,
    BrowserError(String),
}

impl SessionStatus {
    /// True for the outcomes that are faults rather than completions.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SessionStatus::ModelError { .. }
                | SessionStatus::Rejected(_)
                | SessionStatus::ExecutionError { .. }
                | SessionStatus::BrowserError(_)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Done(reply) => f.write_str(reply),
            SessionStatus::EmptyOutput => f.write_str("empty model output"),
            SessionStatus::ModelError { step, detail } => {
                write!(f, "model error at step {step}: {detail}")
            }
            SessionStatus::Rejected(reason) => {
                write!(f, "rejected unsafe generated code: {reason}")
            }
            SessionStatus::ExecutionError { step, detail } => {
                write!(f, "execution error at step {step}: {detail}")
            }
            SessionStatus::MaxStepsReached => f.write_str("max steps reached"),
            SessionStatus::BrowserError(detail) => write!(f, "browser error: {detail}"),
        }
    }
}

/// What a finished session hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub status: SessionStatus,
    pub history: ActionHistory,
}

impl SessionReport {
    pub fn status_text(&self) -> String {
        self.status.to_string()
    }

    pub fn transcript(&self) -> String {
        self.history.transcript()
    }
}

/// Progress events published while a session runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    SessionStarted { goal: String },
    Thinking { step: usize },
    Step { number: usize, description: String },
    StepError { message: String },
    Finished { status: String, transcript: String },
}

impl AgentEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            AgentEvent::SessionStarted { .. } => "session_started",
            AgentEvent::Thinking { .. } => "thinking",
            AgentEvent::Step { .. } => "step",
            AgentEvent::StepError { .. } => "step_error",
            AgentEvent::Finished { .. } => "finished",
        }
    }
}

/// An [`AgentEvent`] stamped with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEvent {
    pub session: SessionId,
    #[serde(flatten)]
    pub event: AgentEvent,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        self.event.name()
    }

    pub fn belongs_to(&self, session: &SessionId) -> bool {
        &self.session == session
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
