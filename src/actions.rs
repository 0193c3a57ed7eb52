//! The action grammar the model speaks, and the checks a script passes before it runs.
//!
//! A script is either the terminal marker (`DONE <reason>`) or one to a few
//! lines, each a JSON object naming one browser primitive:
//!
//! ```text
//! {"action":"Fill","selector":"#twotabsearchtextbox","text":"rtx 4090"}
//! {"action":"PressKey","key":"Enter"}
//! ```
//!
//! The denylist in [`check`] is a coarse textual guard against naive misuse.
//! It is not a sandbox and adversarial output can get past it. The real
//! boundary is the closed [`Action`] set: anything that does not parse into
//! it is refused.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScriptRejection;

/// Substrings that never appear in a legitimate action script.
pub const DENYLIST: &[&str] = &["import ", "__", "os.", "subprocess", "eval(", "exec("];

pub const TERMINAL_MARKER: &str = "DONE";

/// One browser primitive, addressed to the session's single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Action {
    Navigate {
        url: String,
    },
    Click {
        selector: String,
    },
    Fill {
        selector: String,
        text: String,
    },
    SelectOption {
        selector: String,
        value: String,
    },
    PressKey {
        key: String,
        /// Element to focus first; the focused element otherwise.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    WaitForLoad,
}

impl Action {
    /// Actions after which the page may have been replaced.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Action::Navigate { .. }
                | Action::Click { .. }
                | Action::PressKey { .. }
                | Action::SelectOption { .. }
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Navigate { url } => write!(f, "Navigate {url}"),
            Action::Click { selector } => write!(f, "Click {selector}"),
            Action::Fill { selector, text } => write!(f, "Fill {selector} with {text:?}"),
            Action::SelectOption { selector, value } => {
                write!(f, "SelectOption {selector} = {value:?}")
            }
            Action::PressKey {
                key,
                selector: Some(selector),
            } => write!(f, "PressKey {key} on {selector}"),
            Action::PressKey { key, selector: None } => write!(f, "PressKey {key}"),
            Action::WaitForLoad => f.write_str("WaitForLoad"),
        }
    }
}

/// A validated line: the text the model wrote and what it means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub text: String,
    pub action: Action,
}

/// An accepted, non-terminal script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionScript {
    lines: Vec<ScriptLine>,
}

impl ActionScript {
    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.lines.iter().map(|line| &line.action)
    }

    /// Raw lines, as recorded in the history.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.text.as_str())
    }

    pub fn has_navigation(&self) -> bool {
        self.actions().any(Action::is_navigation)
    }
}

/// Removes a surrounding markdown code fence and outer whitespace. The
/// body is otherwise left as the model wrote it.
pub fn strip_code_fence(reply: &str) -> String {
    let trimmed = reply.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            // Drop the info string (```json) along with the fence.
            let rest = rest.split_once('\n').map_or("", |(_, body)| body);
            rest.trim_end().trim_end_matches("```").trim()
        }
        None => trimmed,
    };
    body.to_string()
}

/// Whether the reply begins with the terminal marker, in any letter case.
pub fn is_terminal(text: &str) -> bool {
    text.trim_start()
        .get(..TERMINAL_MARKER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(TERMINAL_MARKER))
}

/// Denylist check over the raw script text.
pub fn check(text: &str) -> Result<(), ScriptRejection> {
    match DENYLIST.iter().copied().find(|pattern| text.contains(pattern)) {
        Some(pattern) => Err(ScriptRejection::Denylisted { pattern }),
        None => Ok(()),
    }
}

/// Runs every acceptance check and parses the script.
pub fn parse_script(text: &str, max_actions: usize) -> Result<ActionScript, ScriptRejection> {
    check(text)?;

    let raw: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if raw.is_empty() {
        return Err(ScriptRejection::Empty);
    }
    if raw.len() > max_actions {
        return Err(ScriptRejection::TooManyActions {
            count: raw.len(),
            max: max_actions,
        });
    }

    let lines = raw
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str::<Action>(line)
                .map(|action| ScriptLine {
                    text: line.to_string(),
                    action,
                })
                .map_err(|e| ScriptRejection::Unparseable {
                    line: i + 1,
                    reason: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ActionScript { lines })
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
