//! Fakes for the model and the browser, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::brain::LanguageModel;
use crate::error::{BrowserError, ModelError};
use crate::hands::PageHandle;

/// Replays queued replies in order; once drained, repeats `fallback`.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    fallback: Option<String>,
    stalls: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            fallback: None,
            stalls: false,
            prompts: Arc::default(),
        }
    }

    pub fn replies<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::new([])
        }
    }

    /// Records the prompt, then never answers.
    pub fn stalling() -> Self {
        Self {
            stalls: true,
            ..Self::new([])
        }
    }

    /// Handle on every prompt the model has received.
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.stalls {
            std::future::pending::<()>().await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => match &self.fallback {
                Some(reply) => Ok(reply.clone()),
                None => Err(ModelError::Network("script exhausted".to_string())),
            },
        }
    }
}

/// What happened to a [`FakePage`], readable after the page moved away.
#[derive(Debug, Default)]
pub struct PageLog {
    pub calls: Vec<String>,
    pub closed: usize,
    pub dropped: usize,
}

impl PageLog {
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// In-memory page. Selectors map to fragments; anything else is absent.
#[derive(Default)]
pub struct FakePage {
    pub fragments: HashMap<String, String>,
    /// Selectors whose lookup fails outright.
    pub broken: Vec<String>,
    pub full_html: String,
    /// Call prefixes that fail, e.g. `"click"`.
    pub failing: Vec<String>,
    pub fail_navigation: bool,
    pub log: Arc<Mutex<PageLog>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fragment(mut self, selector: &str, html: &str) -> Self {
        self.fragments.insert(selector.to_string(), html.to_string());
        self
    }

    pub fn with_full_html(mut self, html: &str) -> Self {
        self.full_html = html.to_string();
        self
    }

    pub fn with_broken(mut self, selector: &str) -> Self {
        self.broken.push(selector.to_string());
        self
    }

    pub fn failing_on(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_string());
        self
    }

    pub fn log(&self) -> Arc<Mutex<PageLog>> {
        self.log.clone()
    }

    fn record(&self, call: String) -> Result<(), BrowserError> {
        let fails = self.failing.iter().any(|p| call.starts_with(p.as_str()));
        self.log.lock().unwrap().calls.push(call.clone());
        if fails {
            Err(BrowserError::Element {
                selector: call,
                reason: "scripted failure".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn lookup(&self, selector: &str) -> Result<Option<&String>, BrowserError> {
        if self.broken.iter().any(|s| s == selector) {
            return Err(BrowserError::Script("detached frame".to_string()));
        }
        Ok(self.fragments.get(selector))
    }
}

impl Drop for FakePage {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.dropped += 1;
        }
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.record(format!("navigate {url}"))?;
        if self.fail_navigation {
            return Err(BrowserError::Navigation(format!("{url}: net::ERR_NAME_NOT_RESOLVED")));
        }
        Ok(())
    }

    async fn wait_for_load(&mut self) -> Result<(), BrowserError> {
        self.record("wait_for_load".to_string())
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BrowserError> {
        self.record(format!("count {selector}"))?;
        Ok(self.lookup(selector)?.map_or(0, |_| 1))
    }

    async fn inner_html(&mut self, selector: &str) -> Result<String, BrowserError> {
        self.record(format!("inner_html {selector}"))?;
        Ok(self.lookup(selector)?.cloned().unwrap_or_default())
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.record("content".to_string())?;
        Ok(self.full_html.clone())
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        self.record(format!("click {selector}"))
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), BrowserError> {
        self.record(format!("fill {selector} {text}"))
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> Result<(), BrowserError> {
        self.record(format!("select {selector} {value}"))
    }

    async fn press_key(&mut self, key: &str, selector: Option<&str>) -> Result<(), BrowserError> {
        match selector {
            Some(selector) => self.record(format!("press {key} on {selector}")),
            None => self.record(format!("press {key}")),
        }
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}
