//! The browser side: the page capabilities the agent needs, a Chrome-backed
//! implementation, and the executor that runs accepted scripts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info, warn};

use crate::actions::{Action, ActionScript};
use crate::config::BrowserConfig;
use crate::error::{BrowserError, ExecutionError};

/// One live page, owned by one session.
#[async_trait]
pub trait PageHandle: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;
    async fn wait_for_load(&mut self) -> Result<(), BrowserError>;
    /// Number of elements matching `selector`.
    async fn count(&mut self, selector: &str) -> Result<usize, BrowserError>;
    /// Inner markup of the first match.
    async fn inner_html(&mut self, selector: &str) -> Result<String, BrowserError>;
    /// Markup of the whole document.
    async fn content(&mut self) -> Result<String, BrowserError>;
    async fn click(&mut self, selector: &str) -> Result<(), BrowserError>;
    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), BrowserError>;
    async fn select_option(&mut self, selector: &str, value: &str) -> Result<(), BrowserError>;
    async fn press_key(&mut self, key: &str, selector: Option<&str>) -> Result<(), BrowserError>;
    /// Releases the browser. Called once, on every exit path.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Runs the script's actions in order as one step. The first failure aborts the rest.
pub async fn execute<P: PageHandle + ?Sized>(
    page: &mut P,
    script: &ActionScript,
) -> Result<(), ExecutionError> {
    for (i, action) in script.actions().enumerate() {
        debug!(index = i + 1, %action, "executing action");
        run_action(page, action)
            .await
            .map_err(|source| ExecutionError {
                index: i + 1,
                action: action.to_string(),
                source,
            })?;
    }
    Ok(())
}

async fn run_action<P: PageHandle + ?Sized>(page: &mut P, action: &Action) -> Result<(), BrowserError> {
    match action {
        Action::Navigate { url } => page.navigate(url).await,
        Action::Click { selector } => page.click(selector).await,
        Action::Fill { selector, text } => page.fill(selector, text).await,
        Action::SelectOption { selector, value } => page.select_option(selector, value).await,
        Action::PressKey { key, selector } => page.press_key(key, selector.as_deref()).await,
        Action::WaitForLoad => page.wait_for_load().await,
    }
}

/// Lets a possibly reloaded page come to rest before it is observed again.
///
/// Load-wait failures are not errors here; the next snapshot shows whatever is there.
pub async fn settle<P: PageHandle + ?Sized>(page: &mut P, delay: Duration) {
    if let Err(e) = page.wait_for_load().await {
        debug!("settle: wait for load failed: {}", e);
    }
    tokio::time::sleep(delay).await;
}

/// A Chrome tab driven over CDP.
///
/// `headless_chrome` is blocking, so every call runs on the blocking pool.
/// Dropping the page drops the `Browser`, which kills the Chrome process;
/// that covers sessions whose future is cancelled before `close` runs.
pub struct ChromePage {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromePage {
    pub async fn launch(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Self::launch_blocking(&config))
            .await
            .map_err(|e| BrowserError::Task(format!("browser launch panicked: {e}")))?
    }

    fn launch_blocking(config: &BrowserConfig) -> Result<Self, BrowserError> {
        info!(headless = config.headless, "launching Chrome");
        let options = LaunchOptions {
            headless: config.headless,
            sandbox: config.sandbox,
            path: config.chrome_path.clone(),
            args: vec![
                std::ffi::OsStr::new("--no-first-run"),
                std::ffi::OsStr::new("--no-default-browser-check"),
                std::ffi::OsStr::new("--disable-blink-features=AutomationControlled"),
                std::ffi::OsStr::new("--disable-infobars"),
            ],
            idle_browser_timeout: config.idle_timeout,
            ..Default::default()
        };

        let browser = Browser::new(options).map_err(|e| BrowserError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        info!("Chrome ready");

        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }

    fn with_tab<T, F>(&self, f: F) -> impl Future<Output = Result<T, BrowserError>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
    {
        on_blocking_pool(self.tab.clone(), f)
    }
}

async fn on_blocking_pool<T, F>(tab: Arc<Tab>, f: F) -> Result<T, BrowserError>
where
    T: Send + 'static,
    F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(tab.as_ref()))
        .await
        .map_err(|e| BrowserError::Task(e.to_string()))?
}

fn evaluate(tab: &Tab, expression: &str) -> Result<serde_json::Value, BrowserError> {
    let result = tab
        .evaluate(expression, false)
        .map_err(|e| BrowserError::Script(e.to_string()))?;
    Ok(result.value.unwrap_or(serde_json::Value::Null))
}

/// Selector as a JS string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn element_error(selector: &str, e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Element {
        selector: selector.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl PageHandle for ChromePage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.navigate_to(&url)
                .map_err(|e| BrowserError::Navigation(format!("{url}: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn wait_for_load(&mut self) -> Result<(), BrowserError> {
        self.with_tab(|tab| {
            tab.wait_until_navigated()
                .map_err(|e| BrowserError::Navigation(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BrowserError> {
        let expression = format!("document.querySelectorAll({}).length", js_string(selector));
        self.with_tab(move |tab| {
            let value = evaluate(tab, &expression)?;
            Ok(value.as_u64().unwrap_or(0) as usize)
        })
        .await
    }

    async fn inner_html(&mut self, selector: &str) -> Result<String, BrowserError> {
        let expression = format!(
            "(document.querySelector({}) || {{}}).innerHTML || ''",
            js_string(selector)
        );
        self.with_tab(move |tab| {
            let value = evaluate(tab, &expression)?;
            Ok(value.as_str().map(String::from).unwrap_or_default())
        })
        .await
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.with_tab(|tab| tab.get_content().map_err(|e| BrowserError::Script(e.to_string())))
            .await
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| element_error(&selector, e))?;
            element.click().map_err(|e| element_error(&selector, e))?;
            Ok(())
        })
        .await
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();
        let text = text.to_string();
        self.with_tab(move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| element_error(&selector, e))?;
            element.click().map_err(|e| element_error(&selector, e))?;
            evaluate(
                tab,
                &format!("document.querySelector({}).value = ''", js_string(&selector)),
            )?;
            tab.type_str(&text).map_err(|e| element_error(&selector, e))?;
            Ok(())
        })
        .await
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let expression = format!(
            r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return 'missing';
  const opt = [...el.options].find(o => o.value === {val} || o.text.trim() === {val});
  if (!opt) return 'no option';
  el.value = opt.value;
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return 'ok';
}})()"#,
            sel = js_string(selector),
            val = js_string(value),
        );
        let selector = selector.to_string();
        self.with_tab(move |tab| {
            let outcome = evaluate(tab, &expression)?;
            match outcome.as_str() {
                Some("ok") => Ok(()),
                Some(reason) => Err(element_error(&selector, reason)),
                None => Err(element_error(&selector, "select returned nothing")),
            }
        })
        .await
    }

    async fn press_key(&mut self, key: &str, selector: Option<&str>) -> Result<(), BrowserError> {
        let key = key.to_string();
        let selector = selector.map(String::from);
        self.with_tab(move |tab| {
            if let Some(selector) = &selector {
                let element = tab
                    .find_element(selector)
                    .map_err(|e| element_error(selector, e))?;
                element.focus().map_err(|e| element_error(selector, e))?;
            }
            tab.press_key(&key)
                .map_err(|e| BrowserError::Script(format!("press {key}: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = tab.close(true) {
                warn!("closing tab failed: {}", e);
            }
            drop(browser);
        })
        .await
        .map_err(|e| BrowserError::Task(e.to_string()))?;
        info!("Chrome closed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "hands_tests.rs"]
mod tests;
