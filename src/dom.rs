use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::AgentConfig;
use crate::error::BrowserError;
use crate::hands::PageHandle;
use crate::types::PageSnapshot;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("valid pattern"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style>").expect("valid pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid pattern"));

/// Produces bounded snapshots of the parts of a page worth showing the model.
///
/// Selectors are tried in order; each one present contributes its first
/// match's inner markup under a `<!-- selector -->` label. When none match,
/// the whole document is used with script and style blocks removed and
/// whitespace collapsed. Either way the result is cut to `max_chars`.
#[derive(Debug, Clone)]
pub struct PageStateExtractor {
    selectors: Vec<String>,
    max_chars: usize,
}

impl PageStateExtractor {
    pub fn new(selectors: Vec<String>, max_chars: usize) -> Self {
        Self {
            selectors,
            max_chars,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.snapshot_selectors.clone(), config.snapshot_max_chars)
    }

    /// Takes a snapshot of the page as it is now.
    ///
    /// A selector that errors counts as absent. Only the full-document
    /// fallback can fail the extraction.
    pub async fn extract<P: PageHandle + ?Sized>(
        &self,
        page: &mut P,
    ) -> Result<PageSnapshot, BrowserError> {
        let mut parts = Vec::new();
        for selector in &self.selectors {
            match capture(page, selector).await {
                Ok(Some(html)) => parts.push(format!("<!-- {selector} -->\n{html}")),
                Ok(None) => {}
                Err(e) => debug!(selector = %selector, "selector lookup failed: {}", e),
            }
        }

        let text = if parts.is_empty() {
            debug!("no snapshot selector matched, using full document");
            reduce_document(&page.content().await?)
        } else {
            parts.join("\n")
        };

        Ok(PageSnapshot::new(truncate_chars(&text, self.max_chars)))
    }
}

async fn capture<P: PageHandle + ?Sized>(
    page: &mut P,
    selector: &str,
) -> Result<Option<String>, BrowserError> {
    if page.count(selector).await? == 0 {
        return Ok(None);
    }
    page.inner_html(selector).await.map(Some)
}

/// Strips script and style blocks and collapses whitespace runs.
pub fn reduce_document(html: &str) -> String {
    let html = SCRIPT_BLOCK.replace_all(html, "");
    let html = STYLE_BLOCK.replace_all(&html, "");
    WHITESPACE.replace_all(&html, " ").into_owned()
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
#[path = "dom_tests.rs"]
mod tests;
