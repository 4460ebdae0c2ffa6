//! Element finder module
//!
//! Waits for elements to reach a DOM state by polling the page on the tokio clock.

use crate::element::selector::{ResolutionStrategy, Selector};
use crate::error::{Error, Result};
use crate::session::traits::{ElementSnapshot, PageContext};
use std::fmt;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Default delay between two probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// DOM state a wait can require
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// Attached and rendered
    Visible,
    /// In the DOM, rendered or not
    Attached,
    /// Detached or not rendered
    Hidden,
}

impl ElementState {
    pub fn is_satisfied(&self, snapshot: &ElementSnapshot) -> bool {
        match self {
            ElementState::Visible => snapshot.attached && snapshot.visible,
            ElementState::Attached => snapshot.attached,
            ElementState::Hidden => !snapshot.attached || !snapshot.visible,
        }
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementState::Visible => "visible",
            ElementState::Attached => "attached",
            ElementState::Hidden => "hidden",
        })
    }
}

/// Element finder
///
/// Resolves prefixed selectors through a [`ResolutionStrategy`] and waits on each candidate
/// in turn.
pub struct ElementFinder {
    page: Arc<dyn PageContext>,
    strategy: ResolutionStrategy,
    poll_interval: Duration,
}

impl ElementFinder {
    /// Create a new element finder
    pub fn new(page: Arc<dyn PageContext>) -> Self {
        Self {
            page,
            strategy: ResolutionStrategy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Wait until `selector` reaches `state` and return the CSS selector that matched
    ///
    /// Each candidate of the strategy gets the full `timeout`. Only a timeout moves on to
    /// the next candidate; any other error is returned as is.
    #[instrument(skip(self))]
    pub async fn wait_for(
        &self,
        selector: &str,
        state: ElementState,
        timeout: Duration,
    ) -> Result<String> {
        let parsed = Selector::parse(selector);
        let candidates = self.strategy.candidates(&parsed);

        for (attempt, candidate) in candidates.iter().enumerate() {
            if attempt > 0 {
                debug!("Retrying '{}' with fallback candidate {}", selector, candidate);
            }

            match self.wait_for_css(candidate, state, timeout).await {
                Ok(()) => return Ok(candidate.clone()),
                Err(e) if e.is_timeout() => continue,
                Err(e) => return Err(e),
            }
        }

        Err(Error::timeout(format!(
            "'{}' did not become {} within {}ms (tried {})",
            selector,
            state,
            timeout.as_millis(),
            candidates.join(", ")
        )))
    }

    /// Poll one CSS selector until it reaches `state`
    ///
    /// A selector the page rejects counts as matching nothing, so it ends in a timeout.
    pub async fn wait_for_css(&self, css: &str, state: ElementState, timeout: Duration) -> Result<()> {
        let element = self.page.element(css);
        let deadline = Instant::now() + timeout;

        loop {
            match element.state().await {
                Ok(snapshot) if state.is_satisfied(&snapshot) => return Ok(()),
                Ok(_) => {}
                Err(Error::ScriptExecutionFailed(msg)) => {
                    debug!("Probe of {} failed: {}", css, msg);
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::timeout(format!(
                    "{} not {} within {}ms",
                    css,
                    state,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Wait until the page URL matches `pattern`
    ///
    /// See [`url_matches`] for the pattern syntax.
    #[instrument(skip(self))]
    pub async fn wait_for_url(&self, pattern: &str, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;
        let mut last_url = String::new();

        loop {
            last_url = self.page.url().await.unwrap_or(last_url);
            if url_matches(pattern, &last_url) {
                return Ok(last_url);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::timeout(format!(
                    "URL did not match '{}' within {}ms (last: {})",
                    pattern,
                    timeout.as_millis(),
                    last_url
                )));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

/// Whether `url` matches `pattern`
///
/// Without `*` the comparison is exact, ignoring one trailing slash on either side.
/// Each `*` matches any run of characters.
pub fn url_matches(pattern: &str, url: &str) -> bool {
    if !pattern.contains('*') {
        return pattern.trim_end_matches('/') == url.trim_end_matches('/');
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return false,
    };
    let Some(mut remaining) = url.strip_prefix(first) else {
        return false;
    };

    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return remaining.is_empty(),
    };

    for part in middle {
        match remaining.find(part) {
            Some(index) => remaining = &remaining[index + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}
