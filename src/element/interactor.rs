//! Element interactor module
//!
//! Interaction helpers bound to one page. Every interaction waits for its own target to be
//! visible before acting.

use crate::element::finder::{ElementFinder, ElementState, DEFAULT_POLL_INTERVAL};
use crate::element::selector::ResolutionStrategy;
use crate::error::Result;
use crate::session::traits::{ElementRef, PageContext, ScreenshotOptions};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, instrument};

/// Timeouts used by the interaction helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeouts {
    /// Visible, attached and hidden waits
    pub wait: Duration,
    /// Boolean presence, visibility and enabled checks
    pub check: Duration,
    /// URL waits
    pub url: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitTimeouts {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(10_000),
            check: Duration::from_millis(5_000),
            url: Duration::from_millis(5_000),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Element interactor
///
/// Resolves, waits, then acts.
pub struct ElementInteractor {
    page: Arc<dyn PageContext>,
    finder: ElementFinder,
    timeouts: WaitTimeouts,
}

impl ElementInteractor {
    /// Create a new element interactor
    pub fn new(page: Arc<dyn PageContext>, timeouts: WaitTimeouts) -> Self {
        let finder = ElementFinder::new(Arc::clone(&page)).with_poll_interval(timeouts.poll_interval);
        Self {
            page,
            finder,
            timeouts,
        }
    }

    /// Use a custom resolution strategy
    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.finder = self.finder.with_strategy(strategy);
        self
    }

    pub fn page(&self) -> Arc<dyn PageContext> {
        Arc::clone(&self.page)
    }

    pub fn finder(&self) -> &ElementFinder {
        &self.finder
    }

    pub fn timeouts(&self) -> WaitTimeouts {
        self.timeouts
    }

    async fn visible(&self, selector: &str) -> Result<Arc<dyn ElementRef>> {
        let css = self
            .finder
            .wait_for(selector, ElementState::Visible, self.timeouts.wait)
            .await?;
        Ok(self.page.element(&css))
    }

    /// Whether `selector` reaches `state` within the check timeout
    async fn probe(&self, selector: &str, state: ElementState) -> Result<Option<Arc<dyn ElementRef>>> {
        match self.finder.wait_for(selector, state, self.timeouts.check).await {
            Ok(css) => Ok(Some(self.page.element(&css))),
            Err(e) if e.is_timeout() => {
                debug!("{} is not {}: {}", selector, state, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Click on the element
    #[instrument(skip(self))]
    pub async fn click(&self, selector: &str) -> Result<()> {
        self.visible(selector).await?.click(1).await
    }

    #[instrument(skip(self))]
    pub async fn double_click(&self, selector: &str) -> Result<()> {
        self.visible(selector).await?.click(2).await
    }

    #[instrument(skip(self))]
    pub async fn focus(&self, selector: &str) -> Result<()> {
        self.visible(selector).await?.focus().await
    }

    /// Replace the element value
    #[instrument(skip(self, value))]
    pub async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.visible(selector).await?.fill(value).await
    }

    /// Type text key by key
    #[instrument(skip(self, text))]
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.visible(selector).await?.type_text(text).await
    }

    /// Press a named key on the element
    #[instrument(skip(self))]
    pub async fn press(&self, selector: &str, key: &str) -> Result<()> {
        self.visible(selector).await?.press(key).await
    }

    #[instrument(skip(self))]
    pub async fn hover(&self, selector: &str) -> Result<()> {
        self.visible(selector).await?.hover().await
    }

    #[instrument(skip(self))]
    pub async fn check(&self, selector: &str) -> Result<()> {
        self.visible(selector).await?.set_checked(true).await
    }

    #[instrument(skip(self))]
    pub async fn uncheck(&self, selector: &str) -> Result<()> {
        self.visible(selector).await?.set_checked(false).await
    }

    /// Select an option by value or label
    #[instrument(skip(self))]
    pub async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        self.visible(selector).await?.select_option(value).await
    }

    /// Drag `source` onto the center of `target`
    ///
    /// Both ends must be visible.
    #[instrument(skip(self))]
    pub async fn drag_and_drop(&self, source: &str, target: &str) -> Result<()> {
        let source = self.visible(source).await?;
        let target = self.visible(target).await?;
        let (x, y) = target.center().await?;
        source.drag_to(x, y).await
    }

    /// Screenshot of one element, as PNG
    #[instrument(skip(self))]
    pub async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>> {
        self.visible(selector).await?.screenshot().await
    }

    /// Text of an attached element
    #[instrument(skip(self))]
    pub async fn text(&self, selector: &str) -> Result<String> {
        let css = self.wait_for_element(selector).await?;
        self.page.element(&css).text().await
    }

    /// Wait until the element is in the DOM
    #[instrument(skip(self))]
    pub async fn wait_for_element(&self, selector: &str) -> Result<String> {
        self.finder
            .wait_for(selector, ElementState::Attached, self.timeouts.wait)
            .await
    }

    #[instrument(skip(self))]
    pub async fn wait_for_visible(&self, selector: &str) -> Result<String> {
        self.finder
            .wait_for(selector, ElementState::Visible, self.timeouts.wait)
            .await
    }

    /// Wait until the element is detached or no longer rendered
    #[instrument(skip(self))]
    pub async fn wait_for_hidden(&self, selector: &str) -> Result<String> {
        self.finder
            .wait_for(selector, ElementState::Hidden, self.timeouts.wait)
            .await
    }

    /// Whether the element shows up in the DOM within the check timeout
    #[instrument(skip(self))]
    pub async fn is_present(&self, selector: &str) -> Result<bool> {
        Ok(self.probe(selector, ElementState::Attached).await?.is_some())
    }

    #[instrument(skip(self))]
    pub async fn is_visible(&self, selector: &str) -> Result<bool> {
        Ok(self.probe(selector, ElementState::Visible).await?.is_some())
    }

    /// Whether the element becomes visible and is enabled
    #[instrument(skip(self))]
    pub async fn is_enabled(&self, selector: &str) -> Result<bool> {
        match self.probe(selector, ElementState::Visible).await? {
            Some(element) => Ok(element.state().await?.enabled),
            None => Ok(false),
        }
    }

    #[instrument(skip(self))]
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.page.navigate(url).await
    }

    pub async fn current_url(&self) -> Result<String> {
        self.page.url().await
    }

    /// Wait until the page URL matches `pattern`, by default within 5 seconds
    pub async fn wait_for_url(&self, pattern: &str, timeout: Option<Duration>) -> Result<String> {
        self.finder
            .wait_for_url(pattern, timeout.unwrap_or(self.timeouts.url))
            .await
    }

    /// Screenshot of the viewport, as PNG
    pub async fn screenshot_page(&self) -> Result<Vec<u8>> {
        self.page.screenshot(ScreenshotOptions::default()).await
    }
}
