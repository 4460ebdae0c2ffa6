//! Session management traits
//!
//! Abstract interfaces for the isolated browser context, its page and the elements on it.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

pub use crate::cdp::traits::{ClipRect, EvaluationResult, ScreenshotFormat};

/// Browser engine driven by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserEngine {
    /// Parse an engine hint, ignoring case and surrounding whitespace
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "chromium" => Some(Self::Chromium),
            "firefox" => Some(Self::Firefox),
            "webkit" => Some(Self::Webkit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser options for launching an engine
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Engine to launch
    pub engine: BrowserEngine,
    /// Headless mode (no GUI)
    pub headless: bool,
    /// Viewport width applied to the session page
    pub viewport_width: u32,
    /// Viewport height applied to the session page
    pub viewport_height: u32,
    /// Engine executable path
    pub executable_path: Option<String>,
    /// DevTools endpoint of a running engine (e.g., "http://localhost:9222")
    pub cdp_endpoint: Option<String>,
    /// Additional arguments passed to the engine
    pub args: Vec<String>,
    /// How long the engine gets to announce its DevTools endpoint, in milliseconds
    pub launch_timeout_ms: u64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            engine: BrowserEngine::Chromium,
            headless: true,
            viewport_width: 1366,
            viewport_height: 768,
            executable_path: None,
            cdp_endpoint: None,
            args: vec![],
            launch_timeout_ms: 30_000,
        }
    }
}

/// Page options for creating a new page
#[derive(Debug, Clone)]
pub struct PageOptions {
    /// Initial URL
    pub default_url: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            default_url: "about:blank".to_string(),
        }
    }
}

/// Screenshot options
#[derive(Debug, Clone, Copy)]
pub struct ScreenshotOptions {
    pub format: ScreenshotFormat,
    /// Region to capture; the viewport when absent
    pub clip: Option<ClipRect>,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            format: ScreenshotFormat::Png,
            clip: None,
        }
    }
}

/// Point-in-time state of the first element matching a selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ElementSnapshot {
    /// An element matches the selector
    #[serde(default)]
    pub attached: bool,
    /// Rendered with a non-empty box and not hidden by style
    #[serde(default)]
    pub visible: bool,
    /// Not disabled
    #[serde(default)]
    pub enabled: bool,
    /// Checked (checkboxes and radios)
    #[serde(default)]
    pub checked: bool,
}

/// Element bounding box in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl From<BoundingBox> for ClipRect {
    fn from(bbox: BoundingBox) -> Self {
        ClipRect {
            x: bbox.x,
            y: bbox.y,
            width: bbox.width,
            height: bbox.height,
        }
    }
}

/// Browser context trait
///
/// An isolated browsing context inside an engine instance.
#[async_trait]
pub trait BrowserContext: Send + Sync + std::fmt::Debug {
    /// Context ID
    fn id(&self) -> &str;

    /// Create a new page in this context
    async fn create_page(&self, options: PageOptions) -> Result<Arc<dyn PageContext>, crate::Error>;

    /// Pages created in this context
    async fn pages(&self) -> Result<Vec<Arc<dyn PageContext>>, crate::Error>;

    /// Dispose the context; closing an already closed context succeeds
    async fn close(&self) -> Result<(), crate::Error>;

    /// Check if the context is still open
    fn is_active(&self) -> bool;
}

/// Page context trait
///
/// A page inside a browser context.
#[async_trait]
pub trait PageContext: Send + Sync + std::fmt::Debug {
    /// Page ID
    fn id(&self) -> &str;

    /// ID of the owning context
    fn context_id(&self) -> &str;

    /// Navigate to URL
    async fn navigate(&self, url: &str) -> Result<(), crate::Error>;

    /// Current URL
    async fn url(&self) -> Result<String, crate::Error>;

    /// Evaluate JavaScript
    async fn evaluate(&self, script: &str) -> Result<EvaluationResult, crate::Error>;

    /// Capture screenshot
    async fn screenshot(&self, options: ScreenshotOptions) -> Result<Vec<u8>, crate::Error>;

    /// Set viewport size
    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), crate::Error>;

    /// Close the page; closing an already closed page succeeds
    async fn close(&self) -> Result<(), crate::Error>;

    /// Check if page is active
    fn is_active(&self) -> bool;

    /// Handle to the element(s) matching a CSS selector
    ///
    /// The handle is lazy: nothing is looked up until one of its methods runs.
    fn element(&self, selector: &str) -> Arc<dyn ElementRef>;
}

/// Element reference trait
///
/// Bound to a CSS selector; every call acts on the first matching element at that moment.
#[async_trait]
pub trait ElementRef: Send + Sync {
    /// CSS selector this handle is bound to
    fn selector(&self) -> &str;

    /// Current state; an invalid selector fails with `ScriptExecutionFailed`
    async fn state(&self) -> Result<ElementSnapshot, crate::Error>;

    /// Click the element center `click_count` times in one gesture
    async fn click(&self, click_count: u32) -> Result<(), crate::Error>;

    /// Focus element
    async fn focus(&self) -> Result<(), crate::Error>;

    /// Replace the element's value
    async fn fill(&self, value: &str) -> Result<(), crate::Error>;

    /// Type text key by key at the current caret
    async fn type_text(&self, text: &str) -> Result<(), crate::Error>;

    /// Press a named key (e.g., "Enter", "Tab") on the element
    async fn press(&self, key: &str) -> Result<(), crate::Error>;

    /// Move the pointer over the element
    async fn hover(&self) -> Result<(), crate::Error>;

    /// Set a checkbox or radio to `checked`
    async fn set_checked(&self, checked: bool) -> Result<(), crate::Error>;

    /// Select an option of a `<select>` by value or label
    async fn select_option(&self, value: &str) -> Result<(), crate::Error>;

    /// Bounding box of the element
    async fn bounding_box(&self) -> Result<BoundingBox, crate::Error>;

    /// Drag the element to a page point
    async fn drag_to(&self, x: f64, y: f64) -> Result<(), crate::Error>;

    /// Screenshot of the element region
    async fn screenshot(&self) -> Result<Vec<u8>, crate::Error>;

    /// Visible text of the element
    async fn text(&self) -> Result<String, crate::Error>;

    /// Center of the element's bounding box
    async fn center(&self) -> Result<(f64, f64), crate::Error> {
        Ok(self.bounding_box().await?.center())
    }
}
