//! Mock page implementation for testing
//!
//! `MockPage` is a tiny DOM fixture: elements are registered under the exact CSS selector
//! that reaches them, can appear or vanish after a delay (measured on the tokio clock, so
//! paused-time tests work), and clicks can trigger navigations when the form is filled in
//! correctly. Every action is logged so tests can assert on the sequence.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use super::traits::{
    BoundingBox, ElementRef, ElementSnapshot, EvaluationResult, PageContext, ScreenshotOptions,
};
use crate::Error;

/// 8-byte PNG signature returned for screenshots
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// One element of the fixture
#[derive(Debug, Clone)]
pub struct MockNode {
    pub visible: bool,
    pub enabled: bool,
    pub checked: bool,
    pub value: String,
    pub text: String,
    pub options: Vec<String>,
    pub bbox: BoundingBox,
    appear_after: Option<Duration>,
    vanish_after: Option<Duration>,
}

impl MockNode {
    /// A rendered, enabled element
    pub fn visible() -> Self {
        Self {
            visible: true,
            enabled: true,
            checked: false,
            value: String::new(),
            text: String::new(),
            options: Vec::new(),
            bbox: BoundingBox {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 30.0,
            },
            appear_after: None,
            vanish_after: None,
        }
    }

    /// Attached but not rendered
    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::visible()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn with_bbox(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bbox = BoundingBox { x, y, width, height };
        self
    }

    /// Only attached once `delay` has passed since registration
    pub fn appearing_after(mut self, delay: Duration) -> Self {
        self.appear_after = Some(delay);
        self
    }

    /// Detached once `delay` has passed since registration
    pub fn vanishing_after(mut self, delay: Duration) -> Self {
        self.vanish_after = Some(delay);
        self
    }
}

#[derive(Debug)]
struct NodeEntry {
    node: MockNode,
    appears_at: Option<Instant>,
    vanishes_at: Option<Instant>,
}

impl NodeEntry {
    fn new(node: MockNode) -> Self {
        let now = Instant::now();
        Self {
            appears_at: node.appear_after.map(|d| now + d),
            vanishes_at: node.vanish_after.map(|d| now + d),
            node,
        }
    }

    fn is_attached(&self, now: Instant) -> bool {
        self.appears_at.map_or(true, |at| now >= at) && self.vanishes_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug)]
struct NavigateRule {
    selector: String,
    url: String,
    required: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct MockDom {
    url: String,
    nodes: HashMap<String, NodeEntry>,
    actions: Vec<String>,
    probes: HashMap<String, usize>,
    rules: Vec<NavigateRule>,
    viewport: Option<(u32, u32)>,
    fail_close: bool,
    fail_viewport: bool,
}

impl MockDom {
    /// Crude syntax check standing in for the browser's selector parser
    fn is_invalid(selector: &str) -> bool {
        let trimmed = selector.trim();
        trimmed.is_empty()
            || trimmed.contains("##")
            || trimmed.starts_with(['>', '+', '~', ')', ']', ','])
            || trimmed.matches('[').count() != trimmed.matches(']').count()
    }

    fn node_mut(&mut self, selector: &str) -> Result<&mut MockNode, Error> {
        let now = Instant::now();
        match self.nodes.get_mut(selector) {
            Some(entry) if entry.is_attached(now) => Ok(&mut entry.node),
            _ => Err(Error::script_execution_failed(format!(
                "No element matches '{}'",
                selector
            ))),
        }
    }

    fn value_of(&self, selector: &str) -> Option<&str> {
        self.nodes.get(selector).map(|entry| entry.node.value.as_str())
    }

    fn apply_click_rules(&mut self, selector: &str) {
        let target = self
            .rules
            .iter()
            .filter(|rule| rule.selector == selector)
            .find(|rule| {
                rule.required
                    .iter()
                    .all(|(field, value)| self.value_of(field) == Some(value.as_str()))
            })
            .map(|rule| rule.url.clone());

        if let Some(url) = target {
            self.actions.push(format!("navigate {}", url));
            self.url = url;
        }
    }
}

/// Mock page context backed by a DOM fixture
#[derive(Debug)]
pub struct MockPage {
    id: String,
    context_id: String,
    dom: Arc<Mutex<MockDom>>,
    is_active: AtomicBool,
}

impl MockPage {
    /// Create a page showing `url` with no elements
    pub fn new(url: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            context_id: "mock-context".to_string(),
            dom: Arc::new(Mutex::new(MockDom {
                url: url.to_string(),
                ..MockDom::default()
            })),
            is_active: AtomicBool::new(true),
        }
    }

    fn dom(&self) -> MutexGuard<'_, MockDom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an element under `selector`
    pub fn with_element(self, selector: &str, node: MockNode) -> Self {
        self.add_element(selector, node);
        self
    }

    pub fn add_element(&self, selector: &str, node: MockNode) {
        self.dom()
            .nodes
            .insert(selector.to_string(), NodeEntry::new(node));
    }

    pub fn remove_element(&self, selector: &str) {
        self.dom().nodes.remove(selector);
    }

    /// Clicking `selector` navigates to `url` when every `(selector, value)` pair matches
    pub fn on_click_navigate(self, selector: &str, url: &str, required: &[(&str, &str)]) -> Self {
        self.dom().rules.push(NavigateRule {
            selector: selector.to_string(),
            url: url.to_string(),
            required: required
                .iter()
                .map(|(field, value)| (field.to_string(), value.to_string()))
                .collect(),
        });
        self
    }

    /// Make `close` fail (after deactivating the page)
    pub fn failing_close(self) -> Self {
        self.dom().fail_close = true;
        self
    }

    /// Make `set_viewport` fail
    pub fn failing_viewport(self) -> Self {
        self.dom().fail_viewport = true;
        self
    }

    /// Actions performed so far, e.g. `"fill #user-name standard_user"`
    pub fn actions(&self) -> Vec<String> {
        self.dom().actions.clone()
    }

    /// Number of state probes made against `selector`
    pub fn probe_count(&self, selector: &str) -> usize {
        self.dom().probes.get(selector).copied().unwrap_or(0)
    }

    /// Selectors probed at least once
    pub fn probed_selectors(&self) -> Vec<String> {
        let mut selectors: Vec<String> = self.dom().probes.keys().cloned().collect();
        selectors.sort();
        selectors
    }

    /// Current value of the element registered under `selector`
    pub fn value(&self, selector: &str) -> Option<String> {
        self.dom().value_of(selector).map(String::from)
    }

    pub fn is_checked(&self, selector: &str) -> Option<bool> {
        self.dom().nodes.get(selector).map(|entry| entry.node.checked)
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.dom().viewport
    }
}

#[async_trait]
impl PageContext for MockPage {
    fn id(&self) -> &str {
        &self.id
    }

    fn context_id(&self) -> &str {
        &self.context_id
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        let mut dom = self.dom();
        dom.actions.push(format!("navigate {}", url));
        dom.url = url.to_string();
        Ok(())
    }

    async fn url(&self) -> Result<String, Error> {
        Ok(self.dom().url.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<EvaluationResult, Error> {
        self.dom().actions.push(format!("evaluate {}", script));
        Ok(EvaluationResult::Null)
    }

    async fn screenshot(&self, _options: ScreenshotOptions) -> Result<Vec<u8>, Error> {
        self.dom().actions.push("screenshot page".to_string());
        Ok(PNG_SIGNATURE.to_vec())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), Error> {
        let mut dom = self.dom();
        if dom.fail_viewport {
            return Err(Error::cdp("Emulation.setDeviceMetricsOverride: mock failure"));
        }
        dom.viewport = Some((width, height));
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let mut dom = self.dom();
        dom.actions.push("close".to_string());
        if dom.fail_close {
            return Err(Error::cdp("Page.close: mock failure"));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    fn element(&self, selector: &str) -> Arc<dyn ElementRef> {
        Arc::new(MockElement {
            selector: selector.to_string(),
            dom: Arc::clone(&self.dom),
        })
    }
}

/// Element handle into a `MockPage`
#[derive(Debug)]
pub struct MockElement {
    selector: String,
    dom: Arc<Mutex<MockDom>>,
}

impl MockElement {
    fn dom(&self) -> MutexGuard<'_, MockDom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `action` on the attached node and log `entry`
    fn act<R>(&self, entry: String, action: impl FnOnce(&mut MockNode) -> Result<R, Error>) -> Result<R, Error> {
        let mut dom = self.dom();
        let result = action(dom.node_mut(&self.selector)?)?;
        dom.actions.push(entry);
        Ok(result)
    }
}

#[async_trait]
impl ElementRef for MockElement {
    fn selector(&self) -> &str {
        &self.selector
    }

    async fn state(&self) -> Result<ElementSnapshot, Error> {
        if MockDom::is_invalid(&self.selector) {
            return Err(Error::script_execution_failed(format!(
                "SyntaxError: '{}' is not a valid selector",
                self.selector
            )));
        }

        let now = Instant::now();
        let mut dom = self.dom();
        *dom.probes.entry(self.selector.clone()).or_insert(0) += 1;

        let snapshot = match dom.nodes.get(&self.selector) {
            Some(entry) if entry.is_attached(now) => ElementSnapshot {
                attached: true,
                visible: entry.node.visible,
                enabled: entry.node.enabled,
                checked: entry.node.checked,
            },
            _ => ElementSnapshot::default(),
        };
        Ok(snapshot)
    }

    async fn click(&self, click_count: u32) -> Result<(), Error> {
        let verb = if click_count >= 2 { "dblclick" } else { "click" };
        self.act(format!("{} {}", verb, self.selector), |_| Ok(()))?;
        self.dom().apply_click_rules(&self.selector);
        Ok(())
    }

    async fn focus(&self) -> Result<(), Error> {
        self.act(format!("focus {}", self.selector), |_| Ok(()))
    }

    async fn fill(&self, value: &str) -> Result<(), Error> {
        self.act(format!("fill {} {}", self.selector, value), |node| {
            node.value = value.to_string();
            Ok(())
        })
    }

    async fn type_text(&self, text: &str) -> Result<(), Error> {
        self.act(format!("type {} {}", self.selector, text), |node| {
            node.value.push_str(text);
            Ok(())
        })
    }

    async fn press(&self, key: &str) -> Result<(), Error> {
        self.act(format!("press {} {}", self.selector, key), |_| Ok(()))
    }

    async fn hover(&self) -> Result<(), Error> {
        self.act(format!("hover {}", self.selector), |_| Ok(()))
    }

    async fn set_checked(&self, checked: bool) -> Result<(), Error> {
        let verb = if checked { "check" } else { "uncheck" };
        self.act(format!("{} {}", verb, self.selector), |node| {
            node.checked = checked;
            Ok(())
        })
    }

    async fn select_option(&self, value: &str) -> Result<(), Error> {
        let selector = self.selector.clone();
        self.act(format!("select {} {}", self.selector, value), |node| {
            if !node.options.iter().any(|o| o == value) {
                return Err(Error::script_execution_failed(format!(
                    "'{}' has no option '{}'",
                    selector, value
                )));
            }
            node.value = value.to_string();
            Ok(())
        })
    }

    async fn bounding_box(&self) -> Result<BoundingBox, Error> {
        let mut dom = self.dom();
        let bbox = dom.node_mut(&self.selector)?.bbox;
        Ok(bbox)
    }

    async fn drag_to(&self, x: f64, y: f64) -> Result<(), Error> {
        self.act(format!("drag {} to ({}, {})", self.selector, x, y), |_| Ok(()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, Error> {
        self.act(format!("screenshot {}", self.selector), |_| {
            Ok(PNG_SIGNATURE.to_vec())
        })
    }

    async fn text(&self) -> Result<String, Error> {
        let mut dom = self.dom();
        let text = dom.node_mut(&self.selector)?.text.clone();
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_of_registered_and_missing_elements() {
        let page = MockPage::new("about:blank")
            .with_element("#shown", MockNode::visible())
            .with_element("#hidden", MockNode::hidden().disabled());

        let shown = page.element("#shown").state().await.unwrap();
        assert!(shown.attached && shown.visible && shown.enabled);

        let hidden = page.element("#hidden").state().await.unwrap();
        assert!(hidden.attached && !hidden.visible && !hidden.enabled);

        assert_eq!(page.element("#nope").state().await.unwrap(), ElementSnapshot::default());
        assert_eq!(page.probe_count("#shown"), 1);
    }

    #[tokio::test]
    async fn test_invalid_selector_is_script_error() {
        let page = MockPage::new("about:blank");
        let result = page.element("##broken").state().await;
        assert!(matches!(result, Err(Error::ScriptExecutionFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_appearance() {
        let page = MockPage::new("about:blank")
            .with_element("#late", MockNode::visible().appearing_after(Duration::from_millis(300)));

        assert!(!page.element("#late").state().await.unwrap().attached);
        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(page.element("#late").state().await.unwrap().attached);
    }

    #[tokio::test]
    async fn test_click_rule_requires_values() {
        let page = MockPage::new("https://shop.test/")
            .with_element("#user", MockNode::visible())
            .with_element("#go", MockNode::visible())
            .on_click_navigate("#go", "https://shop.test/home", &[("#user", "alice")]);

        page.element("#go").click(1).await.unwrap();
        assert_eq!(page.url().await.unwrap(), "https://shop.test/");

        page.element("#user").fill("alice").await.unwrap();
        page.element("#go").click(1).await.unwrap();
        assert_eq!(page.url().await.unwrap(), "https://shop.test/home");
        assert_eq!(
            page.actions(),
            vec![
                "click #go",
                "fill #user alice",
                "click #go",
                "navigate https://shop.test/home"
            ]
        );
    }

    #[tokio::test]
    async fn test_actions_on_missing_element_fail() {
        let page = MockPage::new("about:blank");
        assert!(page.element("#nope").click(1).await.is_err());
        assert!(page.actions().is_empty());
    }
}
