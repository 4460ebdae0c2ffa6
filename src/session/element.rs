//! Element reference implementation
//!
//! Selector-bound element handle. DOM reads and value changes run as page scripts; pointer and
//! keyboard input goes through `Input.dispatch*Event` so pages see trusted events.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::cdp::traits::{CdpClient, EvaluationResult, ScreenshotFormat};
use crate::session::scripts::JsBuilder;
use crate::session::traits::{BoundingBox, ElementRef, ElementSnapshot};
use crate::Error;

/// Intermediate pointer positions sent while dragging
const DRAG_STEPS: u32 = 5;

/// Element reference implementation
#[derive(Debug)]
pub struct ElementRefImpl {
    selector: String,
    page_id: String,
    js: JsBuilder,
    cdp_client: Arc<dyn CdpClient>,
}

impl ElementRefImpl {
    /// Create a new element reference
    pub fn new(page_id: String, selector: String, cdp_client: Arc<dyn CdpClient>) -> Self {
        Self {
            js: JsBuilder::new(selector.clone()),
            selector,
            page_id,
            cdp_client,
        }
    }

    /// ID of the page this element lives on
    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    fn not_found(&self) -> Error {
        Error::script_execution_failed(format!("No element matches '{}'", self.selector))
    }

    /// Run a script bound to this element; `null` means nothing matched
    async fn run(&self, script: &str) -> Result<EvaluationResult, Error> {
        match self.cdp_client.evaluate(script, false).await? {
            EvaluationResult::Null => Err(self.not_found()),
            other => Ok(other),
        }
    }

    async fn mouse_event(
        &self,
        event_type: &str,
        x: f64,
        y: f64,
        click_count: u32,
    ) -> Result<(), Error> {
        let mut params = json!({
            "type": event_type,
            "x": x,
            "y": y,
        });
        if event_type != "mouseMoved" {
            params["button"] = json!("left");
            params["clickCount"] = json!(click_count);
        }

        self.cdp_client
            .call_method("Input.dispatchMouseEvent", params)
            .await?;
        Ok(())
    }

    async fn key_event(&self, event_type: &str, key: &str) -> Result<(), Error> {
        let (code, key_code, text) = key_definition(key);
        let mut params = json!({
            "type": event_type,
            "key": key,
            "code": code,
            "windowsVirtualKeyCode": key_code,
        });
        if event_type == "keyDown" {
            if let Some(text) = text {
                params["text"] = json!(text);
            }
        }

        self.cdp_client
            .call_method("Input.dispatchKeyEvent", params)
            .await?;
        Ok(())
    }
}

/// `(code, windowsVirtualKeyCode, text)` for a key name
fn key_definition(key: &str) -> (String, u32, Option<String>) {
    match key {
        "Enter" => ("Enter".to_string(), 13, Some("\r".to_string())),
        "Tab" => ("Tab".to_string(), 9, None),
        "Escape" => ("Escape".to_string(), 27, None),
        "Backspace" => ("Backspace".to_string(), 8, None),
        "Delete" => ("Delete".to_string(), 46, None),
        "Space" | " " => ("Space".to_string(), 32, Some(" ".to_string())),
        "ArrowUp" => ("ArrowUp".to_string(), 38, None),
        "ArrowDown" => ("ArrowDown".to_string(), 40, None),
        "ArrowLeft" => ("ArrowLeft".to_string(), 37, None),
        "ArrowRight" => ("ArrowRight".to_string(), 39, None),
        "Home" => ("Home".to_string(), 36, None),
        "End" => ("End".to_string(), 35, None),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => (
                    format!("Key{}", c.to_ascii_uppercase()),
                    c.to_ascii_uppercase() as u32,
                    Some(c.to_string()),
                ),
                (Some(c), None) if c.is_ascii_digit() => {
                    (format!("Digit{}", c), c as u32, Some(c.to_string()))
                }
                (Some(c), None) => (String::new(), 0, Some(c.to_string())),
                _ => (other.to_string(), 0, None),
            }
        }
    }
}

fn parse_snapshot(result: EvaluationResult) -> Result<ElementSnapshot, Error> {
    match result {
        EvaluationResult::Object(value) => Ok(serde_json::from_value(value)?),
        EvaluationResult::String(json) => Ok(serde_json::from_str(&json)?),
        other => Err(Error::cdp(format!("Unexpected element state: {:?}", other))),
    }
}

#[async_trait]
impl ElementRef for ElementRefImpl {
    fn selector(&self) -> &str {
        &self.selector
    }

    async fn state(&self) -> Result<ElementSnapshot, Error> {
        let result = self.cdp_client.evaluate(&self.js.state_script(), false).await?;
        parse_snapshot(result)
    }

    async fn click(&self, click_count: u32) -> Result<(), Error> {
        let (x, y) = self.center().await?;
        debug!("Clicking '{}' at ({}, {}) x{}", self.selector, x, y, click_count);

        self.mouse_event("mouseMoved", x, y, 0).await?;
        for count in 1..=click_count.max(1) {
            self.mouse_event("mousePressed", x, y, count).await?;
            self.mouse_event("mouseReleased", x, y, count).await?;
        }
        Ok(())
    }

    async fn focus(&self) -> Result<(), Error> {
        self.run(&self.js.focus_script()).await?;
        Ok(())
    }

    async fn fill(&self, value: &str) -> Result<(), Error> {
        self.run(&self.js.fill_script(value)).await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), Error> {
        self.focus().await?;

        for ch in text.chars() {
            self.cdp_client
                .call_method(
                    "Input.dispatchKeyEvent",
                    json!({
                        "type": "char",
                        "text": ch.to_string(),
                    }),
                )
                .await?;
        }
        Ok(())
    }

    async fn press(&self, key: &str) -> Result<(), Error> {
        self.focus().await?;
        self.key_event("keyDown", key).await?;
        self.key_event("keyUp", key).await
    }

    async fn hover(&self) -> Result<(), Error> {
        let (x, y) = self.center().await?;
        self.mouse_event("mouseMoved", x, y, 0).await
    }

    async fn set_checked(&self, checked: bool) -> Result<(), Error> {
        match self.run(&self.js.set_checked_script(checked)).await? {
            EvaluationResult::Bool(state) if state == checked => Ok(()),
            _ => Err(Error::script_execution_failed(format!(
                "'{}' did not become {}",
                self.selector,
                if checked { "checked" } else { "unchecked" }
            ))),
        }
    }

    async fn select_option(&self, value: &str) -> Result<(), Error> {
        match self.run(&self.js.select_option_script(value)).await? {
            EvaluationResult::Bool(true) => Ok(()),
            _ => Err(Error::script_execution_failed(format!(
                "'{}' has no option '{}'",
                self.selector, value
            ))),
        }
    }

    async fn bounding_box(&self) -> Result<BoundingBox, Error> {
        match self.run(&self.js.bounding_box_script()).await? {
            EvaluationResult::Object(value) => Ok(serde_json::from_value(value)?),
            other => Err(Error::cdp(format!("Unexpected bounding box: {:?}", other))),
        }
    }

    async fn drag_to(&self, x: f64, y: f64) -> Result<(), Error> {
        let (start_x, start_y) = self.center().await?;

        self.mouse_event("mouseMoved", start_x, start_y, 0).await?;
        self.mouse_event("mousePressed", start_x, start_y, 1).await?;
        for step in 1..=DRAG_STEPS {
            let t = step as f64 / DRAG_STEPS as f64;
            self.mouse_event(
                "mouseMoved",
                start_x + (x - start_x) * t,
                start_y + (y - start_y) * t,
                0,
            )
            .await?;
        }
        self.mouse_event("mouseReleased", x, y, 1).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, Error> {
        let bbox = self.bounding_box().await?;
        self.cdp_client
            .screenshot(ScreenshotFormat::Png, Some(bbox.into()))
            .await
    }

    async fn text(&self) -> Result<String, Error> {
        match self.run(&self.js.text_script()).await? {
            EvaluationResult::String(text) => Ok(text),
            other => Err(Error::cdp(format!("Unexpected element text: {:?}", other))),
        }
    }
}
