//! Common test utilities
//!
//! Shared fixtures for the integration tests: a login page DOM, fast wait timeouts and
//! browser options pointed at the mock DevTools server.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use stepwright::element::{ElementInteractor, WaitTimeouts};
use stepwright::session::{BrowserOptions, MockNode, MockPage};

pub const BASE_URL: &str = "https://shop.test/";
pub const INVENTORY_URL: &str = "https://shop.test/inventory.html";
pub const USERNAME: &str = "standard_user";
pub const PASSWORD: &str = "secret_sauce";

/// Login form that navigates to the inventory only for the demo credentials
pub fn login_page() -> Arc<MockPage> {
    Arc::new(
        MockPage::new(BASE_URL)
            .with_element("#user-name", MockNode::visible())
            .with_element("#password", MockNode::visible())
            .with_element("#login-button", MockNode::visible())
            .on_click_navigate(
                "#login-button",
                INVENTORY_URL,
                &[("#user-name", USERNAME), ("#password", PASSWORD)],
            ),
    )
}

/// Timeouts short enough for real-time tests
pub fn fast_timeouts() -> WaitTimeouts {
    WaitTimeouts {
        wait: Duration::from_millis(1_000),
        check: Duration::from_millis(300),
        url: Duration::from_millis(1_000),
        poll_interval: Duration::from_millis(20),
    }
}

/// Options attaching to an already running DevTools endpoint
pub fn attach_options(endpoint: &str) -> BrowserOptions {
    BrowserOptions {
        cdp_endpoint: Some(endpoint.to_string()),
        viewport_width: 1280,
        viewport_height: 720,
        ..Default::default()
    }
}

/// Fill the login form and submit it
pub async fn log_in(
    elements: &ElementInteractor,
    username: &str,
    password: &str,
) -> stepwright::Result<String> {
    elements.navigate(BASE_URL).await?;
    elements.fill("id:user-name", username).await?;
    elements.fill("id:password", password).await?;
    elements.click("id:login-button").await?;
    elements.wait_for_url(INVENTORY_URL, None).await
}
