//! End-to-end integration tests
//!
//! These tests validate complete workflows from opening a session to interaction and
//! teardown, first against an in-memory page and then through the real DevTools stack
//! talking to a mock server.

mod common;
mod mock_chrome;

use std::time::Duration;

use common::{attach_options, fast_timeouts, log_in, login_page, BASE_URL, INVENTORY_URL, PASSWORD, USERNAME};
use mock_chrome::MockChromeServer;
use stepwright::element::{ElementInteractor, WaitTimeouts};
use stepwright::session::{PageContext, SessionManager};
use stepwright::Error;

/// Test 1: Login with the demo credentials lands on the inventory
#[tokio::test(start_paused = true)]
async fn test_login_flow_on_mock_page() {
    let page = login_page();
    let elements = ElementInteractor::new(page.clone(), WaitTimeouts::default());

    let url = log_in(&elements, USERNAME, PASSWORD).await.unwrap();

    assert_eq!(url, INVENTORY_URL);
    assert_eq!(page.value("#user-name").as_deref(), Some(USERNAME));
    assert_eq!(page.value("#password").as_deref(), Some(PASSWORD));
}

/// Test 2: Wrong credentials never leave the login page
#[tokio::test(start_paused = true)]
async fn test_login_with_wrong_password_times_out() {
    let page = login_page();
    let elements = ElementInteractor::new(page.clone(), WaitTimeouts::default());

    let result = log_in(&elements, USERNAME, "wrong").await;

    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(page.url().await.unwrap(), BASE_URL);
}

/// Test 3: Missing elements fail with a timeout naming the selector
#[tokio::test(start_paused = true)]
async fn test_missing_element_reports_selector() {
    let page = login_page();
    let elements = ElementInteractor::new(page, WaitTimeouts::default());

    let err = elements.click("id:logout").await.unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("id:logout"));
}

/// Test 4: Full session over the DevTools protocol
#[tokio::test]
async fn test_session_over_devtools() {
    let server = MockChromeServer::start().await.unwrap();
    for selector in ["#user-name", "#password", "#login-button"] {
        server.add_element(selector);
    }
    server.navigate_on_click(INVENTORY_URL);

    let sessions = SessionManager::with_process_launcher();
    let session = sessions.open(&attach_options(&server.ws_endpoint())).await.unwrap();
    assert!(sessions.has_live_session());
    assert_eq!(session.engine_version(), Some("Chrome/120.0.6099.109"));
    assert_eq!(server.count("Target.createBrowserContext"), 1);
    assert_eq!(server.count("Emulation.setDeviceMetricsOverride"), 1);

    let elements = session.elements(fast_timeouts());
    let url = log_in(&elements, USERNAME, PASSWORD).await.unwrap();
    assert_eq!(url, INVENTORY_URL);
    assert!(server.count("Input.dispatchMouseEvent") >= 3);

    let screenshot = elements.screenshot_page().await.unwrap();
    assert_eq!(&screenshot[..4], &[0x89, b'P', b'N', b'G']);

    let report = session.close().await;
    assert!(report.is_clean(), "{:?}", report.failures);
    assert!(!sessions.has_live_session());

    let page_close = server.position("Page.close").unwrap();
    let dispose = server.position("Target.disposeBrowserContext").unwrap();
    let browser_close = server.position("Browser.close").unwrap();
    assert!(page_close < dispose);
    assert!(dispose < browser_close);
}

/// Test 5: Boolean checks over the DevTools protocol never fail for absent elements
#[tokio::test]
async fn test_presence_checks_over_devtools() {
    let server = MockChromeServer::start().await.unwrap();
    server.add_element("#login-button");

    let session = SessionManager::with_process_launcher()
        .open(&attach_options(&server.ws_endpoint()))
        .await
        .unwrap();
    let elements = session.elements(fast_timeouts());

    assert!(elements.is_present("id:login-button").await.unwrap());
    assert!(elements.is_visible("css:#login-button").await.unwrap());
    assert!(!elements.is_present("id:nope").await.unwrap());

    let err = elements.fill("id:nope", "x").await.unwrap_err();
    assert!(err.is_timeout());

    session.close().await;
}

/// Test 6: Attaching to an endpoint that is not there fails to open
#[tokio::test]
async fn test_open_against_dead_endpoint_fails() {
    let sessions = SessionManager::with_process_launcher();
    let options = attach_options("ws://127.0.0.1:9/devtools/browser/none");

    let result = tokio::time::timeout(Duration::from_secs(10), sessions.open(&options)).await;

    assert!(matches!(result, Ok(Err(_))));
}

/// Test 7: Login against the public demo shop
///
/// Needs a Chromium install and network access:
/// `cargo test --test e2e_test -- --ignored`
#[tokio::test]
#[ignore]
async fn test_login_against_live_site() {
    let config = stepwright::Config::from_env().unwrap();
    let session = SessionManager::with_process_launcher()
        .open(&config.browser_options())
        .await
        .unwrap();
    let elements = session.elements(config.wait_timeouts());

    elements.navigate("https://www.saucedemo.com/").await.unwrap();
    elements.fill("id:user-name", USERNAME).await.unwrap();
    elements.fill("id:password", PASSWORD).await.unwrap();
    elements.click("id:login-button").await.unwrap();
    let url = elements
        .wait_for_url("https://www.saucedemo.com/inventory.html", None)
        .await
        .unwrap();
    assert!(url.ends_with("/inventory.html"));

    let report = session.close().await;
    assert!(report.is_clean());
}
