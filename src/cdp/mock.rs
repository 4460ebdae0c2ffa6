//! Mock CDP implementation for testing
//!
//! Mock implementations of the CDP traits. Every mock records the methods it was asked to
//! run in a shared call log and can be told to fail specific methods, which lets the session
//! layer's teardown ordering be tested without a browser.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::cdp::traits::*;
use crate::session::BrowserOptions;
use crate::Error;

/// Methods recorded by the mocks, in call order
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call, failing it if the method was marked as failing
    fn record(&self, method: &str) -> Result<(), Error> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(method.to_string());

        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(method) {
            return Err(Error::cdp(format!("{}: mock failure", method)));
        }
        Ok(())
    }

    /// Make every future call of `method` fail
    pub fn fail_method(&self, method: &str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method.to_string());
    }

    /// All recorded method names
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Position of the first call of `method`
    pub fn position(&self, method: &str) -> Option<usize> {
        self.calls().iter().position(|m| m == method)
    }

    /// Number of calls of `method`
    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| *m == method).count()
    }
}

/// Mock CDP connection
#[derive(Debug)]
pub struct MockCdpConnection {
    log: CallLog,
    is_active: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl MockCdpConnection {
    /// Create a new mock CDP connection
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    /// Create a mock connection that records into an existing log
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            is_active: Arc::new(AtomicBool::new(true)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Methods sent over this connection
    pub fn calls(&self) -> Vec<String> {
        self.log.calls()
    }
}

impl Default for MockCdpConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, _params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::Relaxed) {
            return Err(Error::cdp("Connection is closed"));
        }

        self.log.record(method)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Simulate different responses based on method
        let result = match method {
            "Page.navigate" => serde_json::json!({
                "frameId": uuid::Uuid::new_v4().to_string(),
                "loaderId": uuid::Uuid::new_v4().to_string(),
            }),
            "Runtime.evaluate" => serde_json::json!({
                "result": { "type": "string", "value": "complete" }
            }),
            "Page.captureScreenshot" => serde_json::json!({
                "data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg=="
            }),
            "Target.createTarget" => serde_json::json!({
                "targetId": uuid::Uuid::new_v4().simple().to_string().to_uppercase(),
            }),
            "Target.createBrowserContext" => serde_json::json!({
                "browserContextId": uuid::Uuid::new_v4().simple().to_string().to_uppercase(),
            }),
            _ => serde_json::json!({}),
        };

        Ok(CdpResponse {
            id,
            result: Some(result),
            error: None,
        })
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

/// Mock CDP client
#[derive(Debug)]
pub struct MockCdpClient {
    connection: Arc<MockCdpConnection>,
    log: CallLog,
    url: Mutex<String>,
}

impl MockCdpClient {
    /// Create a new mock CDP client
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    /// Create a mock client that records into an existing log
    pub fn with_log(log: CallLog) -> Self {
        Self {
            connection: Arc::new(MockCdpConnection::with_log(log.clone())),
            log,
            url: Mutex::new("about:blank".to_string()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.calls()
    }
}

impl Default for MockCdpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpClient for MockCdpClient {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        self.connection.clone()
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        self.call_method("Page.navigate", serde_json::json!({ "url": url }))
            .await?;
        *self.url.lock().unwrap_or_else(PoisonError::into_inner) = url.to_string();
        Ok(NavigationResult {
            loader_id: Some(uuid::Uuid::new_v4().to_string()),
            url: url.to_string(),
        })
    }

    async fn evaluate(&self, script: &str, _await_promise: bool) -> Result<EvaluationResult, Error> {
        self.log.record("Runtime.evaluate")?;

        if script.contains("location.href") {
            let url = self.url.lock().unwrap_or_else(PoisonError::into_inner).clone();
            Ok(EvaluationResult::String(url))
        } else if script.contains("document.readyState") {
            Ok(EvaluationResult::String("complete".to_string()))
        } else {
            Ok(EvaluationResult::Null)
        }
    }

    async fn screenshot(&self, format: ScreenshotFormat, _clip: Option<ClipRect>) -> Result<Vec<u8>, Error> {
        self.log.record("Page.captureScreenshot")?;

        // Magic bytes only
        Ok(match format {
            ScreenshotFormat::Png => vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
            ScreenshotFormat::Jpeg(_) => vec![0xFF, 0xD8, 0xFF, 0xE0],
            ScreenshotFormat::WebP(_) => vec![0x52, 0x49, 0x46, 0x46],
        })
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        self.call_method(&format!("{}.enable", domain), serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;

        if let Some(error) = response.error {
            return Err(Error::cdp(format!("{:?}", error)));
        }

        response.result.ok_or_else(|| Error::cdp("No result in response"))
    }
}

/// Mock CDP browser
#[derive(Debug)]
pub struct MockCdpBrowser {
    log: CallLog,
    is_active: AtomicBool,
}

impl MockCdpBrowser {
    /// Create a new mock CDP browser
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    /// Create a mock browser whose clients share `log`
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            is_active: AtomicBool::new(true),
        }
    }

    /// Shared call log of this browser and every client it created
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if self.is_active.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::cdp("Browser is closed"))
        }
    }
}

impl Default for MockCdpBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpBrowser for MockCdpBrowser {
    async fn create_context(&self) -> Result<String, Error> {
        self.ensure_active()?;
        self.log.record("Target.createBrowserContext")?;
        Ok(format!("CTX-{}", uuid::Uuid::new_v4().simple()))
    }

    async fn dispose_context(&self, _context_id: &str) -> Result<(), Error> {
        self.ensure_active()?;
        self.log.record("Target.disposeBrowserContext")
    }

    async fn create_target(&self, url: &str, _context_id: Option<&str>) -> Result<String, Error> {
        self.ensure_active()?;
        self.log.record("Target.createTarget")?;

        let target_id = uuid::Uuid::new_v4().simple().to_string();
        let ws_url = format!("ws://localhost:9222/devtools/page/{}", target_id);
        tracing::debug!("Mock: Created target {} with URL {} => {}", target_id, url, ws_url);
        Ok(ws_url)
    }

    async fn create_client(&self, _target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        self.ensure_active()?;
        Ok(Arc::new(MockCdpClient::with_log(self.log.clone())))
    }

    async fn close(&self) -> Result<(), Error> {
        self.log.record("Browser.close")?;
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        Ok(BrowserVersion {
            protocol_version: "1.3".to_string(),
            product: "Chrome/120.0.0.0".to_string(),
            user_agent: "Mock Chrome/120.0.0.0".to_string(),
        })
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

/// Launcher that hands out mock engines
#[derive(Debug, Default)]
pub struct MockEngineLauncher {
    log: CallLog,
    fail_launch: bool,
    launches: Mutex<Vec<BrowserOptions>>,
    browsers: Mutex<Vec<Arc<MockCdpBrowser>>>,
}

impl MockEngineLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher whose engines record into `log`
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Launcher that refuses to start an engine
    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Options of every launch request, in order
    pub fn launches(&self) -> Vec<BrowserOptions> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Engines handed out so far
    pub fn browsers(&self) -> Vec<Arc<MockCdpBrowser>> {
        self.browsers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EngineLauncher for MockEngineLauncher {
    async fn launch(&self, options: &BrowserOptions) -> Result<Arc<dyn CdpBrowser>, Error> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options.clone());

        if self.fail_launch {
            return Err(Error::launch(format!("mock refused to launch {}", options.engine)));
        }

        let browser = Arc::new(MockCdpBrowser::with_log(self.log.clone()));
        self.browsers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&browser));
        Ok(browser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_connection() {
        let conn = MockCdpConnection::new();
        assert!(conn.is_active());

        let response = conn
            .send_command("Runtime.evaluate", serde_json::json!({}))
            .await
            .unwrap();
        assert!(response.result.is_some());
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_failing_method() {
        let log = CallLog::new();
        log.fail_method("Page.close");
        let client = MockCdpClient::with_log(log.clone());

        assert!(client.call_method("Page.close", serde_json::json!({})).await.is_err());
        assert!(client.call_method("Page.enable", serde_json::json!({})).await.is_ok());
        assert_eq!(log.calls(), vec!["Page.close", "Page.enable"]);
    }

    #[tokio::test]
    async fn test_mock_client_tracks_url() {
        let client = MockCdpClient::new();
        client.navigate("https://example.com").await.unwrap();

        let href = client.evaluate("window.location.href", false).await.unwrap();
        assert_eq!(href, EvaluationResult::String("https://example.com".to_string()));
    }

    #[tokio::test]
    async fn test_mock_browser_shares_log() {
        let browser = MockCdpBrowser::new();
        let context = browser.create_context().await.unwrap();
        let target = browser.create_target("about:blank", Some(&context)).await.unwrap();
        let client = browser.create_client(&target).await.unwrap();
        client.enable_domain("Page").await.unwrap();
        browser.close().await.unwrap();

        assert_eq!(
            browser.log().calls(),
            vec![
                "Target.createBrowserContext",
                "Target.createTarget",
                "Page.enable",
                "Browser.close"
            ]
        );
        assert!(!browser.is_active());
        assert!(browser.create_context().await.is_err());
    }

    #[tokio::test]
    async fn test_failing_launcher() {
        let launcher = MockEngineLauncher::failing();
        let result = launcher.launch(&BrowserOptions::default()).await;
        assert!(matches!(result, Err(Error::Launch(_))));
        assert_eq!(launcher.launches().len(), 1);
    }
}
