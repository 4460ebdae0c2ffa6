//! CDP browser control implementation
//!
//! One engine instance reached through its browser-level DevTools WebSocket. Isolated
//! browser contexts and page targets are created over that socket; every page gets its own
//! connection.

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::launcher::EngineProcess;
use super::traits::*;
use super::types::{CreateBrowserContextResponse, CreateTargetParams, CreateTargetResponse, VersionInfo};
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// CDP browser implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// Browser-level WebSocket URL (e.g., "ws://127.0.0.1:9222/devtools/browser/<id>")
    ws_url: String,
    /// Browser-level connection
    connection: Arc<dyn CdpConnection>,
    /// Page connections (target_id -> connection)
    page_connections: Mutex<HashMap<String, Arc<dyn CdpConnection>>>,
    /// Engine process when this instance launched it
    process: Mutex<Option<EngineProcess>>,
    is_active: AtomicBool,
}

impl CdpBrowserImpl {
    /// Connect to a running engine
    ///
    /// # Arguments
    /// * `endpoint` - Browser WebSocket URL, or an HTTP/WS host endpoint (e.g., "http://localhost:9222")
    ///   that is resolved through `/json/version`
    pub async fn connect(endpoint: &str) -> Result<Self, Error> {
        let ws_url = resolve_browser_ws_url(endpoint).await?;
        info!("Connecting to browser endpoint: {}", ws_url);

        let connection = CdpWebSocketConnection::new(ws_url.clone()).await?;

        Ok(Self {
            ws_url,
            connection,
            page_connections: Mutex::new(HashMap::new()),
            process: Mutex::new(None),
            is_active: AtomicBool::new(true),
        })
    }

    /// Attach the engine process this instance is responsible for reaping
    pub fn with_process(self, process: EngineProcess) -> Self {
        Self {
            process: Mutex::new(Some(process)),
            ..self
        }
    }

    /// Browser-level WebSocket URL
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Page WebSocket URL for a target on this engine
    fn page_ws_url(&self, target_id: &str) -> Result<String, Error> {
        let url = reqwest::Url::parse(&self.ws_url)
            .map_err(|e| Error::cdp(format!("Invalid browser endpoint {}: {}", self.ws_url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::cdp(format!("Browser endpoint has no host: {}", self.ws_url)))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::cdp(format!("Browser endpoint has no port: {}", self.ws_url)))?;

        Ok(format!("{}://{}:{}/devtools/page/{}", url.scheme(), host, port, target_id))
    }

    async fn browser_call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        if !self.is_active() {
            return Err(Error::cdp("Browser is closed"));
        }

        let response = self.connection.send_command(method, params).await?;
        response.result.ok_or_else(|| Error::cdp("No result in response"))
    }
}

/// Turn a configured endpoint into the browser-level WebSocket URL
async fn resolve_browser_ws_url(endpoint: &str) -> Result<String, Error> {
    let is_ws = endpoint.starts_with("ws://") || endpoint.starts_with("wss://");
    if is_ws && endpoint.contains("/devtools/browser/") {
        return Ok(endpoint.to_string());
    }

    let http_endpoint = endpoint
        .replace("ws://", "http://")
        .replace("wss://", "https://");
    let url = format!("{}/json/version", http_endpoint.trim_end_matches('/'));

    debug!("Fetching browser version from {}", url);

    let version: VersionInfo = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::launch(format!("Failed to reach DevTools endpoint {}: {}", endpoint, e)))?
        .json()
        .await
        .map_err(|e| Error::launch(format!("Failed to parse {}: {}", url, e)))?;

    version
        .web_socket_debugger_url
        .ok_or_else(|| Error::launch(format!("No webSocketDebuggerUrl at {}", url)))
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    async fn create_context(&self) -> Result<String, Error> {
        let result = self
            .browser_call("Target.createBrowserContext", serde_json::json!({}))
            .await?;

        let response: CreateBrowserContextResponse = serde_json::from_value(result)?;
        info!("Created browser context {}", response.browser_context_id);
        Ok(response.browser_context_id)
    }

    async fn dispose_context(&self, context_id: &str) -> Result<(), Error> {
        info!("Disposing browser context {}", context_id);
        self.browser_call(
            "Target.disposeBrowserContext",
            serde_json::json!({ "browserContextId": context_id }),
        )
        .await?;
        Ok(())
    }

    async fn create_target(&self, url: &str, context_id: Option<&str>) -> Result<String, Error> {
        info!("Creating new target with URL: {}", url);

        let params = CreateTargetParams {
            url: url.to_string(),
            browser_context_id: context_id.map(|s| s.to_string()),
        };

        let result = self
            .browser_call("Target.createTarget", serde_json::to_value(params)?)
            .await?;
        let response: CreateTargetResponse = serde_json::from_value(result)?;

        let ws_url = self.page_ws_url(&response.target_id)?;
        debug!("Created target {} at {}", response.target_id, ws_url);
        Ok(ws_url)
    }

    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        info!("Creating CDP client for target: {}", target_url);

        let connection = CdpWebSocketConnection::new(target_url).await?;

        let target_id = target_url
            .rsplit('/')
            .next()
            .unwrap_or("unknown")
            .to_string();
        self.page_connections
            .lock()
            .await
            .insert(target_id, Arc::clone(&connection) as Arc<dyn CdpConnection>);

        let client = Arc::new(CdpClientImpl::new(connection));

        // Page and Runtime are needed by every page operation
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;

        Ok(client)
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            warn!("CdpBrowser::close: Browser at {} is already closed", self.ws_url);
            return Ok(());
        }

        info!("CdpBrowser::close: Closing browser at {}", self.ws_url);
        let mut failures = Vec::new();

        let pages: Vec<(String, Arc<dyn CdpConnection>)> =
            self.page_connections.lock().await.drain().collect();
        for (target_id, connection) in pages {
            if let Err(e) = connection.close().await {
                warn!("CdpBrowser::close: Failed to close connection to {}: {}", target_id, e);
            }
        }

        // The engine may drop the socket before answering
        if let Err(e) = self.connection.send_command("Browser.close", serde_json::json!({})).await {
            debug!("CdpBrowser::close: Browser.close did not complete: {}", e);
        }

        if let Err(e) = self.connection.close().await {
            warn!("CdpBrowser::close: Failed to close browser connection: {}", e);
        }

        let process = self.process.lock().await.take();
        if let Some(process) = process {
            if let Err(e) = process.shutdown().await {
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::cleanup(failures.join("; ")))
        }
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        let version = self
            .browser_call("Browser.getVersion", serde_json::json!({}))
            .await?;

        let field = |name: &str| {
            version
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()
        };

        Ok(BrowserVersion {
            protocol_version: field("protocolVersion"),
            product: field("product"),
            user_agent: field("userAgent"),
        })
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst) && self.connection.is_active()
    }
}
