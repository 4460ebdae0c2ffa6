//! Mock Chrome DevTools Protocol server
//!
//! Speaks just enough CDP for the real connection, client and browser stack: browser
//! contexts, page targets, navigation and the element scripts. Every WebSocket path is
//! accepted, so the browser endpoint and the page endpoints share one listener.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Default)]
struct DevtoolsState {
    methods: Vec<String>,
    url: String,
    elements: HashSet<String>,
    click_url: Option<String>,
    next_target: u32,
}

/// Mock Chrome server
pub struct MockChromeServer {
    addr: String,
    state: Arc<Mutex<DevtoolsState>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockChromeServer {
    /// Start a new mock Chrome server
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(DevtoolsState {
            url: "about:blank".to_string(),
            ..DevtoolsState::default()
        }));

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server_state = Arc::clone(&state);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                tracing::info!("Mock Chrome: Connection from {}", peer_addr);
                                tokio::spawn(Self::handle_connection(stream, Arc::clone(&server_state)));
                            }
                            Err(e) => {
                                tracing::error!("Mock Chrome: Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Mock Chrome: Shutdown signal received");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            addr: format!("ws://{}", addr),
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Register an element reachable through `document.querySelector(selector)`
    pub fn add_element(&self, selector: &str) {
        self.state().elements.insert(selector.to_string());
    }

    /// Navigate to `url` when a click gesture completes
    pub fn navigate_on_click(&self, url: &str) {
        self.state().click_url = Some(url.to_string());
    }

    /// Methods received on every connection, in arrival order
    pub fn methods(&self) -> Vec<String> {
        self.state().methods.clone()
    }

    pub fn position(&self, method: &str) -> Option<usize> {
        self.methods().iter().position(|m| m == method)
    }

    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| *m == method).count()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, DevtoolsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle a WebSocket connection
    async fn handle_connection(stream: TcpStream, state: Arc<Mutex<DevtoolsState>>) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                tracing::error!("Mock Chrome: WebSocket handshake error: {}", e);
                return;
            }
        };
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let Ok(request) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    let response = {
                        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                        Self::create_cdp_response(&mut state, &request)
                    };
                    if let Ok(text) = serde_json::to_string(&response) {
                        if ws_sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::debug!("Mock Chrome: WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    }

    /// Create a CDP response for a request
    fn create_cdp_response(state: &mut DevtoolsState, request: &Value) -> Value {
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("unknown");
        let id = request.get("id").and_then(|i| i.as_u64()).unwrap_or(0);
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        state.methods.push(method.to_string());

        let result = match method {
            "Target.createBrowserContext" => json!({ "browserContextId": "MOCK-CONTEXT" }),
            "Target.createTarget" => {
                state.next_target += 1;
                json!({ "targetId": format!("MOCK-TARGET-{}", state.next_target) })
            }
            "Browser.getVersion" => json!({
                "protocolVersion": "1.3",
                "product": "Chrome/120.0.6099.109",
                "userAgent": "Mozilla/5.0 (Mock)",
            }),
            "Page.navigate" => {
                if let Some(url) = params.get("url").and_then(|u| u.as_str()) {
                    state.url = url.to_string();
                }
                json!({ "frameId": "mock-frame", "loaderId": "mock-loader" })
            }
            "Input.dispatchMouseEvent" => {
                if params.get("type").and_then(|t| t.as_str()) == Some("mouseReleased") {
                    if let Some(url) = state.click_url.clone() {
                        state.url = url;
                    }
                }
                json!({})
            }
            "Runtime.evaluate" => {
                let expression = params.get("expression").and_then(|e| e.as_str()).unwrap_or("");
                json!({ "result": Self::evaluate(state, expression) })
            }
            "Page.captureScreenshot" => json!({
                "data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg=="
            }),
            _ => json!({}),
        };

        json!({ "id": id, "result": result })
    }

    /// Remote object for an evaluated expression
    fn evaluate(state: &DevtoolsState, expression: &str) -> Value {
        if expression.contains("location.href") {
            return json!({ "type": "string", "value": state.url });
        }
        if expression.contains("document.readyState") {
            return json!({ "type": "string", "value": "complete" });
        }

        let matched = state
            .elements
            .iter()
            .any(|selector| expression.contains(&format!("document.querySelector('{}')", selector)));

        if expression.contains("attached: true") {
            return json!({
                "type": "object",
                "value": {
                    "attached": matched,
                    "visible": matched,
                    "enabled": matched,
                    "checked": false,
                }
            });
        }

        if !matched {
            return json!({ "type": "object", "subtype": "null", "value": null });
        }
        if expression.contains("getBoundingClientRect") {
            return json!({
                "type": "object",
                "value": { "x": 10.0, "y": 20.0, "width": 100.0, "height": 30.0 }
            });
        }
        json!({ "type": "boolean", "value": true })
    }

    /// Browser-level WebSocket endpoint
    pub fn ws_endpoint(&self) -> String {
        format!("{}/devtools/browser/mock", self.addr)
    }
}

impl Drop for MockChromeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
