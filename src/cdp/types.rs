//! CDP (Chrome DevTools Protocol) wire types
//!
//! JSON-RPC envelopes and the parameter/response shapes of the commands this crate sends.

use serde::{Deserialize, Serialize};

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// CDP JSON-RPC notification (event)
#[derive(Debug, Clone, Deserialize)]
pub struct CdpNotification {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
    /// Event parameters
    #[serde(default)]
    pub params: serde_json::Value,
}

/// CDP JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct CdpRpcResponse {
    /// Response ID (matches request ID)
    pub id: u64,
    /// Response result
    #[serde(default)]
    pub result: serde_json::Value,
    /// Error if any
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// CDP error detail
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Page navigation parameters
#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
    /// Referrer URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// JavaScript evaluation parameters
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateParams {
    /// JavaScript expression to evaluate
    pub expression: String,
    /// Whether to await promise
    #[serde(skip_serializing_if = "Option::is_none", rename = "awaitPromise")]
    pub await_promise: Option<bool>,
    /// Whether to return as value
    #[serde(skip_serializing_if = "Option::is_none", rename = "returnByValue")]
    pub return_by_value: Option<bool>,
}

/// Screenshot parameters
#[derive(Debug, Clone, Serialize)]
pub struct ScreenshotParams {
    /// Image format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// JPEG quality (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Clip region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<Clip>,
    /// Capture beyond the viewport
    #[serde(skip_serializing_if = "Option::is_none", rename = "captureBeyondViewport")]
    pub capture_beyond_viewport: Option<bool>,
}

/// Clip region for screenshot
#[derive(Debug, Clone, Serialize)]
pub struct Clip {
    /// X offset
    pub x: f64,
    /// Y offset
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Page scale factor
    pub scale: f64,
}

/// Target.createTarget parameters
#[derive(Debug, Clone, Serialize)]
pub struct CreateTargetParams {
    /// Initial URL
    pub url: String,
    /// Browser context the target is created in
    #[serde(skip_serializing_if = "Option::is_none", rename = "browserContextId")]
    pub browser_context_id: Option<String>,
}

/// Target.createTarget response
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTargetResponse {
    /// Created target ID
    #[serde(rename = "targetId")]
    pub target_id: String,
}

/// Target.createBrowserContext response
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBrowserContextResponse {
    /// Created context ID
    #[serde(rename = "browserContextId")]
    pub browser_context_id: String,
}

/// `/json/version` payload of the DevTools HTTP endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    /// Browser product
    #[serde(rename = "Browser", default)]
    pub browser: String,
    /// Protocol version
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    /// User agent
    #[serde(rename = "User-Agent", default)]
    pub user_agent: String,
    /// Browser-level WebSocket URL
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

/// Remote object (result of JavaScript evaluation)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteObject {
    /// Object type
    #[serde(default)]
    pub r#type: String,
    /// Object subtype
    #[serde(default)]
    pub subtype: Option<String>,
    /// Object value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Object description
    #[serde(default)]
    pub description: Option<String>,
}

/// JavaScript evaluation response
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResponse {
    /// Evaluation result
    #[serde(default)]
    pub result: RemoteObject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_request_serialization() {
        let request = CdpRequest {
            id: 1,
            method: "Page.navigate".to_string(),
            params: Some(serde_json::json!({ "url": "https://example.com" })),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"Page.navigate\""));
    }

    #[test]
    fn test_cdp_request_without_params() {
        let request = CdpRequest {
            id: 2,
            method: "Page.enable".to_string(),
            params: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("\"params\""));
    }

    #[test]
    fn test_create_target_params() {
        let params = CreateTargetParams {
            url: "about:blank".to_string(),
            browser_context_id: Some("CTX1".to_string()),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["browserContextId"], "CTX1");

        let params = CreateTargetParams {
            url: "about:blank".to_string(),
            browser_context_id: None,
        };
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("browserContextId").is_none());
    }

    #[test]
    fn test_version_info_parsing() {
        let info: VersionInfo = serde_json::from_value(serde_json::json!({
            "Browser": "Chrome/120.0.6099.109",
            "Protocol-Version": "1.3",
            "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
        }))
        .unwrap();
        assert_eq!(info.browser, "Chrome/120.0.6099.109");
        assert_eq!(
            info.web_socket_debugger_url.as_deref(),
            Some("ws://127.0.0.1:9222/devtools/browser/abc")
        );
        assert!(info.user_agent.is_empty());
    }

    #[test]
    fn test_error_response_parsing() {
        let response: CdpRpcResponse = serde_json::from_str(
            r#"{"id":7,"error":{"code":-32000,"message":"No target with given id"}}"#,
        )
        .unwrap();
        assert_eq!(response.id, 7);
        assert!(response.result.is_null());
        assert_eq!(response.error.unwrap().code, -32000);
    }
}
