//! Unified error types for Stepwright

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Stepwright
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Page not found or already closed
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// Browser context not found or already disposed
    #[error("Browser context not found: {0}")]
    ContextNotFound(String),

    /// An awaited state was not reached in time
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// Browser engine could not be launched or reached
    #[error("Engine launch failed: {0}")]
    Launch(String),

    /// Capture process could not be spawned
    #[error("Process spawn failed: {0}")]
    ProcessSpawn(String),

    /// No capture command exists for this platform
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A teardown step failed
    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new page not found error
    pub fn page_not_found<S: Into<String>>(id: S) -> Self {
        Error::PageNotFound(id.into())
    }

    /// Create a new context not found error
    pub fn context_not_found<S: Into<String>>(id: S) -> Self {
        Error::ContextNotFound(id.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new navigation failed error
    pub fn navigation_failed<S: Into<String>>(msg: S) -> Self {
        Error::NavigationFailed(msg.into())
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new engine launch error
    pub fn launch<S: Into<String>>(msg: S) -> Self {
        Error::Launch(msg.into())
    }

    /// Create a new process spawn error
    pub fn process_spawn<S: Into<String>>(msg: S) -> Self {
        Error::ProcessSpawn(msg.into())
    }

    /// Create a new unsupported platform error
    pub fn unsupported_platform<S: Into<String>>(platform: S) -> Self {
        Error::UnsupportedPlatform(platform.into())
    }

    /// Create a new cleanup error
    pub fn cleanup<S: Into<String>>(msg: S) -> Self {
        Error::Cleanup(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
