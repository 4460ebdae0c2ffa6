//! # Chrome DevTools Protocol (CDP) layer
//!
//! WebSocket transport to a browser engine, based on the Chrome DevTools Protocol.
//!
//! ## Features
//! - **Connection management**: one WebSocket per target, responses routed to their commands
//! - **Engine control**: isolated browser contexts, page targets, version, shutdown
//! - **Page commands**: navigation, script evaluation, screenshots
//! - **Launching**: start an engine executable or attach to a running one
//!
//! ## Module layout
//! - `traits`: CDP trait definitions
//! - `types`: wire types
//! - `connection`: WebSocket connection
//! - `client`: page-level client
//! - `browser`: engine-level operations
//! - `launcher`: engine process startup
//! - `mock`: mock implementations for tests
//!
//! ## Example
//! ```rust,no_run
//! use stepwright::cdp::{CdpBrowser, CdpClient, CdpBrowserImpl};
//!
//! # async fn example() -> Result<(), stepwright::Error> {
//! let browser = CdpBrowserImpl::connect("http://localhost:9222").await?;
//! let context = browser.create_context().await?;
//! let target = browser.create_target("about:blank", Some(&context)).await?;
//! let client = browser.create_client(&target).await?;
//!
//! let result = client.navigate("https://example.com").await?;
//! println!("Navigated to: {}", result.url);
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod types;
pub mod connection;
pub mod client;
pub mod browser;
pub mod launcher;
pub mod mock;


pub use traits::{
    CdpConnection, CdpClient, CdpBrowser, EngineLauncher, CdpResponse, CdpError,
    NavigationResult, EvaluationResult, ScreenshotFormat, ClipRect, BrowserVersion,
};

// Re-export implementation structs
pub use connection::CdpWebSocketConnection;
pub use client::CdpClientImpl;
pub use browser::CdpBrowserImpl;
pub use launcher::{EngineProcess, ProcessLauncher};

// Re-export mocks for integration tests
pub use mock::{CallLog, MockCdpBrowser, MockCdpClient, MockCdpConnection, MockEngineLauncher};
