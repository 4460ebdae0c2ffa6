//! # Session layer
//!
//! Owns the browser engine, the isolated context and the page used by a test run.
//!
//! ## Concepts
//! - **BrowserContext**: an isolated browsing context inside the engine
//! - **PageContext**: a page in that context
//! - **ElementRef**: a selector-bound element handle on a page
//! - **Session**: the (engine, context, page) triple, closed exactly once
//!
//! ## Module layout
//! - `traits`: session traits and option types
//! - `manager`: `SessionManager`, `Session` and teardown reporting
//! - `browser`: isolated context implementation
//! - `page`: page implementation
//! - `element`: element handle implementation
//! - `scripts`: JavaScript snippets run against elements
//! - `mock`: DOM-fixture page for tests
//!
//! ## Example
//! ```rust,no_run
//! use stepwright::session::{BrowserOptions, SessionManager};
//!
//! # async fn example() -> Result<(), stepwright::Error> {
//! let manager = SessionManager::with_process_launcher();
//! let session = manager.open(&BrowserOptions::default()).await?;
//!
//! session.page().navigate("https://example.com").await?;
//!
//! let report = session.close().await;
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod manager;
pub mod browser;
pub mod page;
pub mod element;
pub mod scripts;
pub mod mock;


pub use traits::{
    BrowserContext, PageContext, ElementRef,
    BrowserEngine, BrowserOptions, PageOptions, ScreenshotOptions,
    ElementSnapshot, BoundingBox,
};

// Re-export implementation structs
pub use manager::{Session, SessionManager, TeardownReport, TeardownStep};
pub use browser::BrowserContextImpl;
pub use page::PageContextImpl;
pub use element::ElementRefImpl;

// Re-export mocks for integration tests
pub use mock::{MockElement, MockNode, MockPage};
