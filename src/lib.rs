//! Stepwright: element resolution, waits and scenario recording for end-to-end UI tests
//!
//! This library drives a browser over the Chrome DevTools Protocol. It resolves prefixed
//! selectors, waits for element state before every interaction, owns the per-run browser
//! session and supervises one screen-capture process per test scenario.

pub mod error;
pub mod config;

pub mod cdp;
pub mod session;
pub mod element;
pub mod recording;

// Re-exports
pub use error::{Error, Result};
pub use config::Config;
pub use element::{resolve, ElementFinder, ElementInteractor, ElementState, WaitTimeouts};
pub use recording::{RecordingManager, RecordingState};
pub use session::{Session, SessionManager, TeardownReport};

/// Stepwright library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
