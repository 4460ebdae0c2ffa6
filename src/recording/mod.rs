//! # Recording layer
//!
//! Screen recordings of test scenarios, one capture process per scenario name.
//!
//! ## Lifecycle
//! `Idle -> Recording -> Stopped`, driven by `start`, `stop` and the capture process
//! exiting. Starting a scenario that is already recording does nothing. Stopping a
//! scenario that is not recording logs a warning. The output path stays queryable after
//! the recording stops.
//!
//! ## Module layout
//! - `state`: state machine
//! - `command`: output naming and capture program arguments
//! - `process`: capture process supervision
//! - `manager`: `RecordingManager`
//! - `mock`: mock capture processes for tests
//!
//! ## Example
//! ```rust,no_run
//! use stepwright::recording::{RecordingManager, RecordingOptions};
//!
//! # async fn example() {
//! let recordings = RecordingManager::with_ffmpeg(RecordingOptions::default());
//!
//! recordings.start("Login Flow").await;
//! // ... run the scenario ...
//! recordings.stop("Login Flow").await;
//!
//! if let Some(path) = recordings.get_output_path("Login Flow") {
//!     println!("video: {}", path.display());
//! }
//! # }
//! ```

pub mod state;
pub mod command;
pub mod process;
pub mod manager;
pub mod mock;


pub use state::{RecordingEvent, RecordingState};
pub use command::{output_path, sanitize_name, CaptureCommand, CaptureOptions, Platform};
pub use process::{CaptureProcess, CaptureSpawner, CaptureStatus, FfmpegSpawner};
pub use manager::{RecordingManager, RecordingOptions};
pub use mock::{MockCaptureProcess, MockCaptureSpawner};
