//! Configuration management for Stepwright
//!
//! Values are read once, when a run starts. Environment variables override the defaults;
//! a TOML file can be used instead of the environment.

use crate::element::WaitTimeouts;
use crate::recording::{CaptureOptions, RecordingOptions};
use crate::session::{BrowserEngine, BrowserOptions};
use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Engine hint variables, highest precedence first
pub const BROWSER_ENV_VARS: [&str; 3] = ["E2E_BROWSER", "PW_BROWSER", "PLAYWRIGHT_BROWSER"];

/// Runtime configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Browser engine to drive
    pub browser: BrowserEngine,

    /// Launch the engine without a window
    pub headless: bool,

    /// Engine executable path
    pub executable_path: Option<String>,

    /// DevTools endpoint of an already running engine
    pub cdp_endpoint: Option<String>,

    /// Default viewport width
    pub viewport_width: u32,

    /// Default viewport height
    pub viewport_height: u32,

    /// Timeout for visibility, attachment and hidden waits in milliseconds
    pub default_timeout: u64,

    /// Timeout for boolean presence/enabled/visible checks in milliseconds
    pub check_timeout: u64,

    /// Directory that receives scenario recordings
    pub recordings_dir: PathBuf,

    /// Screen capture program
    pub capture_program: String,

    /// Upper bound on the wait for a capture process to exit after interrupt, in milliseconds
    pub stop_grace_period: u64,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserEngine::Chromium,
            headless: true,
            executable_path: None,
            cdp_endpoint: None,
            viewport_width: 1366,
            viewport_height: 768,
            default_timeout: 10_000,
            check_timeout: 5_000,
            recordings_dir: PathBuf::from("recordings"),
            capture_program: "ffmpeg".to_string(),
            stop_grace_period: 3_000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        config.browser = select_engine(&lookup);

        // Only the literal "false" turns headless mode off
        if let Some(headless) = lookup("HEADLESS") {
            config.headless = headless != "false";
        }

        if let Some(path) = non_empty(lookup("E2E_BROWSER_PATH")) {
            config.executable_path = Some(path);
        }

        if let Some(endpoint) = non_empty(lookup("E2E_CDP_ENDPOINT")) {
            config.cdp_endpoint = Some(endpoint);
        }

        if let Some(viewport) = non_empty(lookup("E2E_VIEWPORT")) {
            let (width, height) = parse_viewport(&viewport)?;
            config.viewport_width = width;
            config.viewport_height = height;
        }

        if let Some(timeout) = non_empty(lookup("E2E_DEFAULT_TIMEOUT")) {
            config.default_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid E2E_DEFAULT_TIMEOUT"))?;
        }

        if let Some(timeout) = non_empty(lookup("E2E_CHECK_TIMEOUT")) {
            config.check_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid E2E_CHECK_TIMEOUT"))?;
        }

        if let Some(dir) = non_empty(lookup("E2E_RECORDINGS_DIR")) {
            config.recordings_dir = PathBuf::from(dir);
        }

        if let Some(program) = non_empty(lookup("E2E_FFMPEG_PATH")) {
            config.capture_program = program;
        }

        if let Some(log_level) = non_empty(lookup("E2E_LOG_LEVEL")) {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Options used to open the session
    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            engine: self.browser,
            headless: self.headless,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            executable_path: self.executable_path.clone(),
            cdp_endpoint: self.cdp_endpoint.clone(),
            ..Default::default()
        }
    }

    /// Timeouts used by the element waiter and interaction helpers
    pub fn wait_timeouts(&self) -> WaitTimeouts {
        WaitTimeouts {
            wait: Duration::from_millis(self.default_timeout),
            check: Duration::from_millis(self.check_timeout),
            ..Default::default()
        }
    }

    /// Options used by the recording manager
    pub fn recording_options(&self) -> RecordingOptions {
        RecordingOptions {
            output_dir: self.recordings_dir.clone(),
            grace_period: Duration::from_millis(self.stop_grace_period),
            capture: CaptureOptions {
                program: self.capture_program.clone(),
                video_size: Some((self.viewport_width, self.viewport_height)),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Pick the engine from the first non-empty hint variable
fn select_engine<F>(lookup: &F) -> BrowserEngine
where
    F: Fn(&str) -> Option<String>,
{
    let hint = BROWSER_ENV_VARS
        .iter()
        .find_map(|name| non_empty(lookup(name)));

    match hint {
        Some(hint) => BrowserEngine::from_hint(&hint).unwrap_or_else(|| {
            tracing::warn!("Unrecognized browser '{}', falling back to chromium", hint);
            BrowserEngine::Chromium
        }),
        None => BrowserEngine::Chromium,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_viewport(value: &str) -> Result<(u32, u32)> {
    let invalid = || Error::configuration(format!("Invalid E2E_VIEWPORT '{}'", value));
    let (width, height) = value.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width = width.trim().parse().map_err(|_| invalid())?;
    let height = height.trim().parse().map_err(|_| invalid())?;
    Ok((width, height))
}
