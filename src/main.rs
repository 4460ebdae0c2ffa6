//! # Stepwright smoke check
//!
//! Runs the login scenario against a live site with recording enabled, prints the recording
//! path and tears the session down. Exits non-zero when the scenario fails.
//!
//! ## Environment variables
//! - `E2E_BASE_URL`: site under test (default: https://www.saucedemo.com/)
//! - `E2E_BROWSER`, `HEADLESS`, `E2E_RECORDINGS_DIR`, ...: see `Config::from_env`
//! - `RUST_LOG`: log filter, overrides `E2E_LOG_LEVEL`

use anyhow::Context;
use stepwright::{
    element::{ElementInteractor, WaitTimeouts},
    recording::RecordingManager,
    session::SessionManager,
    Config,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE_URL: &str = "https://www.saucedemo.com/";
const SCENARIO: &str = "Smoke Login";
const USERNAME: &str = "standard_user";
const PASSWORD: &str = "secret_sauce";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Stepwright smoke v{}", stepwright::VERSION);

    let base_url = std::env::var("E2E_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    info!("Engine {} (headless: {}) against {}", config.browser, config.headless, base_url);

    let sessions = SessionManager::with_process_launcher();
    let session = sessions
        .open(&config.browser_options())
        .await
        .context("failed to open browser session")?;

    let recordings = RecordingManager::with_ffmpeg(config.recording_options());
    recordings.start(SCENARIO).await;

    let elements = session.elements(config.wait_timeouts());
    let outcome = tokio::select! {
        result = login(&elements, &base_url) => result.map_err(anyhow::Error::from),
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("interrupted")),
    };

    recordings.stop(SCENARIO).await;
    match recordings.get_output_path(SCENARIO) {
        Some(path) => println!("recording: {}", path.display()),
        None => println!("recording: none"),
    }

    let report = session.close().await;
    if !report.is_clean() {
        warn!("Teardown swallowed {} failures", report.failures.len());
    }

    match outcome {
        Ok(url) => {
            info!("Logged in, landed on {}", url);
            Ok(())
        }
        Err(e) => {
            error!("Scenario failed: {:#}", e);
            Err(e)
        }
    }
}

/// Log in with the demo credentials and wait for the inventory page
async fn login(elements: &ElementInteractor, base_url: &str) -> stepwright::Result<String> {
    let inventory = format!("{}/inventory.html", base_url.trim_end_matches('/'));

    elements.navigate(base_url).await?;
    elements.fill("id:user-name", USERNAME).await?;
    elements.fill("id:password", PASSWORD).await?;
    elements.click("id:login-button").await?;
    elements
        .wait_for_url(&inventory, Some(WaitTimeouts::default().url))
        .await
}
