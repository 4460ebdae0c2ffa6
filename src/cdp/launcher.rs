//! Engine process launcher
//!
//! Starts a browser engine with remote debugging enabled, or attaches to one that is
//! already running when an endpoint is configured.

use super::browser::CdpBrowserImpl;
use super::traits::{CdpBrowser, EngineLauncher};
use crate::session::{BrowserEngine, BrowserOptions};
use crate::Error;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

/// How long an engine gets to exit after `Browser.close` before it is killed
const EXIT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// An engine process owned by this crate, with its throwaway profile
#[derive(Debug)]
pub struct EngineProcess {
    child: Child,
    profile_dir: Option<PathBuf>,
}

impl EngineProcess {
    pub fn new(child: Child, profile_dir: Option<PathBuf>) -> Self {
        Self { child, profile_dir }
    }

    /// Reap the process and delete its profile directory
    pub async fn shutdown(mut self) -> Result<(), Error> {
        match tokio::time::timeout(EXIT_GRACE_PERIOD, self.child.wait()).await {
            Ok(Ok(status)) => debug!("Engine process exited with {}", status),
            Ok(Err(e)) => warn!("Failed to wait for engine process: {}", e),
            Err(_) => {
                warn!("Engine process did not exit in {:?}, killing it", EXIT_GRACE_PERIOD);
                if let Err(e) = self.child.kill().await {
                    return Err(Error::cleanup(format!("Failed to kill engine process: {}", e)));
                }
            }
        }

        if let Some(dir) = self.profile_dir.take() {
            remove_profile_dir(&dir).await?;
        }
        Ok(())
    }
}

async fn remove_profile_dir(dir: &Path) -> Result<(), Error> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::cleanup(format!(
            "Failed to remove profile directory {}: {}",
            dir.display(),
            e
        ))),
    }
}

/// Launches engine executables found on the host
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

/// Executables tried in order when no explicit path is configured
pub fn default_executables(engine: BrowserEngine) -> Vec<String> {
    let mut candidates: Vec<&str> = match engine {
        BrowserEngine::Chromium => vec![
            "chromium",
            "chromium-browser",
            "google-chrome",
            "google-chrome-stable",
        ],
        // Stock Firefox (129+) and WebKit builds no longer speak CDP; a path or endpoint
        // must be configured
        BrowserEngine::Firefox | BrowserEngine::Webkit => vec![],
    };

    if cfg!(target_os = "macos") && engine == BrowserEngine::Chromium {
        candidates.push("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        candidates.push("/Applications/Chromium.app/Contents/MacOS/Chromium");
    }

    candidates.into_iter().map(String::from).collect()
}

/// Command-line arguments for an engine launch
pub fn build_launch_args(options: &BrowserOptions, profile_dir: &Path) -> Vec<String> {
    let mut args = vec!["--remote-debugging-port=0".to_string()];

    match options.engine {
        BrowserEngine::Chromium => {
            args.push(format!("--user-data-dir={}", profile_dir.display()));
            args.push("--no-first-run".to_string());
            args.push("--no-default-browser-check".to_string());
            args.push("--disable-background-networking".to_string());
            args.push(format!(
                "--window-size={},{}",
                options.viewport_width, options.viewport_height
            ));
            if options.headless {
                args.push("--headless=new".to_string());
            }
        }
        BrowserEngine::Firefox => {
            args.push("--profile".to_string());
            args.push(profile_dir.display().to_string());
            args.push("--no-remote".to_string());
            args.push(format!(
                "--window-size={},{}",
                options.viewport_width, options.viewport_height
            ));
            if options.headless {
                args.push("--headless".to_string());
            }
        }
        BrowserEngine::Webkit => {
            if options.headless {
                args.push("--headless".to_string());
            }
        }
    }

    args.extend(options.args.iter().cloned());
    args.push("about:blank".to_string());
    args
}

/// Extract the browser WebSocket URL from an engine's stderr line
///
/// Engines announce themselves with `DevTools listening on ws://...`. WebDriver BiDi
/// announcements are not CDP endpoints and yield `None`.
pub fn parse_devtools_line(line: &str) -> Option<String> {
    if is_bidi_announcement(line) {
        return None;
    }
    let marker = line.find("listening on ")?;
    let rest = line[marker + "listening on ".len()..].trim();
    if rest.starts_with("ws://") || rest.starts_with("wss://") {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Whether the engine announced a WebDriver BiDi endpoint instead of CDP
pub fn is_bidi_announcement(line: &str) -> bool {
    line.contains("WebDriver BiDi listening on ")
}

async fn read_devtools_url<R>(mut lines: Lines<R>) -> Result<(String, Lines<R>), Error>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        trace!("engine: {}", line);
        if is_bidi_announcement(&line) {
            return Err(Error::launch(
                "Engine only offers WebDriver BiDi, not CDP; point E2E_BROWSER_PATH at a CDP-capable build or use E2E_CDP_ENDPOINT",
            ));
        }
        if let Some(url) = parse_devtools_line(&line) {
            return Ok((url, lines));
        }
    }
    Err(Error::launch("Engine exited before announcing a DevTools endpoint"))
}

fn spawn_engine(program: &str, args: &[String]) -> std::io::Result<Child> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

#[async_trait]
impl EngineLauncher for ProcessLauncher {
    async fn launch(&self, options: &BrowserOptions) -> Result<Arc<dyn CdpBrowser>, Error> {
        if let Some(endpoint) = &options.cdp_endpoint {
            info!("Attaching to running {} at {}", options.engine, endpoint);
            let browser = CdpBrowserImpl::connect(endpoint).await?;
            return Ok(Arc::new(browser));
        }

        let candidates = match &options.executable_path {
            Some(path) => vec![path.clone()],
            None => default_executables(options.engine),
        };
        if candidates.is_empty() {
            return Err(Error::configuration(format!(
                "No default executable for {}; set E2E_BROWSER_PATH or E2E_CDP_ENDPOINT",
                options.engine
            )));
        }

        let profile_dir = std::env::temp_dir().join(format!(
            "stepwright-profile-{}",
            uuid::Uuid::new_v4()
        ));
        tokio::fs::create_dir_all(&profile_dir).await?;

        let args = build_launch_args(options, &profile_dir);

        let mut spawned = None;
        for program in &candidates {
            match spawn_engine(program, &args) {
                Ok(child) => {
                    info!("Launched {} from {}", options.engine, program);
                    spawned = Some(child);
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Engine executable {} not found", program);
                }
                Err(e) => {
                    let _ = remove_profile_dir(&profile_dir).await;
                    return Err(Error::launch(format!("Failed to start {}: {}", program, e)));
                }
            }
        }

        let Some(mut child) = spawned else {
            let _ = remove_profile_dir(&profile_dir).await;
            return Err(Error::launch(format!(
                "No {} executable found (tried {})",
                options.engine,
                candidates.join(", ")
            )));
        };

        let Some(stderr) = child.stderr.take() else {
            let _ = child.kill().await;
            let _ = remove_profile_dir(&profile_dir).await;
            return Err(Error::launch("Engine stderr was not captured"));
        };

        let launch_timeout = Duration::from_millis(options.launch_timeout_ms);
        let lines = BufReader::new(stderr).lines();

        let announced = match tokio::time::timeout(launch_timeout, read_devtools_url(lines)).await {
            Ok(result) => result,
            Err(_) => Err(Error::launch(format!(
                "Engine did not announce a DevTools endpoint within {:?}",
                launch_timeout
            ))),
        };

        let (ws_url, mut lines) = match announced {
            Ok(found) => found,
            Err(e) => {
                let _ = child.kill().await;
                let _ = remove_profile_dir(&profile_dir).await;
                return Err(e);
            }
        };

        // Keep the pipe drained so the engine never blocks on a full stderr
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                trace!("engine: {}", line);
            }
        });

        let process = EngineProcess::new(child, Some(profile_dir));
        match CdpBrowserImpl::connect(&ws_url).await {
            Ok(browser) => Ok(Arc::new(browser.with_process(process))),
            Err(e) => {
                if let Err(cleanup) = process.shutdown().await {
                    warn!("Failed to clean up engine after connect error: {}", cleanup);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devtools_line() {
        assert_eq!(
            parse_devtools_line("DevTools listening on ws://127.0.0.1:41235/devtools/browser/abc"),
            Some("ws://127.0.0.1:41235/devtools/browser/abc".to_string())
        );
        assert_eq!(parse_devtools_line("[WARNING] something unrelated"), None);
        assert_eq!(parse_devtools_line("Server listening on port 80"), None);
    }

    #[test]
    fn test_bidi_announcement_is_not_a_devtools_endpoint() {
        let line = "WebDriver BiDi listening on ws://127.0.0.1:9222";
        assert!(is_bidi_announcement(line));
        assert_eq!(parse_devtools_line(line), None);
        assert!(!is_bidi_announcement("DevTools listening on ws://127.0.0.1:9222/devtools/browser/abc"));
    }

    #[test]
    fn test_chromium_args() {
        let options = BrowserOptions::default();
        let args = build_launch_args(&options, Path::new("/tmp/profile"));

        assert_eq!(args[0], "--remote-debugging-port=0");
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--window-size=1366,768".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_headed_firefox_args() {
        let options = BrowserOptions {
            engine: BrowserEngine::Firefox,
            headless: false,
            args: vec!["--private".to_string()],
            ..Default::default()
        };
        let args = build_launch_args(&options, Path::new("/tmp/profile"));

        assert!(args.contains(&"--no-remote".to_string()));
        assert!(args.contains(&"--private".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn test_webkit_and_firefox_have_no_default_executable() {
        assert!(default_executables(BrowserEngine::Webkit).is_empty());
        assert!(default_executables(BrowserEngine::Firefox).is_empty());
        assert!(!default_executables(BrowserEngine::Chromium).is_empty());
    }

    #[tokio::test]
    async fn test_webkit_without_path_is_configuration_error() {
        let options = BrowserOptions {
            engine: BrowserEngine::Webkit,
            ..Default::default()
        };
        let result = ProcessLauncher::new().launch(&options).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_firefox_without_path_is_configuration_error() {
        let options = BrowserOptions {
            engine: BrowserEngine::Firefox,
            ..Default::default()
        };
        let result = ProcessLauncher::new().launch(&options).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_read_devtools_url_skips_noise() {
        let stderr: &[u8] = b"[WARNING] sandbox disabled\nDevTools listening on ws://127.0.0.1:41235/devtools/browser/abc\n";
        let (url, _) = read_devtools_url(BufReader::new(stderr).lines()).await.unwrap();
        assert_eq!(url, "ws://127.0.0.1:41235/devtools/browser/abc");
    }

    #[tokio::test]
    async fn test_bidi_only_engine_is_launch_error() {
        let stderr: &[u8] = b"WebDriver BiDi listening on ws://127.0.0.1:9222\n";
        let result = read_devtools_url(BufReader::new(stderr).lines()).await;
        assert!(matches!(result, Err(Error::Launch(msg)) if msg.contains("BiDi")));
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_error() {
        let options = BrowserOptions {
            executable_path: Some("/nonexistent/stepwright-engine".to_string()),
            ..Default::default()
        };
        let result = ProcessLauncher::new().launch(&options).await;
        assert!(matches!(result, Err(Error::Launch(_))));
    }
}
