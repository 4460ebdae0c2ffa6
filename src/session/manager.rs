//! Session manager implementation
//!
//! Opens the (engine, isolated context, page) triple for a test run and tears it down
//! exactly once, page first, then context, then engine. A failing teardown step never
//! prevents the next one.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::cdp::launcher::ProcessLauncher;
use crate::cdp::mock::MockEngineLauncher;
use crate::cdp::traits::{CdpBrowser, EngineLauncher};
use crate::element::{ElementInteractor, WaitTimeouts};
use crate::session::browser::BrowserContextImpl;
use crate::session::traits::{BrowserContext, BrowserEngine, BrowserOptions, PageContext, PageOptions};
use crate::Error;

/// Teardown step of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    Page,
    Context,
    Engine,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TeardownStep::Page => "page",
            TeardownStep::Context => "context",
            TeardownStep::Engine => "engine",
        })
    }
}

/// Failures swallowed while closing a session
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub failures: Vec<(TeardownStep, String)>,
}

impl TeardownReport {
    /// Every step succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether `step` failed
    pub fn failed(&self, step: TeardownStep) -> bool {
        self.failures.iter().any(|(s, _)| *s == step)
    }

    fn record(&mut self, step: TeardownStep, result: Result<(), Error>) {
        if let Err(e) = result {
            warn!("Session teardown: closing {} failed: {}", step, e);
            self.failures.push((step, e.to_string()));
        }
    }
}

/// Engine instance, isolated context and page owned by one test run
pub struct Session {
    id: String,
    engine_kind: BrowserEngine,
    engine_version: Option<String>,
    engine: Arc<dyn CdpBrowser>,
    context: Arc<dyn BrowserContext>,
    page: Arc<dyn PageContext>,
    /// Open-session count shared with the manager
    live: Arc<AtomicUsize>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("engine", &self.engine_kind)
            .field("version", &self.engine_version)
            .field("context", &self.context.id())
            .field("page", &self.page.id())
            .finish()
    }
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Engine this session drives
    pub fn engine(&self) -> BrowserEngine {
        self.engine_kind
    }

    /// Product string reported by the engine, e.g. `Chrome/120.0.6099.109`
    pub fn engine_version(&self) -> Option<&str> {
        self.engine_version.as_deref()
    }

    /// The session page
    pub fn page(&self) -> Arc<dyn PageContext> {
        Arc::clone(&self.page)
    }

    /// The isolated context the page lives in
    pub fn context(&self) -> Arc<dyn BrowserContext> {
        Arc::clone(&self.context)
    }

    /// Interaction helpers bound to the session page
    pub fn elements(&self, timeouts: WaitTimeouts) -> ElementInteractor {
        ElementInteractor::new(self.page(), timeouts)
    }

    /// Close page, context and engine, in that order
    ///
    /// Consumes the session so it cannot be closed twice. Failures are logged and reported,
    /// never raised.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn close(self) -> TeardownReport {
        info!("Closing session");
        let mut report = TeardownReport::default();

        report.record(TeardownStep::Page, self.page.close().await);
        report.record(TeardownStep::Context, self.context.close().await);
        report.record(TeardownStep::Engine, self.engine.close().await);

        if report.is_clean() {
            info!("Session closed");
        } else {
            warn!("Session closed with {} swallowed failures", report.failures.len());
        }
        report
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Opens sessions on engines provided by a launcher
pub struct SessionManager {
    launcher: Arc<dyn EngineLauncher>,
    live: Arc<AtomicUsize>,
}

impl SessionManager {
    /// Create a session manager on top of `launcher`
    pub fn new(launcher: Arc<dyn EngineLauncher>) -> Self {
        Self {
            launcher,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Session manager that launches (or attaches to) real engines
    pub fn with_process_launcher() -> Self {
        Self::new(Arc::new(ProcessLauncher::new()))
    }

    /// Session manager backed by mock engines
    pub fn mock() -> Self {
        Self::new(Arc::new(MockEngineLauncher::new()))
    }

    /// Whether a session opened by this manager is still open
    pub fn has_live_session(&self) -> bool {
        self.live.load(Ordering::SeqCst) > 0
    }

    /// Launch an engine, create an isolated context and open one page in it
    ///
    /// The viewport is applied on a best-effort basis; failing to set it is only logged.
    #[instrument(skip(self, options), fields(engine = %options.engine, headless = options.headless))]
    pub async fn open(&self, options: &BrowserOptions) -> Result<Session, Error> {
        if self.live.fetch_add(1, Ordering::SeqCst) > 0 {
            warn!("Opening a session while another one is still open");
        }

        match self.open_parts(options).await {
            Ok((engine, engine_version, context, page)) => {
                let session = Session {
                    id: uuid::Uuid::new_v4().to_string(),
                    engine_kind: options.engine,
                    engine_version,
                    engine,
                    context,
                    page,
                    live: Arc::clone(&self.live),
                };
                info!("Opened session {}", session.id);
                Ok(session)
            }
            Err(e) => {
                self.live.fetch_sub(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn open_parts(&self, options: &BrowserOptions) -> Result<OpenedParts, Error> {
        let engine = self.launcher.launch(options).await?;

        let engine_version = match engine.get_version().await {
            Ok(version) => {
                info!("Engine {} (protocol {})", version.product, version.protocol_version);
                Some(version.product)
            }
            Err(e) => {
                debug!("Engine version unavailable: {}", e);
                None
            }
        };

        let context: Arc<dyn BrowserContext> =
            match BrowserContextImpl::create(Arc::clone(&engine)).await {
                Ok(context) => Arc::new(context),
                Err(e) => {
                    close_quietly(TeardownStep::Engine, engine.close().await);
                    return Err(e);
                }
            };

        let page = match context.create_page(PageOptions::default()).await {
            Ok(page) => page,
            Err(e) => {
                close_quietly(TeardownStep::Context, context.close().await);
                close_quietly(TeardownStep::Engine, engine.close().await);
                return Err(e);
            }
        };

        if let Err(e) = page
            .set_viewport(options.viewport_width, options.viewport_height)
            .await
        {
            warn!(
                "Failed to set viewport {}x{}: {}",
                options.viewport_width, options.viewport_height, e
            );
        }

        Ok((engine, engine_version, context, page))
    }
}

type OpenedParts = (
    Arc<dyn CdpBrowser>,
    Option<String>,
    Arc<dyn BrowserContext>,
    Arc<dyn PageContext>,
);

fn close_quietly(step: TeardownStep, result: Result<(), Error>) {
    if let Err(e) = result {
        warn!("Cleanup after failed open: closing {} failed: {}", step, e);
    }
}
