//! Capture process supervision
//!
//! Spawns the capture program, follows its progress output and publishes its exit on a
//! `watch` channel so `stop` can wait for the real exit.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, Command};
use tokio::sync::{watch, Mutex};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::recording::command::CaptureCommand;
use crate::{Error, Result};

/// Minimum delay between two "recording in progress" log lines
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Run state of a capture process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Running,
    /// Exit code, absent when the process was killed by a signal or could not be waited on
    Exited(Option<i32>),
}

/// A running capture process
#[async_trait]
pub trait CaptureProcess: Send + Sync {
    /// OS process id
    fn pid(&self) -> Option<u32>;

    /// Ask the process to finalize its output and exit
    async fn interrupt(&self) -> Result<()>;

    /// Run state, updated when the process exits
    fn status(&self) -> watch::Receiver<CaptureStatus>;
}

/// Starts capture processes
#[async_trait]
pub trait CaptureSpawner: Send + Sync {
    /// Spawn `command` for the scenario `name`
    async fn spawn(&self, name: &str, command: &CaptureCommand) -> Result<Arc<dyn CaptureProcess>>;
}

/// Wait until `status` reports an exit, returning the exit code
///
/// A sender dropped without reporting counts as an exit without code.
pub async fn wait_for_exit(mut status: watch::Receiver<CaptureStatus>) -> Option<i32> {
    loop {
        let current = *status.borrow_and_update();
        if let CaptureStatus::Exited(code) = current {
            return code;
        }
        if status.changed().await.is_err() {
            return None;
        }
    }
}

/// Throttle for progress heartbeats
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    last: Option<Instant>,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// Whether `line` is progress output that should be logged at `now`
    pub fn observe(&mut self, line: &str, now: Instant) -> bool {
        if !line.trim_start().starts_with("frame=") {
            return false;
        }

        let due = self
            .last
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }
}

/// Split complete lines off `pending`
///
/// Progress output is terminated by `\r`, regular output by `\n`; both end a line.
fn drain_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(end) = pending.iter().position(|b| *b == b'\r' || *b == b'\n') {
        let line: Vec<u8> = pending.drain(..=end).collect();
        let text = String::from_utf8_lossy(&line[..line.len() - 1]).trim().to_string();
        if !text.is_empty() {
            lines.push(text);
        }
    }
    lines
}

/// Capture process spawned through `tokio::process`
pub struct FfmpegProcess {
    pid: Option<u32>,
    stdin: Mutex<Option<ChildStdin>>,
    status: watch::Receiver<CaptureStatus>,
}

impl FfmpegProcess {
    #[cfg(unix)]
    fn signal_interrupt(&self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let pid = self
            .pid
            .ok_or_else(|| Error::internal("Capture process has no pid"))?;
        kill(Pid::from_raw(pid as i32), Signal::SIGINT)
            .map_err(|e| Error::internal(format!("SIGINT to {} failed: {}", pid, e)))
    }

    #[cfg(not(unix))]
    fn signal_interrupt(&self) -> Result<()> {
        Err(Error::unsupported_platform("signals"))
    }

    /// Ask the capture program to quit through its interactive `q` command
    async fn quit_via_stdin(&self) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        match stdin.as_mut() {
            Some(pipe) => {
                pipe.write_all(b"q").await?;
                pipe.flush().await?;
                Ok(())
            }
            None => Err(Error::internal("Capture process stdin is closed")),
        }
    }
}

#[async_trait]
impl CaptureProcess for FfmpegProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    async fn interrupt(&self) -> Result<()> {
        if matches!(*self.status.borrow(), CaptureStatus::Exited(_)) {
            return Ok(());
        }

        match self.signal_interrupt() {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Falling back to stdin quit: {}", e);
                self.quit_via_stdin().await
            }
        }
    }

    fn status(&self) -> watch::Receiver<CaptureStatus> {
        self.status.clone()
    }
}

/// Spawns the capture program as a child process
#[derive(Debug, Default)]
pub struct FfmpegSpawner;

impl FfmpegSpawner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CaptureSpawner for FfmpegSpawner {
    async fn spawn(&self, name: &str, command: &CaptureCommand) -> Result<Arc<dyn CaptureProcess>> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::process_spawn(format!("{}: {}", command.program, e)))?;

        let pid = child.id();
        let stdin = child.stdin.take();
        let (tx, rx) = watch::channel(CaptureStatus::Running);

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(follow_progress(name.to_string(), stderr));
        }

        let scenario = name.to_string();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => {
                    info!("Capture for '{}' exited with code {:?}", scenario, status.code());
                    status.code()
                }
                Err(e) => {
                    error!("Failed to wait on capture for '{}': {}", scenario, e);
                    None
                }
            };
            tx.send_replace(CaptureStatus::Exited(code));
        });

        debug!("Spawned {} (pid {:?}) for '{}'", command.program, pid, name);

        Ok(Arc::new(FfmpegProcess {
            pid,
            stdin: Mutex::new(stdin),
            status: rx,
        }))
    }
}

/// Log a throttled heartbeat on progress output and surface error lines
async fn follow_progress(name: String, mut stderr: ChildStderr) {
    let mut heartbeat = Heartbeat::new(HEARTBEAT_INTERVAL);
    let mut pending = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = match stderr.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) => {
                error!("Reading capture output for '{}' failed: {}", name, e);
                break;
            }
        };
        pending.extend_from_slice(&chunk[..read]);

        for line in drain_lines(&mut pending) {
            if heartbeat.observe(&line, Instant::now()) {
                info!("Recording in progress for '{}'", name);
            } else if line.to_ascii_lowercase().contains("error") {
                warn!("Capture for '{}': {}", name, line);
            } else {
                debug!("Capture for '{}': {}", name, line);
            }
        }
    }
}
