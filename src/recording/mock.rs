//! Mock capture processes for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use crate::recording::command::CaptureCommand;
use crate::recording::process::{CaptureProcess, CaptureSpawner, CaptureStatus};
use crate::{Error, Result};

/// Exit code of a capture program interrupted with SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 255;

/// Mock capture process
#[derive(Debug)]
pub struct MockCaptureProcess {
    pid: u32,
    exits_on_interrupt: bool,
    interrupts: AtomicUsize,
    status: watch::Sender<CaptureStatus>,
}

impl MockCaptureProcess {
    fn new(pid: u32, exits_on_interrupt: bool) -> Self {
        let (status, _) = watch::channel(CaptureStatus::Running);
        Self {
            pid,
            exits_on_interrupt,
            interrupts: AtomicUsize::new(0),
            status,
        }
    }

    /// Number of interrupts received
    pub fn interrupts(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    /// Make the process exit with `code`
    pub fn exit(&self, code: i32) {
        self.status.send_replace(CaptureStatus::Exited(Some(code)));
    }

    pub fn has_exited(&self) -> bool {
        matches!(*self.status.borrow(), CaptureStatus::Exited(_))
    }
}

#[async_trait]
impl CaptureProcess for MockCaptureProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn interrupt(&self) -> Result<()> {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        if self.exits_on_interrupt {
            self.exit(INTERRUPTED_EXIT_CODE);
        }
        Ok(())
    }

    fn status(&self) -> watch::Receiver<CaptureStatus> {
        self.status.subscribe()
    }
}

/// Mock spawner recording every command it was asked to run
#[derive(Debug)]
pub struct MockCaptureSpawner {
    fail: bool,
    exits_on_interrupt: bool,
    spawn_delay: Option<Duration>,
    spawned: Mutex<Vec<(String, CaptureCommand)>>,
    processes: Mutex<Vec<Arc<MockCaptureProcess>>>,
}

impl Default for MockCaptureSpawner {
    fn default() -> Self {
        Self {
            fail: false,
            exits_on_interrupt: true,
            spawn_delay: None,
            spawned: Mutex::new(Vec::new()),
            processes: Mutex::new(Vec::new()),
        }
    }
}

impl MockCaptureSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawner whose spawns always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Spawner whose processes ignore interrupts
    pub fn stubborn() -> Self {
        Self {
            exits_on_interrupt: false,
            ..Self::default()
        }
    }

    /// Take `delay` to bring each process up
    pub fn with_spawn_delay(mut self, delay: Duration) -> Self {
        self.spawn_delay = Some(delay);
        self
    }

    /// Scenario names and commands of every spawn request
    pub fn spawned(&self) -> Vec<(String, CaptureCommand)> {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Processes handed out so far
    pub fn processes(&self) -> Vec<Arc<MockCaptureProcess>> {
        self.processes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CaptureSpawner for MockCaptureSpawner {
    async fn spawn(&self, name: &str, command: &CaptureCommand) -> Result<Arc<dyn CaptureProcess>> {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), command.clone()));

        if let Some(delay) = self.spawn_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(Error::process_spawn(format!("{}: mock failure", command.program)));
        }

        let mut processes = self.processes.lock().unwrap_or_else(PoisonError::into_inner);
        let process = Arc::new(MockCaptureProcess::new(
            10_000 + processes.len() as u32,
            self.exits_on_interrupt,
        ));
        processes.push(Arc::clone(&process));
        Ok(process)
    }
}
