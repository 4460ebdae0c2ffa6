//! Recording manager implementation
//!
//! One capture process per scenario name. Paths are assigned before the process is spawned
//! and stay queryable after it stops. Start and stop failures are logged, never returned.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::recording::command::{output_path, CaptureCommand, CaptureOptions, Platform};
use crate::recording::process::{wait_for_exit, CaptureProcess, CaptureSpawner, FfmpegSpawner};
use crate::recording::state::{RecordingEvent, RecordingState};
use crate::Error;

/// Recording manager settings
#[derive(Debug, Clone)]
pub struct RecordingOptions {
    /// Directory receiving the recordings, created on first use
    pub output_dir: PathBuf,
    /// Upper bound on the wait for a capture process to exit after interrupt
    pub grace_period: Duration,
    pub capture: CaptureOptions,
    /// Platform to build capture commands for; `None` disables recording
    pub platform: Option<Platform>,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            grace_period: Duration::from_millis(3_000),
            capture: CaptureOptions::default(),
            platform: Platform::current(),
        }
    }
}

struct Entry {
    state: RecordingState,
    /// Bumped on every start so late exit notifications can be told apart
    generation: u64,
    process: Option<Arc<dyn CaptureProcess>>,
    /// Set once `stop` has taken the process and is waiting for it to exit
    stopping: bool,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<String, Entry>,
    paths: HashMap<String, PathBuf>,
    next_generation: u64,
}

impl Registry {
    fn state(&self, name: &str) -> RecordingState {
        self.entries
            .get(name)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// Apply `event` to the entry if it is still at `generation`
    fn transition(&mut self, name: &str, generation: u64, event: RecordingEvent) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) if entry.generation == generation => match entry.state.on(event) {
                Some(next) => {
                    debug!("Recording '{}': {} -> {}", name, entry.state, next);
                    entry.state = next;
                    entry.process = None;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

/// A started recording that can still be rolled back
struct Reservation {
    generation: u64,
    previous_state: RecordingState,
    previous_path: Option<PathBuf>,
    path: PathBuf,
}

/// Supervises one capture process per scenario name
pub struct RecordingManager {
    options: RecordingOptions,
    spawner: Arc<dyn CaptureSpawner>,
    registry: Arc<Mutex<Registry>>,
}

impl RecordingManager {
    pub fn new(options: RecordingOptions, spawner: Arc<dyn CaptureSpawner>) -> Self {
        Self {
            options,
            spawner,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Recording manager spawning the real capture program
    pub fn with_ffmpeg(options: RecordingOptions) -> Self {
        Self::new(options, Arc::new(FfmpegSpawner::new()))
    }

    pub fn options(&self) -> &RecordingOptions {
        &self.options
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start recording scenario `name`
    ///
    /// Does nothing while `name` is already recording. Failures leave the scenario in its
    /// previous state and are only logged.
    #[instrument(skip(self))]
    pub async fn start(&self, name: &str) {
        let Some(platform) = self.options.platform else {
            error!(
                "Not recording '{}': {}",
                name,
                Error::unsupported_platform(std::env::consts::OS)
            );
            return;
        };

        let Some(reservation) = self.reserve(name) else {
            debug!("'{}' is already recording", name);
            return;
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.options.output_dir).await {
            error!(
                "Not recording '{}': cannot create {}: {}",
                name,
                self.options.output_dir.display(),
                e
            );
            self.roll_back(name, reservation);
            return;
        }

        let command = CaptureCommand::build(platform, &self.options.capture, &reservation.path);
        let process = match self.spawner.spawn(name, &command).await {
            Ok(process) => process,
            Err(e) => {
                error!("Not recording '{}': {}", name, e);
                self.roll_back(name, reservation);
                return;
            }
        };

        if !self.attach(name, reservation.generation, Arc::clone(&process)) {
            // Stopped while the process was starting
            if let Err(e) = process.interrupt().await {
                warn!("Failed to interrupt capture for '{}': {}", name, e);
            }
            return;
        }

        self.watch_exit(name, reservation.generation, process.as_ref());
        info!("Recording '{}' to {}", name, reservation.path.display());
    }

    /// Move `name` to Recording and assign its output path, before anything is spawned
    fn reserve(&self, name: &str) -> Option<Reservation> {
        let mut registry = self.registry();
        let previous_state = registry.state(name);
        previous_state.on(RecordingEvent::Start)?;

        let previous_path = registry.paths.get(name).cloned();
        let path = self.unique_path(name, &registry);

        registry.next_generation += 1;
        let generation = registry.next_generation;
        registry.entries.insert(
            name.to_string(),
            Entry {
                state: RecordingState::Recording,
                generation,
                process: None,
                stopping: false,
            },
        );
        registry.paths.insert(name.to_string(), path.clone());

        Some(Reservation {
            generation,
            previous_state,
            previous_path,
            path,
        })
    }

    /// Output path not assigned to any scenario yet
    fn unique_path(&self, name: &str, registry: &Registry) -> PathBuf {
        let extension = &self.options.capture.extension;
        let mut epoch_ms = chrono::Utc::now().timestamp_millis();
        loop {
            let path = output_path(&self.options.output_dir, name, epoch_ms, extension);
            if !registry.paths.values().any(|assigned| *assigned == path) {
                return path;
            }
            epoch_ms += 1;
        }
    }

    fn roll_back(&self, name: &str, reservation: Reservation) {
        let mut registry = self.registry();
        let current = registry
            .entries
            .get(name)
            .map(|entry| entry.generation == reservation.generation)
            .unwrap_or(false);
        if !current {
            return;
        }

        match reservation.previous_state {
            RecordingState::Idle => {
                registry.entries.remove(name);
            }
            state => {
                if let Some(entry) = registry.entries.get_mut(name) {
                    entry.state = state;
                }
            }
        }

        match reservation.previous_path {
            Some(path) => registry.paths.insert(name.to_string(), path),
            None => registry.paths.remove(name),
        };
    }

    fn attach(&self, name: &str, generation: u64, process: Arc<dyn CaptureProcess>) -> bool {
        let mut registry = self.registry();
        match registry.entries.get_mut(name) {
            Some(entry) if entry.generation == generation && entry.state == RecordingState::Recording => {
                entry.process = Some(process);
                true
            }
            _ => false,
        }
    }

    /// Mark the recording stopped when its process exits on its own
    fn watch_exit(&self, name: &str, generation: u64, process: &dyn CaptureProcess) {
        let status = process.status();
        let registry = Arc::clone(&self.registry);
        let name = name.to_string();

        tokio::spawn(async move {
            let code = wait_for_exit(status).await;
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);

            // A process taken by `stop` is no longer ours to report
            let supervised = registry
                .entries
                .get(&name)
                .is_some_and(|entry| entry.generation == generation && entry.process.is_some());
            if supervised && registry.transition(&name, generation, RecordingEvent::ProcessExited) {
                warn!("Capture for '{}' exited on its own with code {:?}", name, code);
            }
        });
    }

    /// Stop recording scenario `name`
    ///
    /// Interrupts the capture process and waits for it to exit, at most for the grace
    /// period. The output path stays assigned.
    #[instrument(skip(self))]
    pub async fn stop(&self, name: &str) {
        let taken = {
            let mut registry = self.registry();
            let Some(entry) = registry
                .entries
                .get_mut(name)
                .filter(|entry| entry.state == RecordingState::Recording && !entry.stopping)
            else {
                warn!("No active recording for '{}'", name);
                return;
            };

            let generation = entry.generation;
            match entry.process.take() {
                Some(process) => {
                    entry.stopping = true;
                    Some((generation, process))
                }
                None => {
                    // Still spawning; `start` interrupts the process once it is up
                    registry.transition(name, generation, RecordingEvent::Stop);
                    None
                }
            }
        };
        let Some((generation, process)) = taken else {
            info!("Recording '{}' stopped before its capture process started", name);
            return;
        };

        let status = process.status();
        if let Err(e) = process.interrupt().await {
            warn!("Failed to interrupt capture for '{}': {}", name, e);
        }

        match tokio::time::timeout(self.options.grace_period, wait_for_exit(status)).await {
            Ok(code) => info!("Recording '{}' finished with code {:?}", name, code),
            Err(_) => warn!(
                "Capture for '{}' still running after {}ms",
                name,
                self.options.grace_period.as_millis()
            ),
        }

        self.registry()
            .transition(name, generation, RecordingEvent::Stop);
    }

    /// Stop every active recording
    pub async fn stop_all(&self) {
        let names: Vec<String> = {
            let registry = self.registry();
            registry
                .entries
                .iter()
                .filter(|(_, entry)| entry.state == RecordingState::Recording && !entry.stopping)
                .map(|(name, _)| name.clone())
                .collect()
        };

        futures::future::join_all(names.iter().map(|name| self.stop(name))).await;
    }

    /// Output path assigned to the latest recording of `name`
    pub fn get_output_path(&self, name: &str) -> Option<PathBuf> {
        self.registry().paths.get(name).cloned()
    }

    pub fn state(&self, name: &str) -> RecordingState {
        self.registry().state(name)
    }

    pub fn is_recording(&self, name: &str) -> bool {
        self.state(name) == RecordingState::Recording
    }

    /// Number of scenarios currently recording
    pub fn active_count(&self) -> usize {
        self.registry()
            .entries
            .values()
            .filter(|entry| entry.state == RecordingState::Recording)
            .count()
    }
}
