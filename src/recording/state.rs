//! Recording state machine

use std::fmt;

/// Lifecycle state of one scenario's recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    /// Never started, or the last start failed
    #[default]
    Idle,
    /// A capture process was started and has not been stopped
    Recording,
    /// The capture process was stopped or exited on its own
    Stopped,
}

/// Event driving a recording's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingEvent {
    Start,
    ProcessExited,
    Stop,
}

impl RecordingState {
    /// State after `event`, or `None` when the event does not apply
    pub fn on(self, event: RecordingEvent) -> Option<RecordingState> {
        use RecordingEvent::*;
        use RecordingState::*;

        match (self, event) {
            (Idle | Stopped, Start) => Some(Recording),
            (Recording, ProcessExited | Stop) => Some(Stopped),
            (Recording, Start) => None,
            (Idle | Stopped, ProcessExited | Stop) => None,
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Stopped => "stopped",
        })
    }
}
