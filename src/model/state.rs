//! Run state and session health.

use std::fmt;

use serde::Serialize;

/// Where a session stands in its lifecycle.
///
/// Log files are appended to only while `Running` or `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No session. Waiting for Start.
    #[default]
    Idle,

    /// Reading, updating, and recording.
    Running,

    /// Consumption suspended. The port stays open but is not read.
    Paused,

    /// Reading and updating continue; nothing is recorded.
    Stopped,
}

impl RunState {
    /// Whether readings that arrive in this state are written to the logs.
    pub fn is_recording(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A fatal session error. Raised once; the session is stopped when it happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum SessionFault {
    /// A log file could not be appended to.
    Recording(String),

    /// The serial device went away.
    DeviceLost(String),
}

impl fmt::Display for SessionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recording(message) => write!(f, "recording failed: {message}"),
            Self::DeviceLost(message) => write!(f, "device lost: {message}"),
        }
    }
}

/// Counters for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Non-empty lines read from the port.
    pub sentences: u64,
    pub headings: u64,
    pub positions: u64,
    pub parse_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_running_and_paused_record() {
        assert!(RunState::Running.is_recording());
        assert!(RunState::Paused.is_recording());
        assert!(!RunState::Stopped.is_recording());
        assert!(!RunState::Idle.is_recording());
    }
}
