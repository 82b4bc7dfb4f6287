//! Core data model for the recorder.
//!
//! These types describe what flows through a session: the operator's
//! configuration, the readings parsed from each sentence, the tracks and
//! heading samples derived from them, and the run state that gates recording.

mod reading;
mod session;
mod state;
mod track;

pub use reading::{AisReport, ParseError, PositionFix, Reading};
pub use session::{BaudRate, ConfigError, SessionConfig, SignalMode};
pub use state::{RunState, SessionFault, SessionStats};
pub use track::{HeadingSample, Track, TrackKey, TrackUpdate};
