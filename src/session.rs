//! The state of one session, shared between the ingestion thread and the controller.
//!
//! Everything a reading touches lives here behind one mutex: run state,
//! recorder, tracks, and the heading sequence. The ingestion thread is the
//! only writer of readings; commands only change the run state. Holding the
//! lock across a line's raw and derived appends keeps them in arrival order
//! and makes Stop take effect exactly between two lines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use jiff::Timestamp;
use serde::Serialize;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::model::{
    HeadingSample, PositionFix, Reading, RunState, SessionConfig, SessionFault, SessionStats,
    SignalMode, Track, TrackKey, TrackUpdate,
};
use crate::recorder::{RecordError, Recorder};
use crate::sentence::Decoder;
use crate::track::TrackStore;

/// A read-only view of the session for the presentation layer.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub session_id: Option<Uuid>,
    pub state: RunState,
    pub vessel: Option<String>,
    pub mode: Option<SignalMode>,
    pub latest_heading: Option<f64>,
    pub latest_position: Option<PositionFix>,
    /// Every heading of the session, oldest first, for plotting.
    pub headings: Vec<HeadingSample>,
    pub display_target: Option<Track>,
    pub fault: Option<SessionFault>,
    pub stats: SessionStats,
}

pub struct Session {
    id: Uuid,
    config: SessionConfig,
    pub(crate) state: RunState,
    recorder: Recorder,
    decoder: Decoder,
    tracks: TrackStore,
    headings: Vec<HeadingSample>,
    last_at: Option<Timestamp>,
    fault: Option<SessionFault>,
    stats: SessionStats,
}

impl Session {
    /// A fresh, running session with empty in-memory state.
    pub fn start(config: SessionConfig, recorder: Recorder) -> Self {
        Self {
            id: Uuid::new_v4(),
            decoder: Decoder::new(config.mode),
            config,
            state: RunState::Running,
            recorder,
            tracks: TrackStore::new(),
            headings: Vec::new(),
            last_at: None,
            fault: None,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Records, classifies, and applies one non-empty line.
    ///
    /// `at` is clamped so timestamps never go backwards within a session.
    pub fn handle_line(&mut self, line: &str, at: Timestamp) {
        let at = self.last_at.map_or(at, |last| last.max(at));
        self.last_at = Some(at);
        self.stats.sentences += 1;

        if self.state.is_recording() {
            if let Err(e) = self.recorder.record_raw(at, line) {
                self.recording_failed(&e);
            }
        }

        match self.decoder.decode(line) {
            Reading::Heading(heading) => {
                self.tracks
                    .upsert(TrackKey::OwnShip, TrackUpdate::heading(heading), at);
                self.push_heading(at, heading);
            }
            Reading::Position(fix) => {
                self.tracks
                    .upsert(TrackKey::OwnShip, TrackUpdate::position(fix), at);
                self.stats.positions += 1;
            }
            Reading::Ais(report) => {
                let heading = report.heading;
                if report.position.is_some() {
                    self.stats.positions += 1;
                }
                self.tracks
                    .upsert(TrackKey::Mmsi(report.mmsi), report.into(), at);
                if let Some(heading) = heading {
                    self.push_heading(at, heading);
                }
            }
            Reading::Invalid(e) => {
                self.stats.parse_errors += 1;
                warn!(line, error = %e, "skipping malformed sentence");
            }
            Reading::Fragment | Reading::Unrecognized => {}
        }
    }

    fn push_heading(&mut self, at: Timestamp, heading: f64) {
        self.headings.push(HeadingSample { at, heading });
        self.stats.headings += 1;

        if self.state.is_recording() {
            if let Err(e) = self.recorder.record_heading(at, heading) {
                self.recording_failed(&e);
            }
        }
    }

    /// Escalates a recording error once: the session stops recording.
    fn recording_failed(&mut self, e: &RecordError) {
        error!(vessel = %self.config.vessel, error = %e, "recording failed, session stopped");
        self.fault = Some(SessionFault::Recording(e.to_string()));
        self.state = RunState::Stopped;
    }

    /// The device is gone; the session stops and waits for a reconfigure.
    pub fn device_lost(&mut self, reason: String) {
        error!(vessel = %self.config.vessel, port = %self.config.port, %reason, "serial device lost");
        self.fault = Some(SessionFault::DeviceLost(reason));
        self.state = RunState::Stopped;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            session_id: Some(self.id),
            state: self.state,
            vessel: Some(self.config.vessel.clone()),
            mode: Some(self.config.mode),
            latest_heading: self.tracks.latest_heading(),
            latest_position: self.tracks.latest_position(),
            headings: self.headings.clone(),
            display_target: self.tracks.display_target().cloned(),
            fault: self.fault.clone(),
            stats: self.stats,
        }
    }
}

/// A session plus the condition variable that signals run-state changes.
pub struct Shared {
    session: Mutex<Session>,
    changed: Condvar,
}

impl Shared {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            changed: Condvar::new(),
        }
    }

    /// Locks the session. A panic elsewhere doesn't make the state unreadable.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes anything waiting on a state change.
    pub fn notify(&self) {
        self.changed.notify_all();
    }

    /// Waits up to `timeout` for the session to leave `Paused` or for `closed`.
    pub fn wait_while_paused<'a>(
        &self,
        guard: MutexGuard<'a, Session>,
        closed: &AtomicBool,
        timeout: Duration,
    ) -> MutexGuard<'a, Session> {
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |s| {
                s.state == RunState::Paused && !closed.load(Ordering::Acquire)
            })
            .unwrap_or_else(PoisonError::into_inner);
        if guard.state != RunState::Paused {
            debug!(state = %guard.state, "consumption resumed");
        }
        guard
    }
}
