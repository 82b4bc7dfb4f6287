//! The lifecycle controller: one session at a time, driven by operator commands.
//!
//! ```text
//!          start                pause
//!   Idle ─────────▶ Running ◀─────────▶ Paused
//!    ▲                 │        resume     │
//!    │                 └──── stop ────┬────┘
//!    │                                ▼
//!    └────────── reconfigure ──── Stopped
//! ```
//!
//! Reconfigure works from any state and is the way out of Stopped. Exit
//! (or dropping the controller) tears the session down the same way.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::ingest::IngestLoop;
use crate::ingest::link::{ConnectError, Connector};
use crate::model::{ConfigError, RunState, SessionConfig};
use crate::recorder::{RecordError, Recorder};
use crate::session::{Session, Shared};

pub use crate::session::Snapshot;

/// Why a command was refused.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    PortUnavailable(#[from] ConnectError),

    #[error("cannot open log files: {0}")]
    Recording(#[from] RecordError),

    #[error("a session is already active, reconfigure first")]
    SessionActive,

    #[error("no session is running")]
    NotRunning,

    #[error("cannot {command} a {state} session")]
    InvalidTransition {
        command: &'static str,
        state: RunState,
    },

    #[error("cannot start ingestion: {0}")]
    Spawn(io::Error),
}

struct Active {
    shared: Arc<Shared>,
    ingest: IngestLoop,
}

/// Owns the current session and the connector used to open ports.
pub struct Helm {
    connector: Box<dyn Connector>,
    read_timeout: Duration,
    active: Option<Active>,
}

impl Helm {
    /// `read_timeout` bounds every port read, and so how quickly the
    /// ingestion loop notices a command.
    pub fn new(connector: Box<dyn Connector>, read_timeout: Duration) -> Self {
        Self {
            connector,
            read_timeout,
            active: None,
        }
    }

    /// Opens the port and log files and starts ingesting.
    ///
    /// Nothing is opened if the configuration is invalid, and nothing is
    /// left open if any step fails.
    pub fn start(&mut self, config: SessionConfig) -> Result<(), CommandError> {
        if self.active.is_some() {
            return Err(CommandError::SessionActive);
        }
        config.validate()?;

        let port = self
            .connector
            .open(&config.port, config.baud, self.read_timeout)?;
        let recorder = Recorder::open(&config.raw_log_path(), &config.heading_log_path())?;

        let vessel = config.vessel.clone();
        info!(
            %vessel,
            port = %config.port,
            baud = %config.baud,
            mode = %config.mode,
            "starting session"
        );
        let session = Session::start(config, recorder);
        let id = session.id();
        let shared = Arc::new(Shared::new(session));
        let ingest = IngestLoop::spawn(port, Arc::clone(&shared), &vessel, self.read_timeout)
            .map_err(CommandError::Spawn)?;

        info!(%vessel, session = %id, "session running");
        self.active = Some(Active { shared, ingest });
        Ok(())
    }

    /// Suspends consumption. Readings wait in the port until Resume.
    pub fn pause(&self) -> Result<(), CommandError> {
        let active = self.active.as_ref().ok_or(CommandError::NotRunning)?;
        let mut session = active.shared.lock();
        match session.state {
            RunState::Running => {
                session.state = RunState::Paused;
                info!(vessel = %session.config().vessel, "session paused");
            }
            RunState::Paused => {}
            RunState::Idle | RunState::Stopped => return Err(CommandError::NotRunning),
        }
        Ok(())
    }

    pub fn resume(&self) -> Result<(), CommandError> {
        let active = self.active.as_ref().ok_or(CommandError::NotRunning)?;
        let mut session = active.shared.lock();
        match session.state {
            RunState::Paused => {
                session.state = RunState::Running;
                info!(vessel = %session.config().vessel, "session resumed");
            }
            RunState::Running => {}
            RunState::Idle => return Err(CommandError::NotRunning),
            state @ RunState::Stopped => {
                return Err(CommandError::InvalidTransition {
                    command: "resume",
                    state,
                });
            }
        }
        drop(session);
        active.shared.notify();
        Ok(())
    }

    /// Stops recording. The port stays open and readings still update the
    /// snapshot.
    pub fn stop(&self) -> Result<(), CommandError> {
        let active = self.active.as_ref().ok_or(CommandError::NotRunning)?;
        let mut session = active.shared.lock();
        match session.state {
            RunState::Running | RunState::Paused => {
                session.state = RunState::Stopped;
                info!(vessel = %session.config().vessel, "recording stopped");
            }
            RunState::Stopped => {}
            RunState::Idle => return Err(CommandError::NotRunning),
        }
        drop(session);
        active.shared.notify();
        Ok(())
    }

    /// Closes the port, ends the session, and returns to Idle.
    pub fn reconfigure(&mut self) {
        self.teardown();
    }

    /// Tears down the session and consumes the controller.
    pub fn exit(mut self) {
        self.teardown();
    }

    pub fn state(&self) -> RunState {
        self.active
            .as_ref()
            .map_or(RunState::Idle, |active| active.shared.lock().state)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.active
            .as_ref()
            .map(|active| active.shared.lock().snapshot())
            .unwrap_or_default()
    }

    fn teardown(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let vessel = active.shared.lock().config().vessel.clone();
        if active.ingest.shutdown() {
            info!(%vessel, "session closed");
        }
    }
}

impl Drop for Helm {
    fn drop(&mut self) {
        self.teardown();
    }
}
