//! The ingestion loop: reads lines off the port and feeds them to the session.
//!
//! Runs on its own thread so a blocked read never holds up commands. The
//! loop owns the port; when it returns, the port is closed. Closing the
//! loop is the only way to stop it short of losing the device.

pub mod link;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use jiff::Timestamp;
use tracing::{debug, error, info, warn};

use crate::model::RunState;
use crate::session::Shared;

use link::{LineReader, Port};

/// Consecutive hard read errors before the device is given up on.
pub const DEVICE_ERROR_LIMIT: u32 = 5;

/// A running ingestion thread.
pub struct IngestLoop {
    shared: Arc<Shared>,
    closed: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl IngestLoop {
    /// Starts reading `port` into `shared` on a thread named `ingest-<vessel>`.
    ///
    /// `pause_wait` bounds how long a paused loop sleeps between checks.
    pub fn spawn(
        port: Port,
        shared: Arc<Shared>,
        vessel: &str,
        pause_wait: Duration,
    ) -> io::Result<Self> {
        let closed = Arc::new(AtomicBool::new(false));

        let handle = {
            let shared = Arc::clone(&shared);
            let closed = Arc::clone(&closed);
            let vessel = vessel.to_string();
            thread::Builder::new()
                .name(format!("ingest-{vessel}"))
                .spawn(move || {
                    info!(%vessel, "ingestion started");
                    run(LineReader::new(port), &shared, &closed, pause_wait);
                    info!(%vessel, "ingestion ended, port closed");
                })?
        };

        Ok(Self {
            shared,
            closed,
            handle: Some(handle),
        })
    }

    /// Signals the loop to finish. Returns `true` only for the first call.
    ///
    /// A blocked read notices within the port's read timeout.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        // Taking the lock orders the flag before any waiter's next check.
        drop(self.shared.lock());
        self.shared.notify();
        first
    }

    /// Waits for the thread to exit, which releases the port.
    pub fn join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            error!("ingestion thread panicked");
        }
    }

    /// Closes and joins. Returns whether this call did the closing.
    pub fn shutdown(&mut self) -> bool {
        let first = self.close();
        self.join();
        first
    }
}

impl Drop for IngestLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mut reader: LineReader, shared: &Shared, closed: &AtomicBool, pause_wait: Duration) {
    let mut failures = 0;

    while !closed.load(Ordering::Acquire) {
        {
            let session = shared.lock();
            if session.state == RunState::Paused {
                drop(shared.wait_while_paused(session, closed, pause_wait));
                continue;
            }
        }

        match reader.next_line() {
            Ok(Some(line)) => {
                failures = 0;
                if line.is_empty() {
                    continue;
                }

                let mut session = shared.lock();
                // A line read just as Pause arrived waits for Resume.
                while session.state == RunState::Paused && !closed.load(Ordering::Acquire) {
                    session = shared.wait_while_paused(session, closed, pause_wait);
                }
                if closed.load(Ordering::Acquire) {
                    debug!(%line, "closed with a line in hand, dropping it");
                    break;
                }
                session.handle_line(&line, Timestamp::now());
            }
            Ok(None) => failures = 0,
            Err(e) if is_transient(e.kind()) => {}
            Err(e) if is_disconnect(e.kind()) => {
                shared.lock().device_lost(e.to_string());
                shared.notify();
                break;
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, failures, "serial read failed");
                if failures >= DEVICE_ERROR_LIMIT {
                    shared
                        .lock()
                        .device_lost(format!("{failures} consecutive read errors, last: {e}"));
                    shared.notify();
                    break;
                }
            }
        }
    }
}

/// Errors that just mean "nothing yet".
fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// Errors that mean the device is gone.
fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionAborted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_transient_not_disconnects() {
        assert!(is_transient(io::ErrorKind::TimedOut));
        assert!(is_transient(io::ErrorKind::WouldBlock));
        assert!(!is_disconnect(io::ErrorKind::TimedOut));
    }

    #[test]
    fn end_of_stream_is_a_disconnect() {
        assert!(is_disconnect(io::ErrorKind::UnexpectedEof));
        assert!(is_disconnect(io::ErrorKind::BrokenPipe));
        assert!(!is_disconnect(io::ErrorKind::Other));
        assert!(!is_transient(io::ErrorKind::Other));
    }
}
