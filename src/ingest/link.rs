//! The serial link: opening a port and splitting its bytes into lines.

use std::io::{self, BufRead, BufReader, Read};
use std::time::Duration;

use tracing::warn;

use crate::model::BaudRate;
use crate::sentence::decode_line;

/// Longest line kept. NMEA caps sentences at 82 characters; anything
/// this long is line noise.
pub const MAX_LINE_BYTES: usize = 1024;

/// A byte stream from a serial device.
pub type Port = Box<dyn Read + Send>;

/// Errors from opening a serial port.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("port {port} unavailable: {reason}")]
    Unavailable { port: String, reason: String },
}

/// Opens serial ports.
///
/// Reads on the returned port must give up after `timeout` with
/// [`io::ErrorKind::TimedOut`] so the ingestion loop can notice commands.
pub trait Connector: Send + Sync {
    fn open(&self, port: &str, baud: BaudRate, timeout: Duration) -> Result<Port, ConnectError>;
}

/// Real serial devices, 8N1.
#[derive(Debug, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn open(&self, port: &str, baud: BaudRate, timeout: Duration) -> Result<Port, ConnectError> {
        let device = serialport::new(port, baud.get())
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .open()
            .map_err(|e| ConnectError::Unavailable {
                port: port.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(SerialLink(device)))
    }
}

struct SerialLink(Box<dyn serialport::SerialPort>);

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// Serial ports the OS knows about, by name.
pub fn available_ports() -> Result<Vec<String>, String> {
    let ports = serialport::available_ports().map_err(|e| format!("cannot list ports: {e}"))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Splits a port's bytes into `\n`-terminated lines.
///
/// A partial line survives read timeouts. Over-long lines are dropped
/// whole, up to and including their terminator.
pub struct LineReader {
    reader: BufReader<Port>,
    line: Vec<u8>,
    discarding: bool,
}

impl LineReader {
    pub fn new(port: Port) -> Self {
        Self {
            reader: BufReader::new(port),
            line: Vec::with_capacity(128),
            discarding: false,
        }
    }

    /// Reads what is available and returns the next complete line, if any.
    ///
    /// The line is decoded and trimmed, so it may be empty. A stream that
    /// reports end of file is treated as a closed device.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let available = self.reader.fill_buf()?;
        if available.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "device closed the stream",
            ));
        }

        let (chunk, complete) = match available.iter().position(|&b| b == b'\n') {
            Some(end) => (&available[..=end], true),
            None => (available, false),
        };
        let used = chunk.len();
        if !self.discarding {
            self.line.extend_from_slice(chunk);
        }
        self.reader.consume(used);

        if !self.discarding && self.line.len() > MAX_LINE_BYTES {
            warn!(bytes = self.line.len(), "discarding over-long line");
            self.line.clear();
            self.discarding = true;
        }

        if !complete {
            return Ok(None);
        }
        if self.discarding {
            self.discarding = false;
            return Ok(None);
        }

        let line = decode_line(&self.line);
        self.line.clear();
        Ok(Some(line))
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    //! An in-memory connector for driving the engine from tests.

    use std::collections::VecDeque;
    use std::io::{self, Read};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use super::{ConnectError, Connector, Port};
    use crate::model::BaudRate;

    enum Event {
        Bytes(Vec<u8>),
        Fail(io::ErrorKind),
    }

    #[derive(Default)]
    struct Script {
        events: VecDeque<Event>,
        absent: Vec<String>,
        open: bool,
        opens: usize,
        closes: usize,
    }

    /// Serves one port at a time from a shared script of lines and errors.
    ///
    /// Opening while a port is still open fails as "busy", like a real
    /// device would.
    #[derive(Clone, Default)]
    pub struct ScriptedConnector {
        script: Arc<Mutex<Script>>,
    }

    impl ScriptedConnector {
        pub fn new() -> Self {
            Self::default()
        }

        fn script(&self) -> std::sync::MutexGuard<'_, Script> {
            self.script.lock().unwrap()
        }

        pub fn push_line(&self, line: &str) {
            self.push_bytes(format!("{line}\r\n").as_bytes());
        }

        pub fn push_bytes(&self, bytes: &[u8]) {
            self.script().events.push_back(Event::Bytes(bytes.to_vec()));
        }

        pub fn push_error(&self, kind: io::ErrorKind) {
            self.script().events.push_back(Event::Fail(kind));
        }

        /// Makes `port` fail to open.
        pub fn remove_port(&self, port: &str) {
            self.script().absent.push(port.to_string());
        }

        pub fn opens(&self) -> usize {
            self.script().opens
        }

        pub fn closes(&self) -> usize {
            self.script().closes
        }

        pub fn is_open(&self) -> bool {
            self.script().open
        }
    }

    impl Connector for ScriptedConnector {
        fn open(&self, port: &str, _baud: BaudRate, timeout: Duration) -> Result<Port, ConnectError> {
            let mut script = self.script();
            let refuse = |reason: &str| ConnectError::Unavailable {
                port: port.to_string(),
                reason: reason.to_string(),
            };
            if script.absent.iter().any(|p| p == port) {
                return Err(refuse("no such device"));
            }
            if script.open {
                return Err(refuse("port busy"));
            }
            script.open = true;
            script.opens += 1;
            Ok(Box::new(ScriptedPort {
                script: Arc::clone(&self.script),
                idle: timeout.min(Duration::from_millis(5)),
            }))
        }
    }

    struct ScriptedPort {
        script: Arc<Mutex<Script>>,
        idle: Duration,
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut script = self.script.lock().unwrap();
            match script.events.pop_front() {
                Some(Event::Bytes(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        script.events.push_front(Event::Bytes(bytes.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Event::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
                None => {
                    drop(script);
                    thread::sleep(self.idle);
                    Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
                }
            }
        }
    }

    impl Drop for ScriptedPort {
        fn drop(&mut self) {
            let mut script = self.script.lock().unwrap();
            script.open = false;
            script.closes += 1;
        }
    }
}
