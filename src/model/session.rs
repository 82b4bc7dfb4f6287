//! Session configuration: what the operator chose at Start.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Baud rates a session may be started with.
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [4800, 9600, 19200, 38400, 57600, 115_200];

/// Errors in a session configuration, reported before any file or device is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("vessel name is empty")]
    EmptyVessel,

    #[error("vessel name '{0}' cannot be used in a file name")]
    InvalidVessel(String),

    #[error("serial port name is empty")]
    EmptyPort,

    #[error("invalid baud rate '{0}': expected one of 4800, 9600, 19200, 38400, 57600, 115200")]
    InvalidBaudRate(String),

    #[error("unknown signal mode '{0}': expected 'nmea' or 'ais'")]
    UnknownMode(String),
}

/// Which kind of signal the serial link carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalMode {
    /// NMEA-0183 heading and position sentences.
    #[default]
    Nmea,

    /// AIS own-ship reports (`!AIVDO`), alongside any NMEA sentences on the same link.
    Ais,
}

impl SignalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nmea => "nmea",
            Self::Ais => "ais",
        }
    }
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nmea" | "nmea0183" => Ok(Self::Nmea),
            "ais" => Ok(Self::Ais),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// A serial baud rate from the supported allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BaudRate(u32);

impl BaudRate {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        Self(4800)
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if SUPPORTED_BAUD_RATES.contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidBaudRate(value.to_string()))
        }
    }
}

impl From<BaudRate> for u32 {
    fn from(baud: BaudRate) -> Self {
        baud.0
    }
}

impl FromStr for BaudRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBaudRate(s.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to start a session.
///
/// Immutable for the life of the session. Changing any field means
/// reconfiguring: the current session is torn down and a new one started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Vessel name. Also names the two log files.
    pub vessel: String,
    pub mode: SignalMode,
    /// Serial port identifier, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    pub baud: BaudRate,
    /// Directory the log files are written to.
    pub data_dir: PathBuf,
}

impl SessionConfig {
    /// Checks the configuration without touching the filesystem or the device.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let vessel = self.vessel.trim();
        if vessel.is_empty() {
            return Err(ConfigError::EmptyVessel);
        }
        if vessel != self.vessel
            || vessel.contains(['/', '\\', '\0'])
            || vessel == "."
            || vessel == ".."
        {
            return Err(ConfigError::InvalidVessel(self.vessel.clone()));
        }
        if self.port.trim().is_empty() {
            return Err(ConfigError::EmptyPort);
        }
        Ok(())
    }

    /// The raw sentence log: `<data-dir>/<vessel>_NMEA.csv`.
    pub fn raw_log_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}_NMEA.csv", self.vessel))
    }

    /// The derived heading log: `<data-dir>/<vessel>_Heading.csv`.
    pub fn heading_log_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}_Heading.csv", self.vessel))
    }
}
