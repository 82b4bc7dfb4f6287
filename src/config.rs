//! Recorder configuration.
//!
//! Loaded from `~/.hdtrec/config.toml`. Every key is optional and the
//! file itself may be absent; command-line flags override what it says.
//!
//! ```toml
//! data-dir = "/var/log/hdtrec"
//! baud = 4800
//! mode = "nmea"
//! read-timeout-ms = 250
//! refresh-secs = 2
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::model::{BaudRate, SignalMode};

/// Recorder configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Where `<vessel>_NMEA.csv` and `<vessel>_Heading.csv` are written.
    pub data_dir: PathBuf,

    pub baud: BaudRate,

    pub mode: SignalMode,

    /// Upper bound on a single port read, so commands take effect promptly.
    pub read_timeout_ms: u64,

    /// How often the console prints a status line.
    pub refresh_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            baud: BaudRate::default(),
            mode: SignalMode::default(),
            read_timeout_ms: 250,
            refresh_secs: 2,
        }
    }
}

impl Config {
    /// Load config from `~/.hdtrec/config.toml`, or defaults if there is none.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load config from a specific file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Self::from_toml(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;
        if config.read_timeout_ms == 0 {
            return Err("read-timeout-ms must be greater than zero".into());
        }
        if config.refresh_secs == 0 {
            return Err("refresh-secs must be greater than zero".into());
        }
        Ok(config)
    }

    /// The config file path: `~/.hdtrec/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".hdtrec").join("config.toml"))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.baud.get(), 4800);
        assert_eq!(config.mode, SignalMode::Nmea);
        assert_eq!(config.read_timeout(), Duration::from_millis(250));
        assert_eq!(config.refresh_interval(), Duration::from_secs(2));
    }

    #[test]
    fn keys_are_kebab_case() {
        let config = Config::from_toml(
            r#"
            data-dir = "/var/log/hdtrec"
            baud = 38400
            mode = "ais"
            read-timeout-ms = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/log/hdtrec"));
        assert_eq!(config.baud.get(), 38400);
        assert_eq!(config.mode, SignalMode::Ais);
        assert_eq!(config.read_timeout_ms, 100);
        assert_eq!(config.refresh_secs, 2);
    }

    #[test]
    fn unsupported_baud_rate_is_rejected() {
        let err = Config::from_toml("baud = 1200").unwrap_err();
        assert!(err.contains("1200"), "{err}");
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(Config::from_toml("vessel = \"Alpha\"").is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Config::from_toml("read-timeout-ms = 0").is_err());
    }

    #[test]
    fn load_from_names_the_file_on_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "mode = \"sonar\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.contains("config.toml"), "{err}");
    }
}
