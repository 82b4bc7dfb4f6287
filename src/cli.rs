//! CLI interface for hdtrec.
//!
//! - `hdtrec run --vessel <name> --port <port>` records a session and
//!   takes operator commands on stdin.
//! - `hdtrec ports` lists serial ports.
//! - `hdtrec log <vessel>` prints the last recorded headings.
//!
//! Flags override `~/.hdtrec/config.toml`, which overrides built-in defaults.

mod console;
mod format;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::ingest::link::available_ports;
use crate::model::{BaudRate, SessionConfig, SignalMode};
use crate::recorder::{format_timestamp, read_heading_log};

use format::{format_heading, sparkline};

/// hdtrec: record vessel heading from an NMEA-0183 or AIS serial feed.
#[derive(Debug, Parser)]
#[command(name = "hdtrec", version, after_long_help = CONSOLE_HELP)]
pub struct Cli {
    /// Log at debug level. `RUST_LOG` takes precedence.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

const CONSOLE_HELP: &str = r"Console commands (while `run` is active):
  pause                              stop reading; the port stays open
  resume | play                      continue after pause
  stop                               stop recording; readings still update status
  setup <vessel> <port> <baud> [nmea|ais]
                                     close this session and start a new one
  status [json]                      print status now, optionally as JSON
  exit | quit                        close the port and exit";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a session and record until `exit`.
    ///
    /// Appends raw sentences to `<vessel>_NMEA.csv` and headings to
    /// `<vessel>_Heading.csv` in the data directory.
    Run {
        /// Vessel name. Names the log files.
        #[arg(long)]
        vessel: String,

        /// Serial port, e.g. `/dev/ttyUSB0` or `COM3`.
        #[arg(long)]
        port: String,

        /// One of 4800, 9600, 19200, 38400, 57600, 115200.
        #[arg(long)]
        baud: Option<BaudRate>,

        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Directory for the log files.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// List serial ports.
    Ports,

    /// Print the last recorded headings of a vessel.
    Log {
        vessel: String,

        /// How many rows to print.
        #[arg(long, default_value_t = 10)]
        tail: usize,

        /// Print the rows as a JSON array instead of a table.
        #[arg(long)]
        json: bool,

        /// Directory for the log files.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

/// CLI-facing signal mode, mapped to the domain `SignalMode`.
#[derive(Debug, Clone, ValueEnum)]
pub enum ModeArg {
    /// NMEA-0183 heading and position sentences.
    Nmea,
    /// AIS own-ship reports.
    Ais,
}

impl ModeArg {
    fn to_domain(&self) -> SignalMode {
        match self {
            Self::Nmea => SignalMode::Nmea,
            Self::Ais => SignalMode::Ais,
        }
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run(cli: Cli, config: &Config) -> Result<(), String> {
    match cli.command {
        Command::Run {
            vessel,
            port,
            baud,
            mode,
            data_dir,
        } => {
            let session = SessionConfig {
                vessel,
                mode: mode.as_ref().map_or(config.mode, ModeArg::to_domain),
                port,
                baud: baud.unwrap_or(config.baud),
                data_dir: data_dir.unwrap_or_else(|| config.data_dir.clone()),
            };
            console::run(config, session)
        }
        Command::Ports => cmd_ports(),
        Command::Log {
            vessel,
            tail,
            json,
            data_dir,
        } => cmd_log(config, &vessel, tail, json, data_dir),
    }
}

fn cmd_ports() -> Result<(), String> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }
    for port in &ports {
        println!("{port}");
    }
    Ok(())
}

fn cmd_log(
    config: &Config,
    vessel: &str,
    tail: usize,
    json: bool,
    data_dir: Option<PathBuf>,
) -> Result<(), String> {
    let session = SessionConfig {
        vessel: vessel.to_string(),
        mode: config.mode,
        port: "-".to_string(),
        baud: config.baud,
        data_dir: data_dir.unwrap_or_else(|| config.data_dir.clone()),
    };
    session.validate().map_err(|e| e.to_string())?;

    let path = session.heading_log_path();
    if !path.exists() {
        return Err(format!("no heading log at {}", path.display()));
    }
    let samples = read_heading_log(&path).map_err(|e| e.to_string())?;
    let start = samples.len().saturating_sub(tail);

    if json {
        let json = serde_json::to_string_pretty(&samples[start..])
            .map_err(|e| format!("failed to serialize headings: {e}"))?;
        println!("{json}");
        return Ok(());
    }
    if samples.is_empty() {
        println!("No headings recorded for {vessel}");
        return Ok(());
    }

    for sample in &samples[start..] {
        println!(
            "{}  {}",
            format_timestamp(sample.at),
            format_heading(Some(sample.heading))
        );
    }
    println!(
        "{} of {} headings  {}",
        samples.len() - start,
        samples.len(),
        sparkline(&samples, tail)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse_into_domain_types() {
        let cli = Cli::try_parse_from([
            "hdtrec", "run", "--vessel", "Alpha", "--port", "/dev/ttyUSB0", "--baud", "38400",
            "--mode", "ais",
        ])
        .unwrap();

        let Command::Run { baud, mode, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(baud.map(BaudRate::get), Some(38400));
        assert_eq!(mode.map(|m| m.to_domain()), Some(SignalMode::Ais));
    }

    #[test]
    fn unsupported_baud_is_a_usage_error() {
        let result = Cli::try_parse_from([
            "hdtrec", "run", "--vessel", "Alpha", "--port", "/dev/ttyUSB0", "--baud", "1200",
        ]);
        assert!(result.is_err());
    }
}
