//! The interactive console for `hdtrec run`.
//!
//! Commands are read from stdin on their own thread and applied to the
//! controller on the main thread. Between commands, a status line is
//! printed every refresh interval unless the session is paused.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::helm::Helm;
use crate::ingest::link::SerialConnector;
use crate::model::{BaudRate, RunState, SessionConfig, SignalMode};

use super::format::{format_target, sparkline, status_line};

const SPARKLINE_WIDTH: usize = 40;

/// An operator command typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ConsoleCommand {
    Pause,
    Resume,
    Stop,
    Setup {
        vessel: String,
        port: String,
        baud: BaudRate,
        mode: Option<SignalMode>,
    },
    Status {
        json: bool,
    },
    Help,
    Exit,
}

/// Parses one console line. Blank lines are `Ok(None)`.
pub(super) fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (word.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("pause", []) => ConsoleCommand::Pause,
        ("resume" | "play", []) => ConsoleCommand::Resume,
        ("stop", []) => ConsoleCommand::Stop,
        ("status", []) => ConsoleCommand::Status { json: false },
        ("status", ["json"]) => ConsoleCommand::Status { json: true },
        ("help" | "?", []) => ConsoleCommand::Help,
        ("exit" | "quit", []) => ConsoleCommand::Exit,
        ("setup", [vessel, port, baud, rest @ ..]) if rest.len() <= 1 => ConsoleCommand::Setup {
            vessel: (*vessel).to_string(),
            port: (*port).to_string(),
            baud: baud.parse::<BaudRate>().map_err(|e| format!("{e}"))?,
            mode: rest
                .first()
                .map(|m| m.parse::<SignalMode>())
                .transpose()
                .map_err(|e| format!("{e}"))?,
        },
        ("setup", _) => return Err("usage: setup <vessel> <port> <baud> [nmea|ais]".into()),
        (
            "pause" | "resume" | "play" | "stop" | "status" | "help" | "?" | "exit" | "quit",
            _,
        ) => return Err(format!("{word} takes no arguments")),
        _ => return Err(format!("unknown command '{word}', type 'help'")),
    };
    Ok(Some(command))
}

/// Starts `session` and runs the console until `exit`.
pub(super) fn run(config: &Config, session: SessionConfig) -> Result<(), String> {
    let mut helm = Helm::new(Box::new(SerialConnector), config.read_timeout());
    let data_dir = session.data_dir.clone();
    let mut mode = session.mode;

    helm.start(session).map_err(|e| e.to_string())?;
    println!("{}", status_line(&helm.snapshot()));
    println!("Type 'help' for commands.");

    let refresh = config.refresh_interval();
    let mut commands = Some(spawn_stdin_reader());
    let mut next_status = Instant::now() + refresh;

    loop {
        let wait = next_status.saturating_duration_since(Instant::now());
        let received = commands.as_ref().map(|rx| rx.recv_timeout(wait));
        let line = match received {
            Some(Ok(line)) => Some(line),
            Some(Err(RecvTimeoutError::Timeout)) => None,
            Some(Err(RecvTimeoutError::Disconnected)) => {
                info!("stdin closed, recording until interrupted");
                commands = None;
                None
            }
            None => {
                thread::sleep(wait);
                None
            }
        };

        let Some(line) = line else {
            if Instant::now() >= next_status {
                let snapshot = helm.snapshot();
                if snapshot.state != RunState::Paused {
                    println!("{}", status_line(&snapshot));
                }
                next_status = Instant::now() + refresh;
            }
            continue;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        debug!(?command, "console command");

        let result = match command {
            ConsoleCommand::Pause => helm.pause(),
            ConsoleCommand::Resume => helm.resume(),
            ConsoleCommand::Stop => helm.stop(),
            ConsoleCommand::Setup {
                vessel,
                port,
                baud,
                mode: new_mode,
            } => {
                helm.reconfigure();
                mode = new_mode.unwrap_or(mode);
                helm.start(SessionConfig {
                    vessel,
                    mode,
                    port,
                    baud,
                    data_dir: data_dir.clone(),
                })
            }
            ConsoleCommand::Status { json } => {
                print_status(&helm, json);
                continue;
            }
            ConsoleCommand::Help => {
                println!("{}", super::CONSOLE_HELP);
                continue;
            }
            ConsoleCommand::Exit => break,
        };

        match result {
            Ok(()) => println!("{}", helm.state()),
            Err(e) => println!("Error: {e}"),
        }
    }

    helm.exit();
    Ok(())
}

fn print_status(helm: &Helm, json: bool) {
    let snapshot = helm.snapshot();
    if json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{json}"),
            Err(e) => println!("Error: failed to serialize status: {e}"),
        }
        return;
    }
    println!("{}", status_line(&snapshot));
    if let Some(target) = &snapshot.display_target {
        println!("target   {}", format_target(target));
    }
    if !snapshot.headings.is_empty() {
        println!("headings {}", sparkline(&snapshot.headings, SPARKLINE_WIDTH));
    }
}

/// Forwards stdin lines until it closes.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("console-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        // Without stdin the console still records and prints status.
        warn!(error = %e, "cannot read console commands");
    }
    rx
}
