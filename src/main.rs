mod cli;
mod config;
mod helm;
mod ingest;
mod logging;
mod model;
mod recorder;
mod sentence;
mod session;
mod track;

use std::process;

use clap::Parser;

use cli::Cli;
use config::Config;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(cli, &config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
