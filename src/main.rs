// CLI binary entry point for oxitag

mod cli;

use clap::Parser;
use std::process;

use cli::{Config, StderrLogger};

fn main() {
    let config = Config::parse();
    StderrLogger::setup(config.verbose, config.quiet);

    if let Err(e) = cli::run(config) {
        eprintln!("✗ {:#}", e);
        process::exit(1);
    }
}
