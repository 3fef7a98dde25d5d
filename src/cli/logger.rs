// Stderr logger for the CLI

use log::{Level, LevelFilter, Log, Metadata, Record};

static LOGGER: StderrLogger = StderrLogger;

/// Writes library log records to stderr, prefixed with their target.
pub struct StderrLogger;

impl StderrLogger {
    /// Install the logger. Warnings are always shown unless `quiet`;
    /// `verbose` adds debug output.
    pub fn setup(verbose: bool, quiet: bool) {
        let level = if quiet {
            LevelFilter::Error
        } else if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        };
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let target = record.target();
        match record.level() {
            Level::Error => eprintln!("\x1b[0;31merror: {}: {}\x1b[0m", target, record.args()),
            Level::Warn => eprintln!("\x1b[1;33mwarning: {}: {}\x1b[0m", target, record.args()),
            _ => eprintln!("\x1b[1;30m{}: {}\x1b[0m", target, record.args()),
        }
    }

    fn flush(&self) {}
}
