// CLI module for oxitag
//
// Argument parsing, command implementations and output formatting for the
// oxitag binary. Only the binary compiles this module.

pub mod commands;
pub mod config;
pub mod logger;
pub mod output;

pub use commands::run;
pub use config::Config;
pub use logger::StderrLogger;
