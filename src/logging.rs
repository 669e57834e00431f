//! Logger initialization, split out so `main` stays a thin assembly of
//! config, logging and the run loop.

use crate::cli::LogLevel;

pub fn init(level: LogLevel) {
  simple_logger::init_with_level(match level {
    | LogLevel::Error => log::Level::Error,
    | LogLevel::Warn => log::Level::Warn,
    | LogLevel::Info => log::Level::Info,
    | LogLevel::Debug => log::Level::Debug,
    | LogLevel::Trace => log::Level::Trace,
  }).expect("logger already initialized");
}
