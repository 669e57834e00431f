//! Command-line surface, modeled the way `clap`-derived CLIs in this
//! pack structure shared flags: every field is optional here so
//! [`crate::config::Config`] alone owns the defaults.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "lwm2m-client", about = "Lightweight M2M device agent")]
pub struct Cli {
  /// Local address to bind the CoAP socket to.
  #[arg(long)]
  pub address: Option<IpAddr>,

  /// LWM2M server host to register with.
  #[arg(long)]
  pub server_host: Option<String>,

  /// LWM2M server port to register with.
  #[arg(long)]
  pub server_port: Option<u16>,

  /// Endpoint name to register under.
  #[arg(long)]
  pub endpoint: Option<String>,

  /// Registration lifetime in seconds.
  #[arg(long)]
  pub lifetime: Option<u64>,

  /// Path to the object/resource definitions JSON file.
  #[arg(long)]
  pub definitions: Option<PathBuf>,

  /// Path to the initial instance data JSON file.
  #[arg(long)]
  pub data: Option<PathBuf>,

  /// Log verbosity.
  #[arg(long, value_enum, default_value_t = LogLevel::Info)]
  pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
  Error,
  Warn,
  Info,
  Debug,
  Trace,
}

impl From<LogLevel> for log::LevelFilter {
  fn from(level: LogLevel) -> Self {
    match level {
      | LogLevel::Error => log::LevelFilter::Error,
      | LogLevel::Warn => log::LevelFilter::Warn,
      | LogLevel::Info => log::LevelFilter::Info,
      | LogLevel::Debug => log::LevelFilter::Debug,
      | LogLevel::Trace => log::LevelFilter::Trace,
    }
  }
}
