//! Runtime configuration assembled from CLI flags, with defaults
//! matching the standalone client this crate is modeled on.

use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
  pub bind_address: IpAddr,
  pub server_host: String,
  pub server_port: u16,
  pub endpoint: String,
  pub lifetime: Duration,
  pub definitions_path: std::path::PathBuf,
  pub data_path: std::path::PathBuf,
}

impl Default for Config {
  fn default() -> Self {
    Self { bind_address: "::".parse().unwrap(),
           server_host: "localhost".into(),
           server_port: 5683,
           endpoint: "rust-lwm2m-client".into(),
           lifetime: Duration::from_secs(86400),
           definitions_path: "fixtures/lwm2m-object-definitions.json".into(),
           data_path: "fixtures/data.json".into() }
  }
}

impl From<crate::cli::Cli> for Config {
  fn from(cli: crate::cli::Cli) -> Self {
    let defaults = Config::default();
    Self { bind_address: cli.address.unwrap_or(defaults.bind_address),
           server_host: cli.server_host.unwrap_or(defaults.server_host),
           server_port: cli.server_port.unwrap_or(defaults.server_port),
           endpoint: cli.endpoint.unwrap_or(defaults.endpoint),
           lifetime: cli.lifetime.map(Duration::from_secs).unwrap_or(defaults.lifetime),
           definitions_path: cli.definitions.unwrap_or(defaults.definitions_path),
           data_path: cli.data.unwrap_or(defaults.data_path) }
  }
}
