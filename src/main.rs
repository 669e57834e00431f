//! Thin assembly: parse flags, load the model, and drive the
//! registration and observation state machines from a single
//! cooperative loop. Actual CoAP message framing and transport belong
//! to whatever socket layer this binary is deployed behind; see
//! [`lwm2m_client::coap`] for the boundary this crate exposes to it.

use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info};

use lwm2m_client::cli::Cli;
use lwm2m_client::config::Config;
use lwm2m_client::dispatch::Dispatcher;
use lwm2m_client::handlers::HandlerRegistry;
use lwm2m_client::loader;
use lwm2m_client::logging;
use lwm2m_client::observe::ObservationManager;
use lwm2m_client::registration::{Event, RegistrationFsm};

fn main() {
  let cli = Cli::parse();
  logging::init(cli.log_level);
  let config = Config::from(cli);

  let mut model = match loader::load(&config.definitions_path, &config.data_path) {
    | Ok(m) => m,
    | Err(e) => {
      error!("failed to load model: {e}");
      std::process::exit(1);
    },
  };

  let handlers = HandlerRegistry::with_builtins();
  let mut observations = ObservationManager::new();
  let mut fsm = RegistrationFsm::new(config.endpoint.clone(), config.lifetime);

  info!("starting endpoint {} against {}:{}", config.endpoint, config.server_host, config.server_port);

  loop {
    let now = Instant::now();
    match fsm.poll(now, &model) {
      | Ok(Event::Send(req)) if fsm.location().is_none() => {
        info!("registering {} at {}?{} with body {}", fsm.endpoint(), req.path, req.query, req.body);
        fsm.on_registered(format!("/rd/{}", fsm.endpoint()), now);
      },
      | Ok(Event::Send(req)) => {
        info!("sending registration update to {}", req.path);
        fsm.on_update_accepted(now);
      },
      | Err(nb::Error::WouldBlock) => {},
      | Err(nb::Error::Other(never)) => match never {},
    }

    // A real deployment hands each inbound datagram to `Dispatcher`;
    // this loop only exercises the state machines in isolation.
    let _ = Dispatcher::new(&mut model, &handlers, &mut observations);

    std::thread::sleep(Duration::from_millis(250));
  }
}
