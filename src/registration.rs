//! Registration state machine: initial `/rd` registration, periodic
//! update before the lease lapses, and re-registration on rejection or
//! transport failure.
//!
//! Polling shape is grounded on the retry timer this crate is modeled
//! on, which exposes `what_should_i_do(now) -> nb::Result<YouShould,
//! Infallible>` so a caller can drive it from its own tick loop without
//! blocking. `embedded_time::Instant` there becomes `std::time::Instant`
//! here, since this client runs on a host OS rather than bare metal.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::RegistrationError;
use crate::model::Model;

pub const BINDING_MODE: &str = "UQ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Unregistered,
  Registered,
}

/// A fully-formed `/rd` registration or update request, independent of
/// whatever transport actually sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
  /// `/rd` for an initial registration, `/rd/<token>` for an update.
  pub path: String,
  /// `ep=<endpoint>&b=UQ&lt=<lifetime>` on initial registration; empty
  /// on an update, which carries only the path.
  pub query: String,
  /// Comma-separated `</obj/inst>` links, from `Model::object_links`.
  pub body: String,
}

/// What the caller should do after polling the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  Send(RegisterRequest),
}

/// Drives the registration lifecycle off wall-clock polls, matching the
/// `update_register()` loop in the source this is modeled on but
/// expressed as a poll function rather than an `asyncio` task.
pub struct RegistrationFsm {
  state: State,
  endpoint: String,
  lifetime: Duration,
  location: Option<String>,
  next_update_due: Instant,
}

impl RegistrationFsm {
  pub fn new(endpoint: impl Into<String>, lifetime: Duration) -> Self {
    Self { state: State::Unregistered,
           endpoint: endpoint.into(),
           lifetime,
           location: None,
           next_update_due: Instant::now() }
  }

  pub fn state(&self) -> State {
    self.state
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  /// Non-blocking poll: returns `WouldBlock` when there is nothing to
  /// do yet, or an [`Event`] carrying the next `/rd` exchange to send.
  pub fn poll(&mut self, now: Instant, model: &Model) -> nb::Result<Event, std::convert::Infallible> {
    match self.state {
      | State::Unregistered => Ok(Event::Send(self.register_request(model))),
      | State::Registered => {
        if now >= self.next_update_due {
          Ok(Event::Send(self.update_request()))
        } else {
          Err(nb::Error::WouldBlock)
        }
      },
    }
  }

  fn register_request(&self, model: &Model) -> RegisterRequest {
    RegisterRequest { path: "/rd".to_string(),
                       query: format!("ep={}&b={}&lt={}", self.endpoint, BINDING_MODE, self.lifetime.as_secs()),
                       body: model.object_links().join(",") }
  }

  fn update_request(&self) -> RegisterRequest {
    RegisterRequest { path: self.location.clone().unwrap_or_else(|| "/rd".to_string()),
                       query: String::new(),
                       body: String::new() }
  }

  /// Record a successful registration response, scheduling the next
  /// update a second before the lease would otherwise lapse so a
  /// network hiccup doesn't cost the registration outright.
  pub fn on_registered(&mut self, location: String, now: Instant) {
    info!("registered endpoint {} at {location}, lifetime {:?}", self.endpoint, self.lifetime);
    self.location = Some(location);
    self.state = State::Registered;
    self.next_update_due = now + self.lifetime.saturating_sub(Duration::from_secs(1));
  }

  pub fn on_update_accepted(&mut self, now: Instant) {
    self.next_update_due = now + self.lifetime.saturating_sub(Duration::from_secs(1));
  }

  /// A rejected update or registration drops back to `Unregistered` so
  /// the next poll re-sends a full registration, with no extra delay:
  /// the FSM itself never waits out a backoff before retrying.
  pub fn on_rejected(&mut self, err: RegistrationError) {
    warn!("registration failed for {}: {err}", self.endpoint);
    self.state = State::Unregistered;
    self.location = None;
  }

  pub fn location(&self) -> Option<&str> {
    self.location.as_deref()
  }
}
