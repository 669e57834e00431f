//! Executable-resource handlers, looked up by name from a registry
//! instead of the `eval()`-on-a-string-name dispatch the source this is
//! modeled on uses.

use std::collections::BTreeMap;

use log::info;

use crate::model::{Model, ResourceValue};

pub type Handler = fn(&mut Model, obj: u16, inst: u16, res: u16, payload: &[u8]);

pub struct HandlerRegistry {
  handlers: BTreeMap<&'static str, Handler>,
}

impl HandlerRegistry {
  pub fn new() -> Self {
    Self { handlers: BTreeMap::new() }
  }

  pub fn register(&mut self, name: &'static str, handler: Handler) {
    self.handlers.insert(name, handler);
  }

  pub fn get(&self, name: &str) -> Option<Handler> {
    self.handlers.get(name).copied()
  }

  /// The device-object handlers every deployment of this client ships
  /// with: reboot, factory reset, firmware update trigger, registration
  /// update trigger and error-code reset.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.register("reboot", reboot);
    registry.register("factory_reset", factory_reset);
    registry.register("firmware_update", firmware_update);
    registry.register("registration_update_trigger", registration_update_trigger);
    registry.register("reset_error_code", reset_error_code);
    registry
  }
}

impl Default for HandlerRegistry {
  fn default() -> Self {
    Self::new()
  }
}

fn reboot(_model: &mut Model, obj: u16, inst: u16, res: u16, _payload: &[u8]) {
  info!("reboot requested via /{obj}/{inst}/{res}");
}

fn factory_reset(model: &mut Model, obj: u16, inst: u16, res: u16, _payload: &[u8]) {
  info!("factory reset requested via /{obj}/{inst}/{res}");
  model.set_resource(obj, inst, 11, ResourceValue::Multi(BTreeMap::new()));
}

fn firmware_update(_model: &mut Model, obj: u16, inst: u16, res: u16, _payload: &[u8]) {
  info!("firmware update requested via /{obj}/{inst}/{res}");
}

fn registration_update_trigger(_model: &mut Model, obj: u16, inst: u16, res: u16, _payload: &[u8]) {
  info!("registration update triggered via /{obj}/{inst}/{res}");
}

/// Clears the error code register (object 3, resource 11, instance 0)
/// back to `NO_ERROR`.
fn reset_error_code(model: &mut Model, obj: u16, inst: u16, res: u16, _payload: &[u8]) {
  info!("error code reset requested via /{obj}/{inst}/{res}");
  let mut errors = BTreeMap::new();
  errors.insert(0, ResourceValue::Integer(0));
  model.set_resource(obj, inst, 11, ResourceValue::Multi(errors));
}
