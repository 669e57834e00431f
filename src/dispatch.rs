//! Maps an incoming CoAP request onto a model read, write or execute,
//! producing a [`Response`].
//!
//! Grounded on the Action/Status split the blocking server loop this
//! crate is modeled on uses to separate "what happened" from "what to
//! do next": here `Outcome` plays that role for a single request rather
//! than a whole event loop tick.

use crate::coap::{ContentFormat, Method, Observe, Response, ResponseCode};
use crate::handlers::HandlerRegistry;
use crate::model::{Model, Path};
use crate::observe::ObservationManager;
use crate::router;

/// What the dispatcher decided to do with a request, beyond the
/// [`Response`] it already produced. The registration/observe layer
/// acts on this; the CoAP transport only needs the `Response`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Plain,
  Subscribed,
  Unsubscribed,
}

pub struct Dispatcher<'a> {
  model: &'a mut Model,
  handlers: &'a HandlerRegistry,
  observations: &'a mut ObservationManager,
}

impl<'a> Dispatcher<'a> {
  pub fn new(model: &'a mut Model, handlers: &'a HandlerRegistry, observations: &'a mut ObservationManager) -> Self {
    Self { model, handlers, observations }
  }

  pub fn dispatch(&mut self, method: Method, path: &str, observe: Option<Observe>, content_format: Option<ContentFormat>, payload: &[u8])
                   -> (Response, Outcome) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
      return (Response::empty(ResponseCode::BadRequest), Outcome::Plain);
    }
    let parsed = match Path::parse(&segments) {
      | Ok(p) => p,
      | Err(e) => return (Response::message(ResponseCode::BadRequest, e.to_string()), Outcome::Plain),
    };

    match method {
      | Method::Get => self.handle_get(parsed, observe, path),
      | Method::Put => self.handle_write(parsed, content_format, payload),
      | Method::Post => self.handle_post(parsed, content_format, payload),
      | Method::Delete => (Response::empty(ResponseCode::MethodNotAllowed), Outcome::Plain),
    }
  }

  fn handle_get(&mut self, path: Path, observe: Option<Observe>, raw_path: &str) -> (Response, Outcome) {
    let response = router::encode(&path, self.model);
    if response.code != ResponseCode::Content {
      return (response, Outcome::Plain);
    }

    match observe {
      | Some(Observe::Register) => {
        self.observations.subscribe(raw_path.to_string());
        (response, Outcome::Subscribed)
      },
      | Some(Observe::Deregister) => {
        self.observations.unsubscribe(raw_path);
        (response, Outcome::Unsubscribed)
      },
      | None => (response, Outcome::Plain),
    }
  }

  fn handle_write(&mut self, path: Path, content_format: Option<ContentFormat>, payload: &[u8]) -> (Response, Outcome) {
    if let Path::Resource(obj, inst, res) = path {
      if self.model.is_path_valid(&path) && !self.model.is_resource_writable(obj, inst, res) {
        return (Response::empty(ResponseCode::MethodNotAllowed), Outcome::Plain);
      }
    }

    let (response, tree) = router::decode(&path, payload, content_format, self.model);
    if let Some(tree) = tree {
      // `Model::apply` itself re-checks per-resource writability, so a
      // bulk TLV write to an object or instance path can never touch a
      // read-only resource even though no single writability check
      // covers the whole tree up front.
      self.model.apply(tree);
    }
    (response, Outcome::Plain)
  }

  fn handle_post(&mut self, path: Path, content_format: Option<ContentFormat>, payload: &[u8]) -> (Response, Outcome) {
    match path {
      | Path::Resource(obj, inst, res) => {
        if !self.model.is_path_valid(&path) {
          return (Response::empty(ResponseCode::NotFound), Outcome::Plain);
        }
        if self.model.is_resource_executable(obj, inst, res) {
          let handler_name = self.model.definition(obj).and_then(|d| d.resources.get(&res)).and_then(|r| r.handler.as_deref());
          match handler_name.and_then(|name| self.handlers.get(name)) {
            | Some(handler) => {
              handler(self.model, obj, inst, res, payload);
              (Response::empty(ResponseCode::Changed), Outcome::Plain)
            },
            | None => (Response::empty(ResponseCode::NotImplemented), Outcome::Plain),
          }
        } else if self.model.is_resource_writable(obj, inst, res) {
          self.handle_write(path, content_format, payload)
        } else {
          (Response::empty(ResponseCode::MethodNotAllowed), Outcome::Plain)
        }
      },
      | _ => (Response::empty(ResponseCode::BadRequest), Outcome::Plain),
    }
  }
}
