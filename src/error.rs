//! Crate-wide error taxonomy and its mapping onto CoAP response codes.

use crate::coap::ResponseCode;

/// Errors surfaced while reading/writing the data model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
  #[error("not found: /{0}")]
  NotFound(String),
  #[error("malformed path: {0}")]
  PathMalformed(String),
}

/// Errors raised by the TLV and text codecs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
  #[error("empty or truncated TLV header")]
  TruncatedHeader,
  #[error("missing ID bytes in TLV")]
  MissingId,
  #[error("declared length exceeds remaining bytes")]
  LengthOutOfBounds,
  #[error("invalid resource path: /{obj}/{inst}/{res}")]
  InvalidResourcePath { obj: u16, inst: u16, res: u16 },
  #[error("invalid UTF-8 in string resource")]
  InvalidUtf8,
  #[error("could not parse value: {0}")]
  ValueParse(String),
}

/// Errors from loading object definitions and initial data.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse {path}: {source}")]
  Json {
    path: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("data references undefined object {0}")]
  UndefinedObject(u16),
  #[error("resource {obj}/{inst}/{res} does not match its definition: {reason}")]
  TypeMismatch {
    obj: u16,
    inst: u16,
    res: u16,
    reason: String,
  },
}

/// Registration state-machine failure: fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
  #[error("registration rejected by server with code {0:?}")]
  Rejected(ResponseCode),
  #[error("transport error while registering: {0}")]
  Transport(String),
}

impl From<&CodecError> for ResponseCode {
  fn from(_: &CodecError) -> Self {
    ResponseCode::BadRequest
  }
}

impl From<&ModelError> for ResponseCode {
  fn from(e: &ModelError) -> Self {
    match e {
      | ModelError::NotFound(_) => ResponseCode::NotFound,
      | ModelError::PathMalformed(_) => ResponseCode::BadRequest,
    }
  }
}
