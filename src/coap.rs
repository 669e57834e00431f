//! Minimal stand-ins for the parts of the CoAP layer the dispatcher and
//! router need as collaborators. Message framing, retransmission and
//! block-wise transfer live in the transport the crate is embedded in —
//! this module only carries the verbs, codes and option values that flow
//! across that boundary.

/// The four CoAP verbs the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Put,
  Post,
  Delete,
}

/// `Observe` option value on a GET request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observe {
  Register,
  Deregister,
}

impl Observe {
  pub fn from_byte(n: u8) -> Option<Self> {
    match n {
      | 0 => Some(Observe::Register),
      | 1 => Some(Observe::Deregister),
      | _ => None,
    }
  }
}

/// LWM2M content formats, using the OMA-registered numeric IDs.
///
/// The source this crate is modeled on carries a second, contradictory
/// table (`TEXT=0`, `TLV=11542`); those values are never used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
  Text,
  Tlv,
  Json,
  Opaque,
  Other(u16),
}

impl ContentFormat {
  pub const TEXT_ID: u16 = 1541;
  pub const TLV_ID: u16 = 1542;
  pub const JSON_ID: u16 = 1543;
  pub const OPAQUE_ID: u16 = 1544;
}

impl From<u16> for ContentFormat {
  fn from(n: u16) -> Self {
    match n {
      | Self::TEXT_ID => ContentFormat::Text,
      | Self::TLV_ID => ContentFormat::Tlv,
      | Self::JSON_ID => ContentFormat::Json,
      | Self::OPAQUE_ID => ContentFormat::Opaque,
      | n => ContentFormat::Other(n),
    }
  }
}

impl From<ContentFormat> for u16 {
  fn from(f: ContentFormat) -> Self {
    match f {
      | ContentFormat::Text => ContentFormat::TEXT_ID,
      | ContentFormat::Tlv => ContentFormat::TLV_ID,
      | ContentFormat::Json => ContentFormat::JSON_ID,
      | ContentFormat::Opaque => ContentFormat::OPAQUE_ID,
      | ContentFormat::Other(n) => n,
    }
  }
}

/// CoAP response codes this crate can produce, named the way RFC 7252
/// names them rather than by raw class.detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
  Created,
  Changed,
  Content,
  BadRequest,
  NotFound,
  MethodNotAllowed,
  NotImplemented,
}

impl ResponseCode {
  /// `class.detail` the way RFC 7252 prints a CoAP code.
  pub fn to_human(self) -> &'static str {
    match self {
      | ResponseCode::Created => "2.01",
      | ResponseCode::Changed => "2.04",
      | ResponseCode::Content => "2.05",
      | ResponseCode::BadRequest => "4.00",
      | ResponseCode::NotFound => "4.04",
      | ResponseCode::MethodNotAllowed => "4.05",
      | ResponseCode::NotImplemented => "5.01",
    }
  }
}

/// A response the dispatcher or router hands back to the CoAP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub code: ResponseCode,
  pub content_format: Option<ContentFormat>,
  pub payload: Vec<u8>,
}

impl Response {
  pub fn empty(code: ResponseCode) -> Self {
    Self { code,
           content_format: None,
           payload: Vec::new() }
  }

  pub fn with_payload(code: ResponseCode, content_format: ContentFormat, payload: Vec<u8>) -> Self {
    Self { code,
           content_format: Some(content_format),
           payload }
  }

  pub fn message(code: ResponseCode, message: impl Into<String>) -> Self {
    Self { code,
           content_format: Some(ContentFormat::Text),
           payload: message.into().into_bytes() }
  }
}
