//! Picks a codec by path shape and content format, and maps codec
//! outcomes onto CoAP responses. The dispatcher owns verb semantics;
//! this module only owns "which bytes, in which format".

use crate::coap::{ContentFormat, Response, ResponseCode};
use crate::codec;
use crate::model::{DecodedTree, Model, Path};

/// Choose an encoding for a GET on `path` and render it.
///
/// - length 1 or 2 always uses TLV
/// - length 3 on a single-instance readable resource uses plain text
/// - length 3 on a multi-instance readable resource uses TLV
/// - an unreadable resource is `MethodNotAllowed`
pub fn encode(path: &Path, model: &Model) -> Response {
  if !model.is_path_valid(path) {
    return Response::empty(ResponseCode::NotFound);
  }

  match *path {
    | Path::Object(obj) => render(ContentFormat::Tlv, codec::tlv::encode(obj, None, model)),
    | Path::Instance(obj, inst) => render(ContentFormat::Tlv, codec::tlv::encode(obj, Some(inst), model)),
    | Path::Resource(obj, inst, res) => {
      if !model.is_resource_readable(obj, inst, res) {
        return Response::empty(ResponseCode::MethodNotAllowed);
      }
      if model.is_resource_multi_instance(obj, inst, res) {
        render(ContentFormat::Tlv, codec::tlv::encode_single(res, obj, inst, model))
      } else {
        render(ContentFormat::Text, codec::text::encode(obj, inst, res, model))
      }
    },
  }
}

fn render(format: ContentFormat, body: Result<Vec<u8>, crate::error::CodecError>) -> Response {
  match body {
    | Ok(bytes) => Response::with_payload(ResponseCode::Content, format, bytes),
    | Err(e) => Response::message(ResponseCode::from(&e), e.to_string()),
  }
}

/// Decode a PUT/POST payload addressed at `path`, given its declared
/// content format. Returns the decoded tree alongside the response the
/// dispatcher should send once it has applied (or rejected) it.
pub fn decode(path: &Path, payload: &[u8], content_format: Option<ContentFormat>, model: &Model) -> (Response, Option<DecodedTree>) {
  if !model.is_path_valid(path) {
    return (Response::empty(ResponseCode::NotFound), None);
  }

  let Some(format) = content_format else {
    return (Response::message(ResponseCode::BadRequest, "missing Content-Format"), None);
  };

  let obj = path.object();
  let inst = path.instance().unwrap_or(0);
  let res = path.resource();

  let result = match format {
    | ContentFormat::Tlv => codec::tlv::decode_typed(obj, inst, payload, model),
    | ContentFormat::Text => match res {
      | Some(res) if model.is_resource_multi_instance(obj, inst, res) => {
        return (Response::message(ResponseCode::BadRequest, "text codec does not support multi-instance resources"), None);
      },
      | Some(res) => codec::text::decode(obj, inst, res, payload, model),
      | None => return (Response::message(ResponseCode::BadRequest, "text codec requires a resource path"), None),
    },
    | _ => return (Response::message(ResponseCode::BadRequest, "unsupported content format"), None),
  };

  match result {
    | Ok(tree) => (Response::empty(ResponseCode::Changed), Some(tree)),
    | Err(e) => (Response::message(ResponseCode::from(&e), e.to_string()), None),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{InstanceKind, ObjectDefinition, ObjectInstance, Operations, ResourceDefinition, ResourceKind, ResourceValue};
  use std::collections::BTreeMap;

  fn model() -> Model {
    let mut resources = BTreeMap::new();
    resources.insert(0, ResourceDefinition { id: 0,
                                             name: "Manufacturer".into(),
                                             operations: Operations::parse("R"),
                                             instance_kind: InstanceKind::Single,
                                             kind: ResourceKind::String,
                                             handler: None });
    resources.insert(6, ResourceDefinition { id: 6,
                                             name: "Available Power Sources".into(),
                                             operations: Operations::parse("R"),
                                             instance_kind: InstanceKind::Multiple,
                                             kind: ResourceKind::Integer,
                                             handler: None });
    resources.insert(99, ResourceDefinition { id: 99,
                                              name: "Hidden".into(),
                                              operations: Operations::NONE,
                                              instance_kind: InstanceKind::Single,
                                              kind: ResourceKind::Boolean,
                                              handler: None });
    let def = ObjectDefinition { id: 3,
                                 name: "Device".into(),
                                 instance_kind: InstanceKind::Single,
                                 mandatory: true,
                                 resources };
    let mut defs = BTreeMap::new();
    defs.insert(3, def);

    let mut inst = ObjectInstance::new();
    inst.insert(0, ResourceValue::String("Open Source Community".into()));
    let mut power = BTreeMap::new();
    power.insert(0, ResourceValue::Integer(1));
    inst.insert(6, ResourceValue::Multi(power));
    inst.insert(99, ResourceValue::Boolean(false));
    let mut insts = BTreeMap::new();
    insts.insert(0, inst);
    let mut data = BTreeMap::new();
    data.insert(3, insts);

    Model::new(defs, data)
  }

  #[test]
  fn single_instance_resource_uses_text() {
    let m = model();
    let resp = encode(&Path::Resource(3, 0, 0), &m);
    assert_eq!(resp.content_format, Some(ContentFormat::Text));
    assert_eq!(resp.payload, b"Open Source Community");
  }

  #[test]
  fn multi_instance_resource_uses_tlv() {
    let m = model();
    let resp = encode(&Path::Resource(3, 0, 6), &m);
    assert_eq!(resp.content_format, Some(ContentFormat::Tlv));
  }

  #[test]
  fn object_and_instance_level_always_use_tlv() {
    let m = model();
    assert_eq!(encode(&Path::Object(3), &m).content_format, Some(ContentFormat::Tlv));
    assert_eq!(encode(&Path::Instance(3, 0), &m).content_format, Some(ContentFormat::Tlv));
  }

  #[test]
  fn unreadable_resource_is_method_not_allowed() {
    let m = model();
    let resp = encode(&Path::Resource(3, 0, 99), &m);
    assert_eq!(resp.code, ResponseCode::MethodNotAllowed);
  }

  #[test]
  fn invalid_path_is_not_found() {
    let m = model();
    let resp = encode(&Path::Object(7), &m);
    assert_eq!(resp.code, ResponseCode::NotFound);
  }

  #[test]
  fn decode_missing_content_format_is_bad_request() {
    let m = model();
    let (resp, tree) = decode(&Path::Resource(3, 0, 0), b"x", None, &m);
    assert_eq!(resp.code, ResponseCode::BadRequest);
    assert!(tree.is_none());
  }

  #[test]
  fn decode_text_on_multi_instance_resource_is_bad_request() {
    let m = model();
    let (resp, tree) = decode(&Path::Resource(3, 0, 6), b"1", Some(ContentFormat::Text), &m);
    assert_eq!(resp.code, ResponseCode::BadRequest);
    assert!(tree.is_none());
  }
}
