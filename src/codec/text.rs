//! Plain-text codec for single resource values (content format 1541)
//! and the pass-through opaque codec (content format 1544).

use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::model::{DecodedTree, Model, ResourceKind, ResourceValue};

fn parse_value(kind: ResourceKind, text: &str) -> Result<ResourceValue, CodecError> {
  match kind {
    | ResourceKind::Integer => text.parse().map(ResourceValue::Integer).map_err(|_| CodecError::ValueParse(text.into())),
    | ResourceKind::Time => text.parse().map(ResourceValue::Time).map_err(|_| CodecError::ValueParse(text.into())),
    | ResourceKind::Float => text.parse().map(ResourceValue::Float).map_err(|_| CodecError::ValueParse(text.into())),
    | ResourceKind::Boolean => match text {
      | "0" => Ok(ResourceValue::Boolean(false)),
      | "1" => Ok(ResourceValue::Boolean(true)),
      | t if t.eq_ignore_ascii_case("true") => Ok(ResourceValue::Boolean(true)),
      | t if t.eq_ignore_ascii_case("false") => Ok(ResourceValue::Boolean(false)),
      | _ => Err(CodecError::ValueParse(text.into())),
    },
    | ResourceKind::String => Ok(ResourceValue::String(text.to_string())),
    | ResourceKind::Opaque => Err(CodecError::ValueParse("opaque resources cannot use the text codec".into())),
  }
}

fn format_value(value: &ResourceValue) -> String {
  match value {
    | ResourceValue::Integer(n) | ResourceValue::Time(n) => n.to_string(),
    | ResourceValue::Float(f) => f.to_string(),
    | ResourceValue::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
    | ResourceValue::String(s) => s.clone(),
    | ResourceValue::Opaque(_) | ResourceValue::Multi(_) => String::new(),
  }
}

/// Decode a plain-text payload into a single resource, typed per the
/// resource's definition in `model`. Booleans accept `"0"`/`"1"` and
/// case-insensitive `"true"`/`"false"`; anything else is rejected. The
/// source this is modeled on instead compares truthiness on the decoded
/// string, which silently accepts any non-empty garbage as true.
pub fn decode(obj: u16, inst: u16, res: u16, payload: &[u8], model: &Model) -> Result<DecodedTree, CodecError> {
  let text = std::str::from_utf8(payload).map_err(|_| CodecError::InvalidUtf8)?;
  let kind = model.resource_definition(obj, res).map(|d| d.kind).unwrap_or(ResourceKind::String);
  let value = parse_value(kind, text.trim())?;

  let mut tree = DecodedTree::new();
  let mut resources = BTreeMap::new();
  resources.insert(res, value);
  tree.entry(obj).or_default().insert(inst, resources);
  Ok(tree)
}

pub fn encode(obj: u16, inst: u16, res: u16, model: &Model) -> Result<Vec<u8>, CodecError> {
  let value = model.resource(obj, inst, res).map_err(|_| CodecError::InvalidResourcePath { obj, inst, res })?;
  Ok(format_value(value).into_bytes())
}

/// Wrap a raw opaque payload as a one-resource decoded tree, with no
/// conversion — the value is carried as bytes end to end.
pub fn wrap_opaque(obj: u16, inst: u16, res: u16, payload: &[u8]) -> DecodedTree {
  let mut tree = DecodedTree::new();
  let mut resources = BTreeMap::new();
  resources.insert(res, ResourceValue::Opaque(payload.to_vec()));
  tree.entry(obj).or_default().insert(inst, resources);
  tree
}

pub fn encode_opaque(obj: u16, inst: u16, res: u16, model: &Model) -> Result<Vec<u8>, CodecError> {
  match model.resource(obj, inst, res).map_err(|_| CodecError::InvalidResourcePath { obj, inst, res })? {
    | ResourceValue::Opaque(bytes) => Ok(bytes.clone()),
    | other => Ok(format_value(other).into_bytes()),
  }
}
