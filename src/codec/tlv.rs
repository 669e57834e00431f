//! OMA LWM2M TLV binary codec.
//!
//! Each TLV entry is a one-byte header (`type` in bits 7-6, identifier
//! length in bit 5, length-of-length in bits 4-3, inline length in bits
//! 2-0), an identifier of one or two bytes, an optional explicit length
//! field, and a value. `type` is one of:
//!
//! - `00` Object Instance   — value is a sequence of nested TLV entries
//! - `01` Resource Instance — value is a single resource's raw bytes,
//!   nested inside a Multiple Resource entry
//! - `10` Multiple Resource — value is a sequence of Resource Instance
//!   entries, one per index of a multi-instance resource
//! - `11` Resource          — value is a single resource's raw bytes
//!
//! The source this is modeled on derives the length-of-length high byte
//! with `_len & 0xFF0000 >> 16`, which in Python binds as
//! `_len & (0xFF0000 >> 16)` and always yields zero; every length here
//! is instead read off `to_be_bytes()` directly so no byte is dropped.

use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::model::{DecodedTree, Model, ResourceKind, ResourceValue};
#[cfg(test)]
use crate::model::ObjectInstance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
  ObjectInstance,
  ResourceInstance,
  MultipleResource,
  Resource,
}

impl Kind {
  fn from_tag_bits(bits: u8) -> Self {
    match bits {
      | 0b00 => Kind::ObjectInstance,
      | 0b01 => Kind::ResourceInstance,
      | 0b10 => Kind::MultipleResource,
      | _ => Kind::Resource,
    }
  }

  fn tag_bits(self) -> u8 {
    match self {
      | Kind::ObjectInstance => 0b00,
      | Kind::ResourceInstance => 0b01,
      | Kind::MultipleResource => 0b10,
      | Kind::Resource => 0b11,
    }
  }
}

#[derive(Debug)]
struct Entry<'a> {
  kind: Kind,
  id: u16,
  value: &'a [u8],
}

/// Split one TLV level into its entries, consuming the whole slice.
fn parse_entries(mut bytes: &[u8]) -> Result<Vec<Entry<'_>>, CodecError> {
  let mut entries = Vec::new();
  while !bytes.is_empty() {
    let header = bytes[0];
    let kind = Kind::from_tag_bits((header >> 6) & 0b11);
    let id_is_16bit = header & 0b0010_0000 != 0;
    let len_type = (header >> 3) & 0b11;

    let mut cursor = 1usize;
    let id = if id_is_16bit {
      let b = bytes.get(cursor..cursor + 2).ok_or(CodecError::MissingId)?;
      cursor += 2;
      u16::from_be_bytes([b[0], b[1]])
    } else {
      let b = *bytes.get(cursor).ok_or(CodecError::MissingId)?;
      cursor += 1;
      b as u16
    };

    let len = match len_type {
      | 0b00 => (header & 0b0000_0111) as usize,
      | 0b01 => {
        let b = *bytes.get(cursor).ok_or(CodecError::TruncatedHeader)?;
        cursor += 1;
        b as usize
      },
      | 0b10 => {
        let b = bytes.get(cursor..cursor + 2).ok_or(CodecError::TruncatedHeader)?;
        cursor += 2;
        u16::from_be_bytes([b[0], b[1]]) as usize
      },
      | _ => {
        let b = bytes.get(cursor..cursor + 3).ok_or(CodecError::TruncatedHeader)?;
        cursor += 3;
        u32::from_be_bytes([0, b[0], b[1], b[2]]) as usize
      },
    };

    let value = bytes.get(cursor..cursor + len).ok_or(CodecError::LengthOutOfBounds)?;
    entries.push(Entry { kind, id, value });
    bytes = &bytes[cursor + len..];
  }
  Ok(entries)
}

fn bytes_to_value(kind: ResourceKind, raw: &[u8]) -> Result<ResourceValue, CodecError> {
  match kind {
    | ResourceKind::Integer | ResourceKind::Time => {
      if raw.is_empty() || raw.len() > 8 {
        return Err(CodecError::ValueParse("integer TLV value must be 1-8 bytes".into()));
      }
      let negative = raw[0] & 0x80 != 0;
      let mut buf = [if negative { 0xFFu8 } else { 0 }; 8];
      buf[8 - raw.len()..].copy_from_slice(raw);
      let n = i64::from_be_bytes(buf);
      Ok(if kind == ResourceKind::Time { ResourceValue::Time(n) } else { ResourceValue::Integer(n) })
    },
    | ResourceKind::Float => match raw.len() {
      | 4 => Ok(ResourceValue::Float(f32::from_be_bytes(raw.try_into().unwrap()) as f64)),
      | 8 => Ok(ResourceValue::Float(f64::from_be_bytes(raw.try_into().unwrap()))),
      | _ => Err(CodecError::ValueParse("float TLV value must be 4 or 8 bytes".into())),
    },
    | ResourceKind::Boolean => match raw {
      | [0] => Ok(ResourceValue::Boolean(false)),
      | [1] => Ok(ResourceValue::Boolean(true)),
      | _ => Err(CodecError::ValueParse("boolean TLV value must be a single 0 or 1 byte".into())),
    },
    | ResourceKind::String => {
      String::from_utf8(raw.to_vec()).map(ResourceValue::String).map_err(|_| CodecError::InvalidUtf8)
    },
    | ResourceKind::Opaque => Ok(ResourceValue::Opaque(raw.to_vec())),
  }
}

fn value_to_bytes(value: &ResourceValue) -> Vec<u8> {
  match value {
    | ResourceValue::Integer(n) | ResourceValue::Time(n) => needed_int_bytes(*n),
    | ResourceValue::Float(f) => f.to_be_bytes().to_vec(),
    | ResourceValue::Boolean(b) => vec![if *b { 1 } else { 0 }],
    | ResourceValue::String(s) => s.clone().into_bytes(),
    | ResourceValue::Opaque(b) => b.clone(),
    | ResourceValue::Multi(_) => Vec::new(),
  }
}

/// Smallest big-endian two's-complement encoding of `n`, matching the
/// 1/2/4/8-byte widths the format allows for integers.
fn needed_int_bytes(n: i64) -> Vec<u8> {
  let full = n.to_be_bytes();
  for width in [1usize, 2, 4, 8] {
    let candidate = &full[8 - width..];
    let reconstructed = {
      let mut buf = [if candidate[0] & 0x80 != 0 { 0xFF } else { 0 }; 8];
      buf[8 - width..].copy_from_slice(candidate);
      i64::from_be_bytes(buf)
    };
    if reconstructed == n {
      return candidate.to_vec();
    }
  }
  full.to_vec()
}

fn pack_header(kind: Kind, id: u16, len: usize) -> Vec<u8> {
  let id_is_16bit = id > 0xFF;
  let mut header = kind.tag_bits() << 6;
  if id_is_16bit {
    header |= 0b0010_0000;
  }

  let mut out = Vec::with_capacity(6 + len);
  if len <= 7 {
    header |= len as u8;
    out.push(header);
  } else if len <= 0xFF {
    header |= 0b0000_1000;
    out.push(header);
    out.push(len as u8);
  } else if len <= 0xFFFF {
    header |= 0b0001_0000;
    out.push(header);
    out.extend_from_slice(&(len as u16).to_be_bytes());
  } else {
    header |= 0b0001_1000;
    out.push(header);
    out.extend_from_slice(&(len as u32).to_be_bytes()[1..]);
  }

  if id_is_16bit {
    out.extend_from_slice(&id.to_be_bytes());
  } else {
    out.push(id as u8);
  }
  out
}

fn pack_entry(kind: Kind, id: u16, value: &[u8]) -> Vec<u8> {
  let mut out = pack_header(kind, id, value.len());
  out.extend_from_slice(value);
  out
}

/// Decode a TLV payload addressed at `obj/inst`, producing a tree with
/// exactly that one instance populated. Every entry the parser splits
/// off is converted and inserted; none are silently dropped.
pub fn decode(obj: u16, inst: u16, payload: &[u8]) -> Result<DecodedTree, CodecError> {
  let entries = parse_entries(payload)?;
  let mut resources = BTreeMap::new();

  for entry in entries {
    match entry.kind {
      | Kind::Resource => {
        // Type is unknown without a model at this layer; callers that
        // need typed values go through `decode_typed`.
        resources.insert(entry.id, ResourceValue::Opaque(entry.value.to_vec()));
      },
      | Kind::MultipleResource => {
        let inner = parse_entries(entry.value)?;
        let mut multi = BTreeMap::new();
        for sub in inner {
          multi.insert(sub.id, ResourceValue::Opaque(sub.value.to_vec()));
        }
        resources.insert(entry.id, ResourceValue::Multi(multi));
      },
      | Kind::ResourceInstance => {
        resources.insert(entry.id, ResourceValue::Opaque(entry.value.to_vec()));
      },
      | Kind::ObjectInstance => {
        let inner = parse_entries(entry.value)?;
        for sub in inner {
          resources.insert(sub.id, ResourceValue::Opaque(sub.value.to_vec()));
        }
      },
    }
  }

  let mut tree = DecodedTree::new();
  tree.entry(obj).or_default().insert(inst, resources);
  Ok(tree)
}

/// Decode a TLV payload, converting every leaf to its declared type per
/// `model`'s definitions instead of leaving it opaque.
pub fn decode_typed(obj: u16, inst: u16, payload: &[u8], model: &Model) -> Result<DecodedTree, CodecError> {
  let raw = decode(obj, inst, payload)?;
  let mut typed = DecodedTree::new();
  let resources = raw.get(&obj).and_then(|i| i.get(&inst)).cloned().unwrap_or_default();

  let mut out = BTreeMap::new();
  for (res_id, value) in resources {
    let kind = model.resource_definition(obj, res_id)
                    .ok_or(CodecError::InvalidResourcePath { obj, inst, res: res_id })?
                    .kind;
    let converted = match value {
      | ResourceValue::Opaque(raw) => bytes_to_value(kind, &raw)?,
      | ResourceValue::Multi(inner) => {
        let mut multi = BTreeMap::new();
        for (idx, v) in inner {
          let ResourceValue::Opaque(raw) = v else { continue };
          multi.insert(idx, bytes_to_value(kind, &raw)?);
        }
        ResourceValue::Multi(multi)
      },
      | other => other,
    };
    out.insert(res_id, converted);
  }
  typed.entry(obj).or_default().insert(inst, out);
  Ok(typed)
}

/// Encode an object, an instance, or (if `inst` carries a resource-level
/// selector elsewhere) the resources of an instance as a TLV payload.
pub fn encode(obj: u16, inst: Option<u16>, model: &Model) -> Result<Vec<u8>, CodecError> {
  match inst {
    | Some(inst) => encode_instance(obj, inst, model),
    | None => {
      let mut out = Vec::new();
      for inst in model.instances(obj) {
        let body = encode_resources(obj, inst, model)?;
        out.extend(pack_entry(Kind::ObjectInstance, inst, &body));
      }
      Ok(out)
    },
  }
}

fn encode_instance(obj: u16, inst: u16, model: &Model) -> Result<Vec<u8>, CodecError> {
  encode_resources(obj, inst, model)
}

fn encode_resources(obj: u16, inst: u16, model: &Model) -> Result<Vec<u8>, CodecError> {
  let mut out = Vec::new();
  for res in model.resources(obj, inst) {
    if !model.is_resource_readable(obj, inst, res) {
      continue;
    }
    let value = model.resource(obj, inst, res).map_err(|_| CodecError::InvalidResourcePath { obj, inst, res })?;
    out.extend(encode_resource_entry(res, value));
  }
  Ok(out)
}

fn encode_resource_entry(res: u16, value: &ResourceValue) -> Vec<u8> {
  match value {
    | ResourceValue::Multi(inner) => {
      let mut body = Vec::new();
      for (idx, v) in inner {
        body.extend(pack_entry(Kind::ResourceInstance, *idx, &value_to_bytes(v)));
      }
      pack_entry(Kind::MultipleResource, res, &body)
    },
    | other => pack_entry(Kind::Resource, res, &value_to_bytes(other)),
  }
}

/// Encode a single resource value, for use when a request addresses a
/// specific resource rather than a whole instance or object.
pub fn encode_single(res: u16, obj: u16, inst: u16, model: &Model) -> Result<Vec<u8>, CodecError> {
  let value = model.resource(obj, inst, res).map_err(|_| CodecError::InvalidResourcePath { obj, inst, res })?;
  Ok(encode_resource_entry(res, value))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{InstanceKind, ObjectDefinition, Operations, ResourceDefinition};
  use std::collections::BTreeMap as Map;

  fn device_model() -> Model {
    let mut resources = Map::new();
    resources.insert(0, ResourceDefinition { id: 0,
                                             name: "Manufacturer".into(),
                                             operations: Operations::parse("R"),
                                             instance_kind: InstanceKind::Single,
                                             kind: ResourceKind::String,
                                             handler: None });
    resources.insert(1, ResourceDefinition { id: 1,
                                             name: "Model Number".into(),
                                             operations: Operations::parse("R"),
                                             instance_kind: InstanceKind::Single,
                                             kind: ResourceKind::String,
                                             handler: None });
    let def = ObjectDefinition { id: 3,
                                 name: "Device".into(),
                                 instance_kind: InstanceKind::Single,
                                 mandatory: true,
                                 resources };
    let mut defs = Map::new();
    defs.insert(3, def);

    let mut inst = ObjectInstance::new();
    inst.insert(0, ResourceValue::String("Open Source Community".into()));
    inst.insert(1, ResourceValue::String("LWM2M Client v0.1".into()));
    let mut insts = Map::new();
    insts.insert(0, inst);
    let mut data = Map::new();
    data.insert(3, insts);

    Model::new(defs, data)
  }

  #[test]
  fn round_trips_string_resources_through_typed_decode() {
    let model = device_model();
    let encoded = encode_instance(3, 0, &model).unwrap();
    let decoded = decode_typed(3, 0, &encoded, &model).unwrap();
    assert_eq!(decoded[&3][&0][&0], ResourceValue::String("Open Source Community".into()));
    assert_eq!(decoded[&3][&0][&1], ResourceValue::String("LWM2M Client v0.1".into()));
  }

  #[test]
  fn decodes_known_hex_payload() {
    // resource 0 = "Open Source Community" (22 bytes), resource 1 = "LWM2M Client v0.1" (17 bytes)
    let hex = "C800154F70656E20536F7572636520436F6D6D756E697479C801114C574D324D20436C69656E742076302E31";
    let bytes = (0..hex.len()).step_by(2).map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap()).collect::<Vec<u8>>();
    let model = device_model();
    let decoded = decode_typed(3, 0, &bytes, &model).unwrap();
    assert_eq!(decoded[&3][&0][&0], ResourceValue::String("Open Source Community".into()));
    assert_eq!(decoded[&3][&0][&1], ResourceValue::String("LWM2M Client v0.1".into()));
  }

  #[test]
  fn truncated_header_is_rejected_not_panicked() {
    assert_eq!(parse_entries(&[0xC8]).unwrap_err(), CodecError::TruncatedHeader);
  }

  #[test]
  fn length_out_of_bounds_is_rejected() {
    // declares 5 bytes of value but supplies none
    assert_eq!(parse_entries(&[0xC0 | 5, 0x00]).unwrap_err(), CodecError::LengthOutOfBounds);
  }

  #[test]
  fn long_value_selects_24_bit_length_and_survives_round_trip() {
    let value = vec![0x41u8; 70_000];
    let packed = pack_entry(Kind::Resource, 7, &value);
    let entries = parse_entries(&packed).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value.len(), 70_000);
  }

  #[test]
  fn negative_integer_round_trips_through_minimal_width() {
    let bytes = needed_int_bytes(-1);
    assert_eq!(bytes, vec![0xFF]);
    assert_eq!(bytes_to_value(ResourceKind::Integer, &bytes).unwrap(), ResourceValue::Integer(-1));
  }

  #[test]
  fn multi_instance_resource_round_trips() {
    let mut multi = Map::new();
    multi.insert(0, ResourceValue::Integer(10));
    multi.insert(1, ResourceValue::Integer(20));
    let entry = encode_resource_entry(6, &ResourceValue::Multi(multi));
    let parsed = parse_entries(&entry).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].kind, Kind::MultipleResource);
    let inner = parse_entries(parsed[0].value).unwrap();
    assert_eq!(inner.len(), 2);
  }

  #[test]
  fn decode_typed_rejects_resource_id_absent_from_definition() {
    let model = device_model();
    // resource 173 (0xAD) has no entry in the Device definition's resources
    let entry = pack_entry(Kind::Resource, 173, &[0xDE, 0xAD]);
    let err = decode_typed(3, 0, &entry, &model).unwrap_err();
    assert_eq!(err, CodecError::InvalidResourcePath { obj: 3, inst: 0, res: 173 });
    assert_eq!(err.to_string(), "invalid resource path: /3/0/173");
  }
}
