//! Loads object/resource definitions and initial instance data from
//! JSON files into a validated [`Model`].
//!
//! Grounded on the `ClientModel.__init__` validation in the source this
//! is modeled on, which refuses to start if any data object lacks a
//! definition; here that refusal is a typed [`LoadError`] instead of a
//! process exit.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::LoadError;
use crate::handlers::HandlerRegistry;
use crate::model::{InstanceKind, Model, ObjectDefinition, ObjectInstance, Operations, ResourceDefinition, ResourceKind, ResourceValue};

#[derive(Debug, Deserialize)]
struct RawResourceDef {
  id: u16,
  name: String,
  operations: String,
  instance_kind: String,
  kind: String,
  #[serde(default)]
  handler: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawObjectDef {
  id: u16,
  name: String,
  instance_kind: String,
  #[serde(default)]
  mandatory: bool,
  resources: Vec<RawResourceDef>,
}

fn parse_instance_kind(s: &str) -> InstanceKind {
  if s.eq_ignore_ascii_case("multiple") {
    InstanceKind::Multiple
  } else {
    InstanceKind::Single
  }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, LoadError> {
  let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.display().to_string(),
                                                                             source })?;
  serde_json::from_str(&text).map_err(|source| LoadError::Json { path: path.display().to_string(),
                                                                  source })
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
  if s.len() % 2 != 0 {
    return None;
  }
  (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok()).collect()
}

fn value_from_json(kind: ResourceKind, obj: u16, inst: u16, res: u16, json: &Value) -> Result<ResourceValue, LoadError> {
  let mismatch = |reason: &str| LoadError::TypeMismatch { obj, inst, res, reason: reason.to_string() };
  match kind {
    | ResourceKind::Integer => json.as_i64().map(ResourceValue::Integer).ok_or_else(|| mismatch("expected integer")),
    | ResourceKind::Time => json.as_i64().map(ResourceValue::Time).ok_or_else(|| mismatch("expected integer timestamp")),
    | ResourceKind::Float => json.as_f64().map(ResourceValue::Float).ok_or_else(|| mismatch("expected number")),
    | ResourceKind::Boolean => json.as_bool().map(ResourceValue::Boolean).ok_or_else(|| mismatch("expected boolean")),
    | ResourceKind::String => json.as_str().map(|s| ResourceValue::String(s.to_string())).ok_or_else(|| mismatch("expected string")),
    | ResourceKind::Opaque => json.as_str()
                                  .and_then(decode_hex)
                                  .map(ResourceValue::Opaque)
                                  .ok_or_else(|| mismatch("expected hex-encoded string")),
  }
}

fn resource_value_from_json(def: &ResourceDefinition, obj: u16, inst: u16, json: &Value) -> Result<ResourceValue, LoadError> {
  match def.instance_kind {
    | InstanceKind::Single => value_from_json(def.kind, obj, inst, def.id, json),
    | InstanceKind::Multiple => {
      let map = json.as_object().ok_or_else(|| LoadError::TypeMismatch { obj,
                                                                          inst,
                                                                          res: def.id,
                                                                          reason: "expected object of index -> value".into() })?;
      let mut values = BTreeMap::new();
      for (idx, v) in map {
        let idx: u16 = idx.parse().map_err(|_| LoadError::TypeMismatch { obj,
                                                                          inst,
                                                                          res: def.id,
                                                                          reason: format!("non-numeric instance index {idx}") })?;
        values.insert(idx, value_from_json(def.kind, obj, inst, def.id, v)?);
      }
      Ok(ResourceValue::Multi(values))
    },
  }
}

/// Load object/resource definitions from `definitions_path` and initial
/// instance data from `data_path`, producing a [`Model`]. Every data
/// object must have a matching definition and every resource's JSON
/// value must match its declared kind; a mismatch of either is a
/// [`LoadError`], not a silent skip.
pub fn load(definitions_path: &Path, data_path: &Path) -> Result<Model, LoadError> {
  let raw_defs: Vec<RawObjectDef> = read_json(definitions_path)?;
  let mut definitions = BTreeMap::new();
  for raw in raw_defs {
    let mut resources = BTreeMap::new();
    for r in raw.resources {
      resources.insert(r.id, ResourceDefinition { id: r.id,
                                                   name: r.name,
                                                   operations: Operations::parse(&r.operations),
                                                   instance_kind: parse_instance_kind(&r.instance_kind),
                                                   kind: ResourceKind::parse(&r.kind).unwrap_or(ResourceKind::Opaque),
                                                   handler: r.handler });
    }
    definitions.insert(raw.id, ObjectDefinition { id: raw.id,
                                                  name: raw.name,
                                                  instance_kind: parse_instance_kind(&raw.instance_kind),
                                                  mandatory: raw.mandatory,
                                                  resources });
  }

  let raw_data: BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>> = read_json(data_path)?;
  let mut data = BTreeMap::new();
  for (obj_str, instances) in raw_data {
    let obj: u16 = obj_str.parse().map_err(|_| LoadError::TypeMismatch { obj: 0,
                                                                         inst: 0,
                                                                         res: 0,
                                                                         reason: format!("non-numeric object id {obj_str}") })?;
    let def = definitions.get(&obj).ok_or(LoadError::UndefinedObject(obj))?;

    let mut parsed_instances = BTreeMap::new();
    for (inst_str, resources) in instances {
      let inst: u16 = inst_str.parse().map_err(|_| LoadError::TypeMismatch { obj, inst: 0, res: 0, reason: format!("non-numeric instance id {inst_str}") })?;

      let mut parsed_resources = ObjectInstance::new();
      for (res_str, value) in resources {
        let res: u16 = res_str.parse().map_err(|_| LoadError::TypeMismatch { obj, inst, res: 0, reason: format!("non-numeric resource id {res_str}") })?;
        let res_def = def.resources.get(&res).ok_or_else(|| LoadError::TypeMismatch { obj, inst, res, reason: "no matching resource definition".into() })?;
        parsed_resources.insert(res, resource_value_from_json(res_def, obj, inst, &value)?);
      }
      parsed_instances.insert(inst, parsed_resources);
    }
    data.insert(obj, parsed_instances);
  }

  Ok(Model::new(definitions, data))
}

/// Handler registry paired with the loaded model; split out so callers
/// can substitute their own handlers without touching the loader.
pub fn load_with_builtin_handlers(definitions_path: &Path, data_path: &Path) -> Result<(Model, HandlerRegistry), LoadError> {
  let model = load(definitions_path, data_path)?;
  Ok((model, HandlerRegistry::with_builtins()))
}
