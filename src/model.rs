//! In-memory object/instance/resource store: definition lookup,
//! permission queries, and mutation.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ModelError;

/// An ordered `objectID[/instanceID[/resourceID]]` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Path {
  Object(u16),
  Instance(u16, u16),
  Resource(u16, u16, u16),
}

impl Path {
  /// Parse a slice of decimal path segments. Fails for any length other
  /// than 1, 2 or 3, or for a segment that isn't a non-negative integer.
  pub fn parse(segments: &[&str]) -> Result<Self, ModelError> {
    let ids: Result<Vec<u16>, _> = segments.iter().map(|s| s.parse::<u16>()).collect();
    let ids = ids.map_err(|_| ModelError::PathMalformed(segments.join("/")))?;
    match ids.as_slice() {
      | [obj] => Ok(Path::Object(*obj)),
      | [obj, inst] => Ok(Path::Instance(*obj, *inst)),
      | [obj, inst, res] => Ok(Path::Resource(*obj, *inst, *res)),
      | _ => Err(ModelError::PathMalformed(segments.join("/"))),
    }
  }

  pub fn object(&self) -> u16 {
    match *self {
      | Path::Object(o) | Path::Instance(o, _) | Path::Resource(o, _, _) => o,
    }
  }

  pub fn instance(&self) -> Option<u16> {
    match *self {
      | Path::Object(_) => None,
      | Path::Instance(_, i) | Path::Resource(_, i, _) => Some(i),
    }
  }

  pub fn resource(&self) -> Option<u16> {
    match *self {
      | Path::Resource(_, _, r) => Some(r),
      | _ => None,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      | Path::Object(_) => 1,
      | Path::Instance(..) => 2,
      | Path::Resource(..) => 3,
    }
  }
}

impl fmt::Display for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Path::Object(o) => write!(f, "/{o}"),
      | Path::Instance(o, i) => write!(f, "/{o}/{i}"),
      | Path::Resource(o, i, r) => write!(f, "/{o}/{i}/{r}"),
    }
  }
}

/// Whether an object or resource admits a single occurrence or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
  Single,
  Multiple,
}

/// The four primitive resource operations, as a bitset that may be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Operations {
  pub read: bool,
  pub write: bool,
  pub execute: bool,
}

impl Operations {
  pub const NONE: Self = Self { read: false,
                                write: false,
                                execute: false };

  pub fn parse(spec: &str) -> Self {
    if spec.eq_ignore_ascii_case("NONE") {
      return Self::NONE;
    }
    Self { read: spec.contains('R'),
           write: spec.contains('W'),
           execute: spec.contains('E') }
  }
}

/// The wire type of a resource's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
  Integer,
  String,
  Float,
  Boolean,
  Time,
  Opaque,
}

impl ResourceKind {
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      | "integer" => Some(Self::Integer),
      | "string" => Some(Self::String),
      | "float" => Some(Self::Float),
      | "boolean" => Some(Self::Boolean),
      | "time" => Some(Self::Time),
      | "opaque" => Some(Self::Opaque),
      | _ => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct ResourceDefinition {
  pub id: u16,
  pub name: String,
  pub operations: Operations,
  pub instance_kind: InstanceKind,
  pub kind: ResourceKind,
  /// Identifier of the executable handler, if this resource is executable.
  /// Looked up in the handler registry; absent for non-executable resources.
  pub handler: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObjectDefinition {
  pub id: u16,
  pub name: String,
  pub instance_kind: InstanceKind,
  pub mandatory: bool,
  pub resources: BTreeMap<u16, ResourceDefinition>,
}

/// A single resource's value, shaped by its [`ResourceDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceValue {
  Integer(i64),
  String(String),
  Float(f64),
  Boolean(bool),
  Time(i64),
  Opaque(Vec<u8>),
  Multi(BTreeMap<u16, ResourceValue>),
}

pub type ObjectInstance = BTreeMap<u16, ResourceValue>;

/// Partial decoded tree of shape `{obj: {inst: {res: value}}}`, produced
/// by a codec and merged into the model by [`Model::apply`].
pub type DecodedTree = BTreeMap<u16, BTreeMap<u16, BTreeMap<u16, ResourceValue>>>;

/// Deep-union two decoded trees, with `b`'s leaves overwriting `a`'s.
pub fn merge_tree(mut a: DecodedTree, b: DecodedTree) -> DecodedTree {
  for (obj, b_insts) in b {
    let a_insts = a.entry(obj).or_default();
    for (inst, b_res) in b_insts {
      let a_res = a_insts.entry(inst).or_default();
      for (res, value) in b_res {
        a_res.insert(res, value);
      }
    }
  }
  a
}

/// The in-memory object/instance/resource store.
#[derive(Debug, Clone)]
pub struct Model {
  definitions: BTreeMap<u16, ObjectDefinition>,
  data: BTreeMap<u16, BTreeMap<u16, ObjectInstance>>,
}

impl Model {
  /// Construct a model from already-validated definitions and data.
  /// Loaders are expected to have checked the model invariants already;
  /// this constructor does not re-validate them.
  pub fn new(definitions: BTreeMap<u16, ObjectDefinition>, data: BTreeMap<u16, BTreeMap<u16, ObjectInstance>>) -> Self {
    Self { definitions, data }
  }

  pub fn objects(&self) -> Vec<u16> {
    self.data.keys().copied().collect()
  }

  pub fn instances(&self, obj: u16) -> Vec<u16> {
    self.data.get(&obj).map(|i| i.keys().copied().collect()).unwrap_or_default()
  }

  pub fn resources(&self, obj: u16, inst: u16) -> Vec<u16> {
    self.data
        .get(&obj)
        .and_then(|i| i.get(&inst))
        .map(|r| r.keys().copied().collect())
        .unwrap_or_default()
  }

  pub fn resource(&self, obj: u16, inst: u16, res: u16) -> Result<&ResourceValue, ModelError> {
    self.data
        .get(&obj)
        .and_then(|i| i.get(&inst))
        .and_then(|r| r.get(&res))
        .ok_or_else(|| ModelError::NotFound(format!("{obj}/{inst}/{res}")))
  }

  pub fn definition(&self, obj: u16) -> Option<&ObjectDefinition> {
    self.definitions.get(&obj)
  }

  pub fn resource_definition(&self, obj: u16, res: u16) -> Option<&ResourceDefinition> {
    self.definitions.get(&obj).and_then(|d| d.resources.get(&res))
  }

  /// True iff every prefix of `path` resolves in the store.
  pub fn is_path_valid(&self, path: &Path) -> bool {
    let obj = path.object();
    if !self.data.contains_key(&obj) {
      return false;
    }
    let Some(inst) = path.instance() else { return true };
    let Some(insts) = self.data.get(&obj) else { return false };
    if !insts.contains_key(&inst) {
      return false;
    }
    let Some(res) = path.resource() else { return true };
    insts.get(&inst).map(|r| r.contains_key(&res)).unwrap_or(false)
  }

  pub fn is_object_multi_instance(&self, obj: u16) -> bool {
    matches!(self.definitions.get(&obj).map(|d| d.instance_kind), Some(InstanceKind::Multiple))
  }

  pub fn is_resource_multi_instance(&self, obj: u16, _inst: u16, res: u16) -> bool {
    matches!(self.resource_definition(obj, res).map(|d| d.instance_kind), Some(InstanceKind::Multiple))
  }

  pub fn is_resource_readable(&self, obj: u16, _inst: u16, res: u16) -> bool {
    self.resource_definition(obj, res).map(|d| d.operations.read).unwrap_or(false)
  }

  pub fn is_resource_writable(&self, obj: u16, _inst: u16, res: u16) -> bool {
    self.resource_definition(obj, res).map(|d| d.operations.write).unwrap_or(false)
  }

  pub fn is_resource_executable(&self, obj: u16, _inst: u16, res: u16) -> bool {
    self.resource_definition(obj, res).map(|d| d.operations.execute).unwrap_or(false)
  }

  /// Unconditional mutation. Callers are responsible for having already
  /// checked writability when the write originates from an external request.
  pub fn set_resource(&mut self, obj: u16, inst: u16, res: u16, value: ResourceValue) {
    self.data.entry(obj).or_default().entry(inst).or_default().insert(res, value);
  }

  /// Merge a decoded tree into the store, skipping any resource that
  /// isn't writable. The caller's prior permission check (in the
  /// dispatcher) is what surfaces a rejection to the client; this method
  /// never raises.
  pub fn apply(&mut self, tree: DecodedTree) {
    for (obj, insts) in tree {
      for (inst, resources) in insts {
        for (res, value) in resources {
          if self.is_resource_writable(obj, inst, res) {
            self.set_resource(obj, inst, res, value);
          }
        }
      }
    }
  }

  /// `</obj/inst>` links for every instance, in ascending (obj, inst) order.
  pub fn object_links(&self) -> Vec<String> {
    self.objects()
        .into_iter()
        .flat_map(|obj| self.instances(obj).into_iter().map(move |inst| format!("</{obj}/{inst}>")))
        .collect()
  }

  pub fn instance_iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
    self.objects().into_iter().flat_map(|obj| self.instances(obj).into_iter().map(move |inst| (obj, inst)))
  }

  pub fn resource_iter(&self) -> impl Iterator<Item = (u16, u16, u16)> + '_ {
    self.instance_iter()
        .flat_map(|(obj, inst)| self.resources(obj, inst).into_iter().map(move |res| (obj, inst, res)))
  }
}
