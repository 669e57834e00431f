use std::path::Path;

use lwm2m_client::codec;
use lwm2m_client::coap::ContentFormat;
use lwm2m_client::dispatch::Dispatcher;
use lwm2m_client::coap::Method;
use lwm2m_client::handlers::HandlerRegistry;
use lwm2m_client::loader;
use lwm2m_client::model::ResourceValue;
use lwm2m_client::observe::ObservationManager;

fn load_fixture_model() -> lwm2m_client::model::Model {
  loader::load(Path::new("fixtures/lwm2m-object-definitions.json"), Path::new("fixtures/data.json")).unwrap()
}

#[test]
fn loads_device_object_from_fixtures() {
  let model = load_fixture_model();
  assert_eq!(model.resource(3, 0, 0).unwrap(), &ResourceValue::String("Open Source Community".into()));
  assert_eq!(model.resource(1, 0, 1).unwrap(), &ResourceValue::Integer(86400));
}

#[test]
fn tlv_round_trips_the_full_device_instance() {
  let model = load_fixture_model();
  let encoded = codec::tlv::encode(3, Some(0), &model).unwrap();
  let decoded = codec::tlv::decode_typed(3, 0, &encoded, &model).unwrap();
  assert_eq!(decoded[&3][&0][&9], ResourceValue::Integer(100));
  assert_eq!(decoded[&3][&0][&13], ResourceValue::Time(1367491215));
}

/// Execute-only resources (4 Reboot, 5 Factory Reset, 12 Reset Error
/// Code) are not readable, so an instance-level TLV encode must not
/// leak them into the payload.
#[test]
fn tlv_instance_encode_excludes_execute_only_resources() {
  let model = load_fixture_model();
  let encoded = codec::tlv::encode(3, Some(0), &model).unwrap();
  let decoded = codec::tlv::decode_typed(3, 0, &encoded, &model).unwrap();
  let resources = &decoded[&3][&0];
  assert!(!resources.contains_key(&4));
  assert!(!resources.contains_key(&5));
  assert!(!resources.contains_key(&12));
}

#[test]
fn get_single_instance_resource_over_dispatcher_returns_text_content() {
  let mut model = load_fixture_model();
  let handlers = HandlerRegistry::with_builtins();
  let mut observations = ObservationManager::new();
  let mut dispatcher = Dispatcher::new(&mut model, &handlers, &mut observations);

  let (response, _) = dispatcher.dispatch(Method::Get, "/3/0/0", None, None, &[]);
  assert_eq!(response.code, lwm2m_client::coap::ResponseCode::Content);
  assert_eq!(response.content_format, Some(ContentFormat::Text));
  assert_eq!(response.payload, b"Open Source Community");
}

#[test]
fn get_multi_instance_resource_over_dispatcher_returns_tlv_content() {
  let mut model = load_fixture_model();
  let handlers = HandlerRegistry::with_builtins();
  let mut observations = ObservationManager::new();
  let mut dispatcher = Dispatcher::new(&mut model, &handlers, &mut observations);

  let (response, _) = dispatcher.dispatch(Method::Get, "/3/0/6", None, None, &[]);
  assert_eq!(response.code, lwm2m_client::coap::ResponseCode::Content);
  assert_eq!(response.content_format, Some(ContentFormat::Tlv));
}

#[test]
fn writing_current_time_as_text_then_reading_it_back_round_trips() {
  let mut model = load_fixture_model();
  let handlers = HandlerRegistry::with_builtins();
  let mut observations = ObservationManager::new();

  {
    let mut dispatcher = Dispatcher::new(&mut model, &handlers, &mut observations);
    let (resp, _) = dispatcher.dispatch(Method::Put, "/3/0/13", None, Some(ContentFormat::Text), b"2000000000");
    assert_eq!(resp.code, lwm2m_client::coap::ResponseCode::Changed);
  }

  assert_eq!(model.resource(3, 0, 13).unwrap(), &ResourceValue::Time(2_000_000_000));
}

#[test]
fn invalid_resource_path_is_reported_as_not_found_not_a_panic() {
  let mut model = load_fixture_model();
  let handlers = HandlerRegistry::with_builtins();
  let mut observations = ObservationManager::new();
  let mut dispatcher = Dispatcher::new(&mut model, &handlers, &mut observations);

  let (resp, _) = dispatcher.dispatch(Method::Get, "/3/0/999", None, None, &[]);
  assert_eq!(resp.code, lwm2m_client::coap::ResponseCode::NotFound);
}

#[test]
fn posting_reboot_executes_handler_without_content_format() {
  let mut model = load_fixture_model();
  let handlers = HandlerRegistry::with_builtins();
  let mut observations = ObservationManager::new();
  let mut dispatcher = Dispatcher::new(&mut model, &handlers, &mut observations);

  let (resp, _) = dispatcher.dispatch(Method::Post, "/3/0/4", None, None, &[]);
  assert_eq!(resp.code, lwm2m_client::coap::ResponseCode::Changed);
}

/// Regression guard for the TLV length-of-length bug in the source this
/// crate is modeled on: a 24-bit length must preserve its high byte.
#[test]
fn long_tlv_values_preserve_every_length_byte() {
  use lwm2m_client::model::{InstanceKind, Model, ObjectDefinition, ObjectInstance, Operations, ResourceDefinition, ResourceKind};
  use std::collections::BTreeMap;

  let mut resources = BTreeMap::new();
  resources.insert(0, ResourceDefinition { id: 0,
                                           name: "Blob".into(),
                                           operations: Operations::parse("R"),
                                           instance_kind: InstanceKind::Single,
                                           kind: ResourceKind::Opaque,
                                           handler: None });
  let def = ObjectDefinition { id: 99,
                               name: "Test".into(),
                               instance_kind: InstanceKind::Single,
                               mandatory: false,
                               resources };
  let mut defs = BTreeMap::new();
  defs.insert(99, def);

  let big = vec![0xABu8; 66_000];
  let mut inst = ObjectInstance::new();
  inst.insert(0, ResourceValue::Opaque(big.clone()));
  let mut insts = BTreeMap::new();
  insts.insert(0, inst);
  let mut data = BTreeMap::new();
  data.insert(99, insts);
  let model = Model::new(defs, data);

  let encoded = codec::tlv::encode(99, Some(0), &model).unwrap();
  let decoded = codec::tlv::decode(99, 0, &encoded).unwrap();
  match &decoded[&99][&0][&0] {
    | ResourceValue::Opaque(bytes) => assert_eq!(bytes.len(), 66_000),
    | other => panic!("unexpected value: {other:?}"),
  }
}

/// Regression guard for the text-codec bug in the source this crate is
/// modeled on, where booleans were parsed by truthiness instead of by
/// comparing the decoded string against "0"/"1": garbage text must be
/// rejected, not silently coerced to `true`.
#[test]
fn text_boolean_rejects_non_numeric_garbage() {
  use lwm2m_client::model::{InstanceKind, Model, ObjectDefinition, ObjectInstance, Operations, ResourceDefinition, ResourceKind};
  use std::collections::BTreeMap;

  let mut resources = BTreeMap::new();
  resources.insert(0, ResourceDefinition { id: 0,
                                           name: "Flag".into(),
                                           operations: Operations::parse("RW"),
                                           instance_kind: InstanceKind::Single,
                                           kind: ResourceKind::Boolean,
                                           handler: None });
  let def = ObjectDefinition { id: 99,
                               name: "Test".into(),
                               instance_kind: InstanceKind::Single,
                               mandatory: false,
                               resources };
  let mut defs = BTreeMap::new();
  defs.insert(99, def);
  let mut inst = ObjectInstance::new();
  inst.insert(0, ResourceValue::Boolean(false));
  let mut insts = BTreeMap::new();
  insts.insert(0, inst);
  let mut data = BTreeMap::new();
  data.insert(99, insts);
  let model = Model::new(defs, data);

  assert!(codec::text::decode(99, 0, 0, b"not-a-number", &model).is_err());
  assert_eq!(codec::text::decode(99, 0, 0, b"1", &model).unwrap()[&99][&0][&0], ResourceValue::Boolean(true));
}
