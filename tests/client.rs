//! Tests for the direct (non-batched) client surface: entity CRUD, the
//! property refetch cache, indexes and traversals.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockTransport;
use serde_json::json;
use restgraph::{
  Direction, GraphEntity, HttpMethod, PropMap, PropValue, RestApi, RestError,
  TraversalDescription,
};

const BASE: &str = "http://localhost:7474/db/data";

fn api_with(transport: &Arc<MockTransport>) -> RestApi {
  RestApi::with_transport(BASE, transport.clone())
}

#[test]
fn get_node_materializes_and_caches_properties() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(
    200,
    json!({"self": format!("{BASE}/node/5"), "data": {"name": "test"}}),
  );
  let api = api_with(&transport);

  let node = api.get_node(5).unwrap();
  assert_eq!(node.id().unwrap(), 5);
  assert_eq!(
    node.property("name").unwrap(),
    Some(PropValue::String("test".to_string()))
  );
  assert!(node.has_property("name").unwrap());
  assert!(!node.has_property("missing").unwrap());

  // Served from the snapshot inside the freshness window
  assert_eq!(transport.request_count(), 1);
}

#[test]
fn get_node_surfaces_not_found() {
  let transport = Arc::new(MockTransport::new());
  transport.respond_empty(404);
  let api = api_with(&transport);

  assert!(matches!(api.get_node(99), Err(RestError::NotFound(_))));
}

#[test]
fn trailing_slash_in_base_uri_is_normalized() {
  let transport = Arc::new(MockTransport::new());
  transport.respond_empty(404);
  let api = RestApi::with_transport(&format!("{BASE}/"), transport.clone());

  let _ = api.get_node(1);
  assert_eq!(transport.sent()[0].uri, format!("{BASE}/node/1"));
}

#[test]
fn create_node_from_location_header_loads_properties_lazily() {
  let transport = Arc::new(MockTransport::new());
  transport.respond_created(&format!("{BASE}/node/12"), None);
  transport.respond(200, json!({"name": "test"}));
  let api = api_with(&transport);

  let node = api.create_node(PropMap::new()).unwrap();
  assert_eq!(node.uri().unwrap(), format!("{BASE}/node/12"));
  assert_eq!(transport.request_count(), 1);

  // First property read fetches the map once
  assert_eq!(
    node.property("name").unwrap(),
    Some(PropValue::String("test".to_string()))
  );
  assert_eq!(transport.request_count(), 2);
  assert_eq!(
    transport.sent()[1].uri,
    format!("{BASE}/node/12/properties")
  );
}

#[test]
fn create_node_rejects_unexpected_status() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(200, json!({}));
  let api = api_with(&transport);

  assert!(matches!(
    api.create_node(PropMap::new()),
    Err(RestError::UnexpectedStatus { status: 200, .. })
  ));
}

#[test]
fn property_refetch_window_controls_staleness() {
  let transport = Arc::new(MockTransport::new());
  transport.respond_created(&format!("{BASE}/node/1"), None);
  transport.respond(200, json!({"n": 1}));
  transport.respond(200, json!({"n": 2}));
  let api = api_with(&transport);

  let node = api.create_node(PropMap::new()).unwrap();

  // Zero window: every read refetches
  api.set_property_refetch_time(Duration::ZERO);
  assert_eq!(node.property("n").unwrap(), Some(PropValue::Int(1)));
  assert_eq!(node.property("n").unwrap(), Some(PropValue::Int(2)));
  assert_eq!(transport.request_count(), 3);

  // Wide window: the snapshot is served locally
  api.set_property_refetch_time(Duration::from_secs(60));
  assert_eq!(node.property("n").unwrap(), Some(PropValue::Int(2)));
  assert_eq!(transport.request_count(), 3);
}

#[test]
fn set_property_writes_through_and_invalidates() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(
    200,
    json!({"self": format!("{BASE}/node/2"), "data": {"name": "before"}}),
  );
  transport.respond_empty(204);
  transport.respond(200, json!({"name": "after"}));
  let api = api_with(&transport);

  let node = api.get_node(2).unwrap();
  node.set_property("name", "after").unwrap();

  let sent = transport.sent();
  assert_eq!(sent[1].method, HttpMethod::Put);
  assert_eq!(sent[1].uri, format!("{BASE}/node/2/properties/name"));
  assert_eq!(sent[1].body, Some(json!("after")));

  // The write invalidated the snapshot; the next read refetches even
  // inside the freshness window
  assert_eq!(
    node.property("name").unwrap(),
    Some(PropValue::String("after".to_string()))
  );
  assert_eq!(transport.request_count(), 3);
}

#[test]
fn remove_property_round_trip() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(
    200,
    json!({"self": format!("{BASE}/node/2"), "data": {"name": "test"}}),
  );
  transport.respond_empty(204);
  transport.respond(200, json!({}));
  let api = api_with(&transport);

  let node = api.get_node(2).unwrap();
  node.remove_property("name").unwrap();
  assert!(!node.has_property("name").unwrap());

  let sent = transport.sent();
  assert_eq!(sent[1].method, HttpMethod::Delete);
  assert_eq!(sent[1].uri, format!("{BASE}/node/2/properties/name"));
}

#[test]
fn create_relationship_between_bound_nodes() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(200, json!({"self": format!("{BASE}/node/1"), "data": {}}));
  transport.respond(200, json!({"self": format!("{BASE}/node/2"), "data": {}}));
  transport.respond(
    201,
    json!({
      "self": format!("{BASE}/relationship/3"),
      "start": format!("{BASE}/node/1"),
      "end": format!("{BASE}/node/2"),
      "type": "KNOWS",
      "data": {"weight": 5},
    }),
  );
  let api = api_with(&transport);

  let start = api.get_node(1).unwrap();
  let end = api.get_node(2).unwrap();
  let rel = start
    .create_relationship_to(&end, "KNOWS", PropMap::new())
    .unwrap();

  let sent = transport.sent();
  assert_eq!(sent[2].uri, format!("{BASE}/node/1/relationships"));
  assert_eq!(
    sent[2].body,
    Some(json!({"to": format!("{BASE}/node/2"), "type": "KNOWS"}))
  );

  assert_eq!(rel.rel_type().unwrap(), "KNOWS");
  assert_eq!(rel.other_node(&start).unwrap().id().unwrap(), 2);
}

#[test]
fn relationship_listing_materializes_typed_handles() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(200, json!({"self": format!("{BASE}/node/1"), "data": {}}));
  transport.respond(
    200,
    json!([
      {"self": format!("{BASE}/relationship/7"),
       "start": format!("{BASE}/node/1"),
       "end": format!("{BASE}/node/2"),
       "type": "KNOWS", "data": {}},
      {"self": format!("{BASE}/relationship/8"),
       "start": format!("{BASE}/node/1"),
       "end": format!("{BASE}/node/3"),
       "type": "LIKES", "data": {}},
    ]),
  );
  let api = api_with(&transport);

  let node = api.get_node(1).unwrap();
  let rels = node.relationships(Direction::Outgoing).unwrap();

  assert_eq!(
    transport.sent()[1].uri,
    format!("{BASE}/node/1/relationships/out")
  );
  assert_eq!(rels.len(), 2);
  assert_eq!(rels[1].rel_type().unwrap(), "LIKES");
}

#[test]
fn reference_node_follows_the_service_root() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(200, json!({"reference_node": format!("{BASE}/node/0")}));
  let api = api_with(&transport);

  let node = api.reference_node().unwrap();
  assert_eq!(node.id().unwrap(), 0);
  assert_eq!(transport.sent()[0].uri, BASE);
}

#[test]
fn missing_index_is_created_on_first_use() {
  let transport = Arc::new(MockTransport::new());
  // Listing without the index, then creation
  transport.respond(200, json!({}));
  transport.respond_empty(201);
  let api = api_with(&transport);

  let index = api.index().for_nodes("people").unwrap();
  assert_eq!(index.name(), "people");

  let sent = transport.sent();
  assert_eq!(sent[1].method, HttpMethod::Post);
  assert_eq!(sent[1].uri, format!("{BASE}/index/node"));
  assert_eq!(
    sent[1].body,
    Some(json!({
      "name": "people",
      "config": {"provider": "lucene", "type": "exact"},
    }))
  );
}

#[test]
fn index_add_and_exact_lookup() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(200, json!({"people": {}}));
  transport.respond(200, json!({"self": format!("{BASE}/node/4"), "data": {}}));
  transport.respond_empty(201);
  transport.respond(
    200,
    json!([{"self": format!("{BASE}/node/4"), "data": {"name": "alice"}}]),
  );
  let api = api_with(&transport);

  let index = api.index().for_nodes("people").unwrap();
  let node = api.get_node(4).unwrap();
  index.add(&node, "name", "alice").unwrap();

  let sent = transport.sent();
  assert_eq!(sent[2].uri, format!("{BASE}/index/node/people/name/alice"));
  assert_eq!(sent[2].body, Some(json!(format!("{BASE}/node/4"))));

  let hits = index.get("name", "alice").unwrap();
  assert_eq!(hits.expected_size(), 1);
  let hit = hits.single().unwrap();
  assert_eq!(hit.id().unwrap(), 4);
}

#[test]
fn get_index_does_not_create() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(200, json!({}));
  let api = api_with(&transport);

  assert!(matches!(
    api.index().get_node_index("people"),
    Err(RestError::NoSuchIndex(_))
  ));
  assert_eq!(transport.request_count(), 1);
}

#[test]
fn index_lookup_miss_is_empty_not_an_error() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(200, json!({"people": {}}));
  transport.respond_empty(404);
  let api = api_with(&transport);

  let index = api.index().for_nodes("people").unwrap();
  let hits = index.get("name", "nobody").unwrap();
  assert_eq!(hits.expected_size(), 0);
}

#[test]
fn traversal_posts_description_and_materializes_paths() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(200, json!({"self": format!("{BASE}/node/1"), "data": {}}));
  transport.respond(
    200,
    json!([{
      "start": format!("{BASE}/node/1"),
      "end": format!("{BASE}/node/3"),
      "nodes": [format!("{BASE}/node/1"), format!("{BASE}/node/2"), format!("{BASE}/node/3")],
      "relationships": [format!("{BASE}/relationship/7"), format!("{BASE}/relationship/8")],
      "length": 2,
    }]),
  );
  let api = api_with(&transport);

  let start = api.get_node(1).unwrap();
  let paths = TraversalDescription::new()
    .max_depth(2)
    .relationship("KNOWS", Direction::Outgoing)
    .traverse(&start)
    .unwrap();

  let sent = transport.sent();
  assert_eq!(sent[1].uri, format!("{BASE}/node/1/traversal/path"));
  assert_eq!(
    sent[1].body,
    Some(json!({
      "order": "breadth_first",
      "max_depth": 2,
      "relationships": [{"type": "KNOWS", "direction": "out"}],
    }))
  );

  assert_eq!(paths.len(), 1);
  let path = &paths[0];
  assert_eq!(path.length(), 2);
  assert_eq!(path.start_node().id().unwrap(), 1);
  assert_eq!(path.end_node().id().unwrap(), 3);
  assert_eq!(path.nodes().len(), 3);
  assert_eq!(path.last_relationship().unwrap().id().unwrap(), 8);
}

#[test]
fn execute_batch_closure_error_discards_without_network() {
  let transport = Arc::new(MockTransport::new());
  let api = api_with(&transport);

  let outcome: Result<(), _> = api.execute_batch(|batch| {
    batch.create_node(PropMap::new());
    Err(RestError::InvalidProperty("caller bailed".to_string()))
  });

  assert!(outcome.is_err());
  assert_eq!(transport.request_count(), 0);
}

#[test]
fn execute_batch_returns_the_closure_value_with_entities_bound() {
  let transport = Arc::new(MockTransport::new());
  transport.respond(
    200,
    json!([{"id": 0, "status": 201, "body": {"self": format!("{BASE}/node/21"), "data": {}}}]),
  );
  let api = api_with(&transport);

  let node = api
    .execute_batch(|batch| Ok(batch.create_node(PropMap::new())))
    .unwrap();

  assert_eq!(node.id().unwrap(), 21);
}
