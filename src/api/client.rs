//! Client entry point
//!
//! `RestApi` is a cheap-clone handle over the shared transport and client
//! configuration. It exposes the direct (immediate) operation surface and
//! opens batch recording contexts; entities hold a clone of it for their
//! lazy property loads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::batch::BatchHandle;
use crate::constants::{
  DEFAULT_PROPERTY_REFETCH_MS, NODE_PATH, PROPERTIES_PATH, RELATIONSHIPS_PATH, RELATIONSHIP_PATH,
  STATUS_CREATED, STATUS_NOT_FOUND, STATUS_OK,
};
use crate::entity::converter::{
  Converted, EntityListConverter, EntityPayload, ResultConverter,
};
use crate::entity::{GraphEntity, RestNode, RestRelationship};
use crate::error::{RestError, Result};
use crate::index::IndexManager;
use crate::transport::{
  join_uri, normalize_base_uri, HttpMethod, HttpTransport, RequestResult, Transport,
};
use crate::types::{props_from_json, props_to_json, Direction, EntityId, PropMap, PropValue};

struct ApiCore {
  transport: Arc<dyn Transport>,
  base_uri: String,
  /// Freshness window for cached property snapshots, in milliseconds
  refetch_ms: AtomicU64,
}

/// Handle for one remote graph database.
///
/// Clones share the transport and configuration; every entity holds one,
/// which is how lazy property loads and batch binding reach the server.
#[derive(Clone)]
pub struct RestApi {
  core: Arc<ApiCore>,
}

impl RestApi {
  // ==========================================================================
  // Construction
  // ==========================================================================

  /// Connect to a server base URI, e.g. `http://localhost:7474/db/data`
  pub fn connect(uri: &str) -> Self {
    Self::with_transport(uri, Arc::new(HttpTransport::new()))
  }

  /// Connect with basic authentication
  pub fn connect_with_auth(uri: &str, user: &str, password: &str) -> Self {
    Self::with_transport(uri, Arc::new(HttpTransport::with_auth(user, password)))
  }

  /// Connect over a caller-supplied transport
  pub fn with_transport(uri: &str, transport: Arc<dyn Transport>) -> Self {
    Self {
      core: Arc::new(ApiCore {
        transport,
        base_uri: normalize_base_uri(uri),
        refetch_ms: AtomicU64::new(DEFAULT_PROPERTY_REFETCH_MS),
      }),
    }
  }

  /// Client whose transport always fails; state-machine tests only
  #[cfg(test)]
  pub(crate) fn unconnected(uri: &str) -> Self {
    struct NoTransport;
    impl Transport for NoTransport {
      fn send(&self, _: HttpMethod, _: &str, _: Option<&Value>) -> Result<RequestResult> {
        Err(RestError::Transport("not connected".to_string()))
      }
    }
    Self::with_transport(uri, Arc::new(NoTransport))
  }

  pub fn base_uri(&self) -> &str {
    &self.core.base_uri
  }

  pub(crate) fn transport(&self) -> &dyn Transport {
    self.core.transport.as_ref()
  }

  // ==========================================================================
  // Configuration
  // ==========================================================================

  /// Freshness window for cached property snapshots
  pub fn property_refetch_time(&self) -> Duration {
    Duration::from_millis(self.core.refetch_ms.load(Ordering::Relaxed))
  }

  pub fn set_property_refetch_time(&self, window: Duration) {
    self
      .core
      .refetch_ms
      .store(window.as_millis() as u64, Ordering::Relaxed);
  }

  // ==========================================================================
  // Batches
  // ==========================================================================

  /// Open a recording context for one batch
  pub fn begin_batch(&self) -> BatchHandle {
    BatchHandle::new(self.clone())
  }

  /// Record a batch inside the closure, then submit it.
  ///
  /// An error from the closure discards the batch without a network call.
  pub fn execute_batch<T>(
    &self,
    record: impl FnOnce(&mut BatchHandle) -> Result<T>,
  ) -> Result<T> {
    let mut handle = self.begin_batch();
    let out = record(&mut handle)?;
    handle.submit()?;
    Ok(out)
  }

  // ==========================================================================
  // Direct operations
  // ==========================================================================

  /// Fetch a node by id
  pub fn get_node(&self, id: EntityId) -> Result<RestNode> {
    let uri = join_uri(self.base_uri(), &format!("{NODE_PATH}/{id}"));
    let result = self.transport().send(HttpMethod::Get, &uri, None)?;
    if result.status_is(STATUS_NOT_FOUND) {
      return Err(RestError::NotFound(format!("node {id}")));
    }
    if result.status_other_than(STATUS_OK) {
      return Err(RestError::UnexpectedStatus {
        method: "GET",
        uri,
        status: result.status,
      });
    }
    Ok(RestNode::from_payload(self, EntityPayload::from_result(&result)?))
  }

  /// Fetch a relationship by id
  pub fn get_relationship(&self, id: EntityId) -> Result<RestRelationship> {
    let uri = join_uri(self.base_uri(), &format!("{RELATIONSHIP_PATH}/{id}"));
    let result = self.transport().send(HttpMethod::Get, &uri, None)?;
    if result.status_is(STATUS_NOT_FOUND) {
      return Err(RestError::NotFound(format!("relationship {id}")));
    }
    if result.status_other_than(STATUS_OK) {
      return Err(RestError::UnexpectedStatus {
        method: "GET",
        uri,
        status: result.status,
      });
    }
    Ok(RestRelationship::from_payload(
      self,
      EntityPayload::from_result(&result)?,
    ))
  }

  /// Create a node, immediately
  pub fn create_node(&self, props: PropMap) -> Result<RestNode> {
    let uri = join_uri(self.base_uri(), NODE_PATH);
    let body = props_to_json(&props);
    let result = self.transport().send(HttpMethod::Post, &uri, Some(&body))?;
    if result.status_other_than(STATUS_CREATED) {
      return Err(RestError::UnexpectedStatus {
        method: "POST",
        uri,
        status: result.status,
      });
    }
    self.node_from_create(result)
  }

  /// Create a relationship between two bound nodes, immediately
  pub fn create_relationship(
    &self,
    start: &RestNode,
    end: &RestNode,
    rel_type: &str,
    props: PropMap,
  ) -> Result<RestRelationship> {
    let uri = join_uri(&start.uri()?, RELATIONSHIPS_PATH);
    let mut body = serde_json::Map::new();
    body.insert("to".to_string(), Value::String(end.uri()?));
    body.insert("type".to_string(), Value::String(rel_type.to_string()));
    if !props.is_empty() {
      body.insert("data".to_string(), props_to_json(&props));
    }

    let result = self
      .transport()
      .send(HttpMethod::Post, &uri, Some(&Value::Object(body)))?;
    if result.status_other_than(STATUS_CREATED) {
      return Err(RestError::UnexpectedStatus {
        method: "POST",
        uri,
        status: result.status,
      });
    }

    if result.body.is_some() {
      Ok(RestRelationship::from_payload(
        self,
        EntityPayload::from_result(&result)?,
      ))
    } else {
      let payload = EntityPayload::from_result(&result)?;
      Ok(RestRelationship::from_uri(self, payload.uri))
    }
  }

  /// The server's reference node
  pub fn reference_node(&self) -> Result<RestNode> {
    let result = self.transport().send(HttpMethod::Get, self.base_uri(), None)?;
    let root = result.body_object("service root")?;
    let uri = root
      .get("reference_node")
      .and_then(Value::as_str)
      .ok_or_else(|| RestError::NotFound("reference node".to_string()))?;
    Ok(RestNode::from_uri(self, uri.to_string()))
  }

  /// Index entry point
  pub fn index(&self) -> IndexManager {
    IndexManager::new(self.clone())
  }

  /// List a node's relationships, immediately
  pub fn relationships_of(
    &self,
    node: &RestNode,
    direction: Direction,
  ) -> Result<Vec<RestRelationship>> {
    let uri = join_uri(
      &node.uri()?,
      &format!("{RELATIONSHIPS_PATH}/{}", direction.as_wire()),
    );
    let result = self.transport().send(HttpMethod::Get, &uri, None)?;
    if result.status_other_than(STATUS_OK) {
      return Err(RestError::UnexpectedStatus {
        method: "GET",
        uri,
        status: result.status,
      });
    }
    match EntityListConverter.convert(&result)? {
      Converted::Entities(payloads) => Ok(
        payloads
          .into_iter()
          .map(|payload| RestRelationship::from_payload(self, payload))
          .collect(),
      ),
      _ => Err(RestError::Protocol(
        "relationship listing materialized a non-list".to_string(),
      )),
    }
  }

  /// Delete an entity, immediately
  pub fn delete_entity(&self, entity: &impl GraphEntity) -> Result<()> {
    entity.delete()
  }

  // ==========================================================================
  // Entity support (property collaborator)
  // ==========================================================================

  /// Fetch an entity's property map. Entities without properties answer a
  /// non-OK status; that reads as an empty map, not an error.
  pub(crate) fn fetch_properties(&self, entity_uri: &str) -> Result<PropMap> {
    let uri = join_uri(entity_uri, PROPERTIES_PATH);
    let result = self.transport().send(HttpMethod::Get, &uri, None)?;
    if result.status_other_than(STATUS_OK) {
      return Ok(PropMap::new());
    }
    match &result.body {
      Some(body) => props_from_json(body),
      None => Ok(PropMap::new()),
    }
  }

  /// Fetch an entity's full representation
  pub(crate) fn fetch_representation(&self, entity_uri: &str) -> Result<EntityPayload> {
    let result = self.transport().send(HttpMethod::Get, entity_uri, None)?;
    if result.status_is(STATUS_NOT_FOUND) {
      return Err(RestError::NotFound(entity_uri.to_string()));
    }
    if result.status_other_than(STATUS_OK) {
      return Err(RestError::UnexpectedStatus {
        method: "GET",
        uri: entity_uri.to_string(),
        status: result.status,
      });
    }
    EntityPayload::from_result(&result)
  }

  pub(crate) fn put_property(
    &self,
    entity_uri: &str,
    key: &str,
    value: &PropValue,
  ) -> Result<()> {
    let uri = join_uri(entity_uri, &format!("{PROPERTIES_PATH}/{key}"));
    let body = value.to_json();
    let result = self.transport().send(HttpMethod::Put, &uri, Some(&body))?;
    if !(200..300).contains(&result.status) {
      return Err(RestError::UnexpectedStatus {
        method: "PUT",
        uri,
        status: result.status,
      });
    }
    Ok(())
  }

  pub(crate) fn delete_property(&self, entity_uri: &str, key: &str) -> Result<()> {
    let uri = join_uri(entity_uri, &format!("{PROPERTIES_PATH}/{key}"));
    let result = self.transport().send(HttpMethod::Delete, &uri, None)?;
    if result.status_is(STATUS_NOT_FOUND) {
      return Err(RestError::NotFound(format!("property {key}")));
    }
    if !(200..300).contains(&result.status) {
      return Err(RestError::UnexpectedStatus {
        method: "DELETE",
        uri,
        status: result.status,
      });
    }
    Ok(())
  }

  pub(crate) fn delete_at(&self, entity_uri: &str) -> Result<()> {
    let result = self.transport().send(HttpMethod::Delete, entity_uri, None)?;
    if result.status_is(STATUS_NOT_FOUND) {
      return Err(RestError::NotFound(entity_uri.to_string()));
    }
    if !(200..300).contains(&result.status) {
      return Err(RestError::UnexpectedStatus {
        method: "DELETE",
        uri: entity_uri.to_string(),
        status: result.status,
      });
    }
    Ok(())
  }

  fn node_from_create(&self, result: RequestResult) -> Result<RestNode> {
    if result.body.is_some() {
      Ok(RestNode::from_payload(self, EntityPayload::from_result(&result)?))
    } else {
      let payload = EntityPayload::from_result(&result)?;
      Ok(RestNode::from_uri(self, payload.uri))
    }
  }
}
