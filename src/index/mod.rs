//! Index surface
//!
//! Indexes are keyed by (index name, key, value, entity). Additions and
//! removals are batchable; queries always execute immediately against the
//! server. Node and relationship indexes share one core and differ only in
//! the entity type their hits materialize into.

use serde_json::{json, Value};

use crate::api::RestApi;
use crate::constants::{EXACT_INDEX_CONFIG, INDEX_PATH, STATUS_CREATED, STATUS_OK};
use crate::entity::converter::{Converted, EntityListConverter, EntityPayload, ResultConverter};
use crate::entity::{GraphEntity, RestNode, RestRelationship};
use crate::error::{RestError, Result};
use crate::transport::{join_uri, HttpMethod};
use crate::types::{EntityId, PropValue};

// ============================================================================
// Index manager
// ============================================================================

/// Entry point for index lookup and creation
pub struct IndexManager {
  api: RestApi,
}

impl IndexManager {
  pub(crate) fn new(api: RestApi) -> Self {
    Self { api }
  }

  /// Node index with the exact-match configuration, created when missing
  pub fn for_nodes(&self, name: &str) -> Result<NodeIndex> {
    self.for_nodes_with_config(name, &EXACT_INDEX_CONFIG)
  }

  /// Node index with an explicit configuration, created when missing
  pub fn for_nodes_with_config(&self, name: &str, config: &[(&str, &str)]) -> Result<NodeIndex> {
    let core = IndexCore::new(self.api.clone(), IndexKind::Node, name);
    core.ensure_exists(config)?;
    Ok(NodeIndex { core })
  }

  /// Relationship index with the exact-match configuration, created when
  /// missing
  pub fn for_relationships(&self, name: &str) -> Result<RelationshipIndex> {
    self.for_relationships_with_config(name, &EXACT_INDEX_CONFIG)
  }

  /// Relationship index with an explicit configuration, created when
  /// missing
  pub fn for_relationships_with_config(
    &self,
    name: &str,
    config: &[(&str, &str)],
  ) -> Result<RelationshipIndex> {
    let core = IndexCore::new(self.api.clone(), IndexKind::Relationship, name);
    core.ensure_exists(config)?;
    Ok(RelationshipIndex { core })
  }

  /// Existing node index, without creating one; `NoSuchIndex` when absent
  pub fn get_node_index(&self, name: &str) -> Result<NodeIndex> {
    if !self.node_index_exists(name)? {
      return Err(RestError::NoSuchIndex(name.to_string()));
    }
    Ok(NodeIndex {
      core: IndexCore::new(self.api.clone(), IndexKind::Node, name),
    })
  }

  /// Existing relationship index, without creating one; `NoSuchIndex` when
  /// absent
  pub fn get_relationship_index(&self, name: &str) -> Result<RelationshipIndex> {
    if !self.relationship_index_exists(name)? {
      return Err(RestError::NoSuchIndex(name.to_string()));
    }
    Ok(RelationshipIndex {
      core: IndexCore::new(self.api.clone(), IndexKind::Relationship, name),
    })
  }

  pub fn node_index_exists(&self, name: &str) -> Result<bool> {
    self.kind_exists(IndexKind::Node, name)
  }

  pub fn relationship_index_exists(&self, name: &str) -> Result<bool> {
    self.kind_exists(IndexKind::Relationship, name)
  }

  fn kind_exists(&self, kind: IndexKind, name: &str) -> Result<bool> {
    let uri = join_uri(self.api.base_uri(), &format!("{INDEX_PATH}/{}", kind.segment()));
    let result = self.api.transport().send(HttpMethod::Get, &uri, None)?;
    // The listing is an object keyed by index name; servers answer 204 with
    // no body when no index of the kind exists yet.
    Ok(
      result
        .body
        .as_ref()
        .and_then(Value::as_object)
        .is_some_and(|listing| listing.contains_key(name)),
    )
  }
}

// ============================================================================
// Index core
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndexKind {
  Node,
  Relationship,
}

impl IndexKind {
  fn segment(&self) -> &'static str {
    match self {
      IndexKind::Node => "node",
      IndexKind::Relationship => "relationship",
    }
  }
}

/// Shared implementation behind both index types
pub(crate) struct IndexCore {
  api: RestApi,
  kind: IndexKind,
  name: String,
}

impl IndexCore {
  fn new(api: RestApi, kind: IndexKind, name: &str) -> Self {
    Self {
      api,
      kind,
      name: name.to_string(),
    }
  }

  /// `index/{kind}/{name}`, relative to the client base
  fn index_path(&self) -> String {
    format!("{INDEX_PATH}/{}/{}", self.kind.segment(), self.name)
  }

  /// `index/{kind}/{name}/{key}/{value}`, relative to the client base
  fn entry_path(&self, key: &str, value: &PropValue) -> Result<String> {
    Ok(format!("{}/{key}/{}", self.index_path(), value_segment(value)?))
  }

  /// Removal path scoped by whichever of key/value are given, ending in
  /// the entity id
  fn removal_path(
    &self,
    entity_id: EntityId,
    key: Option<&str>,
    value: Option<&PropValue>,
  ) -> Result<String> {
    let mut path = self.index_path();
    if let Some(key) = key {
      path = format!("{path}/{key}");
      if let Some(value) = value {
        path = format!("{path}/{}", value_segment(value)?);
      }
    }
    Ok(format!("{path}/{entity_id}"))
  }

  fn ensure_exists(&self, config: &[(&str, &str)]) -> Result<()> {
    let listing_uri = join_uri(
      self.api.base_uri(),
      &format!("{INDEX_PATH}/{}", self.kind.segment()),
    );
    let listing = self.api.transport().send(HttpMethod::Get, &listing_uri, None)?;
    let exists = listing
      .body
      .as_ref()
      .and_then(Value::as_object)
      .is_some_and(|map| map.contains_key(&self.name));
    if exists {
      return Ok(());
    }

    let config_map = config
      .iter()
      .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
      .collect::<serde_json::Map<String, Value>>();
    let body = json!({"name": self.name, "config": config_map});
    let uri = join_uri(
      self.api.base_uri(),
      &format!("{INDEX_PATH}/{}", self.kind.segment()),
    );
    let result = self.api.transport().send(HttpMethod::Post, &uri, Some(&body))?;
    if result.status_other_than(STATUS_CREATED) && result.status_other_than(STATUS_OK) {
      return Err(RestError::UnexpectedStatus {
        method: "POST",
        uri,
        status: result.status,
      });
    }
    Ok(())
  }

  /// Immediate index-entry addition: POST the entity URI to the entry path
  fn add(&self, entity_uri: &str, key: &str, value: &PropValue) -> Result<()> {
    let path = self.entry_path(key, value)?;
    let uri = join_uri(self.api.base_uri(), &path);
    let body = Value::String(entity_uri.to_string());
    let result = self.api.transport().send(HttpMethod::Post, &uri, Some(&body))?;
    if result.status_other_than(STATUS_CREATED) {
      return Err(RestError::UnexpectedStatus {
        method: "POST",
        uri,
        status: result.status,
      });
    }
    Ok(())
  }

  fn remove(
    &self,
    entity_id: EntityId,
    key: Option<&str>,
    value: Option<&PropValue>,
  ) -> Result<()> {
    let path = self.removal_path(entity_id, key, value)?;
    let uri = join_uri(self.api.base_uri(), &path);
    let result = self.api.transport().send(HttpMethod::Delete, &uri, None)?;
    if !(200..300).contains(&result.status) {
      return Err(RestError::UnexpectedStatus {
        method: "DELETE",
        uri,
        status: result.status,
      });
    }
    Ok(())
  }

  /// Exact lookup; a non-OK answer is an empty hit list, not an error
  fn lookup(&self, key: &str, value: &PropValue) -> Result<Vec<EntityPayload>> {
    let path = self.entry_path(key, value)?;
    self.fetch_hits(&join_uri(self.api.base_uri(), &path))
  }

  /// Query-syntax search against one key
  fn search(&self, key: &str, query: &str) -> Result<Vec<EntityPayload>> {
    let uri = format!(
      "{}?query={query}",
      join_uri(self.api.base_uri(), &format!("{}/{key}", self.index_path()))
    );
    self.fetch_hits(&uri)
  }

  fn fetch_hits(&self, uri: &str) -> Result<Vec<EntityPayload>> {
    let result = self.api.transport().send(HttpMethod::Get, uri, None)?;
    if result.status_other_than(STATUS_OK) {
      return Ok(Vec::new());
    }
    match EntityListConverter.convert(&result)? {
      Converted::Entities(payloads) => Ok(payloads),
      _ => Err(RestError::Protocol("index query materialized a non-list".to_string())),
    }
  }

  fn delete(&self) -> Result<()> {
    let uri = join_uri(self.api.base_uri(), &self.index_path());
    let result = self.api.transport().send(HttpMethod::Delete, &uri, None)?;
    if !(200..300).contains(&result.status) {
      return Err(RestError::UnexpectedStatus {
        method: "DELETE",
        uri,
        status: result.status,
      });
    }
    Ok(())
  }
}

/// Render a property value as an index path segment; array values cannot
/// key an index entry.
fn value_segment(value: &PropValue) -> Result<String> {
  match value {
    PropValue::String(s) => Ok(s.clone()),
    PropValue::Int(v) => Ok(v.to_string()),
    PropValue::Float(v) => Ok(v.to_string()),
    PropValue::Bool(v) => Ok(v.to_string()),
    other => Err(RestError::InvalidProperty(format!(
      "array values cannot key an index entry: {other:?}"
    ))),
  }
}

// ============================================================================
// Typed indexes
// ============================================================================

/// Index over nodes
pub struct NodeIndex {
  core: IndexCore,
}

impl NodeIndex {
  pub fn name(&self) -> &str {
    &self.core.name
  }

  /// Add an index entry, immediately
  pub fn add(&self, node: &RestNode, key: &str, value: impl Into<PropValue>) -> Result<()> {
    self.core.add(&node.uri()?, key, &value.into())
  }

  /// Remove index entries for a node, scoped by whichever of key/value are
  /// given
  pub fn remove(
    &self,
    node: &RestNode,
    key: Option<&str>,
    value: Option<&PropValue>,
  ) -> Result<()> {
    self.core.remove(node.id()?, key, value)
  }

  /// Exact lookup, always immediate
  pub fn get(&self, key: &str, value: impl Into<PropValue>) -> Result<IndexHits<RestNode>> {
    let payloads = self.core.lookup(key, &value.into())?;
    Ok(IndexHits::new(
      payloads
        .into_iter()
        .map(|p| RestNode::from_payload(&self.core.api, p))
        .collect(),
    ))
  }

  /// Query-syntax search, always immediate
  pub fn query(&self, key: &str, query: &str) -> Result<IndexHits<RestNode>> {
    let payloads = self.core.search(key, query)?;
    Ok(IndexHits::new(
      payloads
        .into_iter()
        .map(|p| RestNode::from_payload(&self.core.api, p))
        .collect(),
    ))
  }

  /// Delete the whole index
  pub fn delete(self) -> Result<()> {
    self.core.delete()
  }

  pub(crate) fn entry_path(&self, key: &str, value: &PropValue) -> Result<String> {
    self.core.entry_path(key, value)
  }

  pub(crate) fn removal_path(
    &self,
    entity_id: EntityId,
    key: Option<&str>,
    value: Option<&PropValue>,
  ) -> Result<String> {
    self.core.removal_path(entity_id, key, value)
  }
}

/// Index over relationships
pub struct RelationshipIndex {
  core: IndexCore,
}

impl RelationshipIndex {
  pub fn name(&self) -> &str {
    &self.core.name
  }

  pub fn add(
    &self,
    rel: &RestRelationship,
    key: &str,
    value: impl Into<PropValue>,
  ) -> Result<()> {
    self.core.add(&rel.uri()?, key, &value.into())
  }

  pub fn remove(
    &self,
    rel: &RestRelationship,
    key: Option<&str>,
    value: Option<&PropValue>,
  ) -> Result<()> {
    self.core.remove(rel.id()?, key, value)
  }

  pub fn get(&self, key: &str, value: impl Into<PropValue>) -> Result<IndexHits<RestRelationship>> {
    let payloads = self.core.lookup(key, &value.into())?;
    Ok(IndexHits::new(
      payloads
        .into_iter()
        .map(|p| RestRelationship::from_payload(&self.core.api, p))
        .collect(),
    ))
  }

  pub fn query(&self, key: &str, query: &str) -> Result<IndexHits<RestRelationship>> {
    let payloads = self.core.search(key, query)?;
    Ok(IndexHits::new(
      payloads
        .into_iter()
        .map(|p| RestRelationship::from_payload(&self.core.api, p))
        .collect(),
    ))
  }

  pub fn delete(self) -> Result<()> {
    self.core.delete()
  }

  pub(crate) fn entry_path(&self, key: &str, value: &PropValue) -> Result<String> {
    self.core.entry_path(key, value)
  }

  pub(crate) fn removal_path(
    &self,
    entity_id: EntityId,
    key: Option<&str>,
    value: Option<&PropValue>,
  ) -> Result<String> {
    self.core.removal_path(entity_id, key, value)
  }
}

// ============================================================================
// Index hits
// ============================================================================

/// Materialized index query result
pub struct IndexHits<T> {
  hits: std::vec::IntoIter<T>,
  expected_size: usize,
}

impl<T> IndexHits<T> {
  fn new(hits: Vec<T>) -> Self {
    let expected_size = hits.len();
    Self {
      hits: hits.into_iter(),
      expected_size,
    }
  }

  /// Number of hits the server reported
  pub fn expected_size(&self) -> usize {
    self.expected_size
  }

  /// The single hit, when there is exactly one left
  pub fn single(mut self) -> Option<T> {
    let first = self.hits.next();
    match self.hits.next() {
      None => first,
      Some(_) => None,
    }
  }
}

impl<T> Iterator for IndexHits<T> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    self.hits.next()
  }
}

// ============================================================================
// Tests
// ============================================================================
