//! Batch recording and submission
//!
//! A [`BatchHandle`] owns the ledger for exactly one batch. Recording calls
//! return placeholders immediately and perform no network I/O; `submit`
//! consumes the handle, performs the single network round trip and binds
//! every placeholder. Dropping the handle before submission discards the
//! batch with no side effects.

use log::debug;

use super::bind::bind_results;
use super::builder::build_batch_request;
use super::correlate::correlate;
use super::operation::{
  BindTarget, OpBody, OpMethod, OpTarget, Operation, OperationLedger, RecordedRelationships,
  RelListCell,
};
use crate::api::RestApi;
use crate::constants::{
  BATCH_PATH, NODE_PATH, PROPERTIES_PATH, RELATIONSHIPS_PATH, RELATIONSHIP_PATH,
};
use crate::entity::cell::EntityCell;
use crate::entity::converter::{EntityExtractor, EntityListConverter, PropertiesConverter};
use crate::entity::{GraphEntity, RestNode, RestRelationship};
use crate::error::Result;
use crate::index::{NodeIndex, RelationshipIndex};
use crate::transport::{join_uri, HttpMethod};
use crate::types::{props_to_json, Direction, EntityId, PropMap, PropValue};

/// Recording context for one batch.
///
/// All mutation calls made through the handle are recorded instead of
/// executed; the entities they return are unbound until [`submit`]
/// completes.
///
/// [`submit`]: BatchHandle::submit
pub struct BatchHandle {
  api: RestApi,
  ledger: OperationLedger,
}

impl BatchHandle {
  pub(crate) fn new(api: RestApi) -> Self {
    Self {
      api,
      ledger: OperationLedger::new(),
    }
  }

  /// Number of operations recorded so far
  pub fn operation_count(&self) -> usize {
    self.ledger.len()
  }

  fn base_uri(&self) -> String {
    self.api.base_uri().to_string()
  }

  // ==========================================================================
  // Recording: entities
  // ==========================================================================

  /// Record a node creation; the returned node is unbound until the batch
  /// completes.
  pub fn create_node(&mut self, props: PropMap) -> RestNode {
    let batch_id = self.ledger.alloc_id();
    let cell = EntityCell::new_pending(self.api.clone(), batch_id);
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::Create,
      target: OpTarget::root(NODE_PATH),
      body: Some(OpBody::Json(props_to_json(&props))),
      base_uri: self.base_uri(),
      converter: Some(Box::new(EntityExtractor)),
      bind: Some(BindTarget::Entity(cell.clone())),
    });
    RestNode::from_cell(cell)
  }

  /// Record a relationship creation between two nodes, either of which may
  /// be unbound entities from this same batch.
  pub fn create_relationship(
    &mut self,
    start: &RestNode,
    end: &RestNode,
    rel_type: &str,
    props: PropMap,
  ) -> RestRelationship {
    let batch_id = self.ledger.alloc_id();
    let cell = EntityCell::new_pending(self.api.clone(), batch_id);
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::Create,
      target: OpTarget::entity(start.cell().entity_ref(), RELATIONSHIPS_PATH),
      body: Some(OpBody::Relationship {
        to: end.cell().entity_ref(),
        rel_type: rel_type.to_string(),
        props,
      }),
      base_uri: self.base_uri(),
      converter: Some(Box::new(EntityExtractor)),
      bind: Some(BindTarget::Entity(cell.clone())),
    });
    RestRelationship::from_cell(cell)
  }

  /// Record a node fetch by id
  pub fn get_node(&mut self, id: EntityId) -> RestNode {
    let batch_id = self.ledger.alloc_id();
    let cell = EntityCell::new_pending(self.api.clone(), batch_id);
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::Get,
      target: OpTarget::root(format!("{NODE_PATH}/{id}")),
      body: None,
      base_uri: self.base_uri(),
      converter: Some(Box::new(EntityExtractor)),
      bind: Some(BindTarget::Entity(cell.clone())),
    });
    RestNode::from_cell(cell)
  }

  /// Record a relationship fetch by id
  pub fn get_relationship(&mut self, id: EntityId) -> RestRelationship {
    let batch_id = self.ledger.alloc_id();
    let cell = EntityCell::new_pending(self.api.clone(), batch_id);
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::Get,
      target: OpTarget::root(format!("{RELATIONSHIP_PATH}/{id}")),
      body: None,
      base_uri: self.base_uri(),
      converter: Some(Box::new(EntityExtractor)),
      bind: Some(BindTarget::Entity(cell.clone())),
    });
    RestRelationship::from_cell(cell)
  }

  /// Record a relationship listing; the result is readable once the batch
  /// completes.
  pub fn get_relationships(
    &mut self,
    node: &RestNode,
    direction: Direction,
  ) -> RecordedRelationships {
    let batch_id = self.ledger.alloc_id();
    let cell = RelListCell::new_pending();
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::Query,
      target: OpTarget::entity(
        node.cell().entity_ref(),
        format!("{RELATIONSHIPS_PATH}/{}", direction.as_wire()),
      ),
      body: None,
      base_uri: self.base_uri(),
      converter: Some(Box::new(EntityListConverter)),
      bind: Some(BindTarget::Relationships(cell.clone())),
    });
    RecordedRelationships::from_cell(cell)
  }

  // ==========================================================================
  // Recording: properties
  // ==========================================================================

  /// Record a property fetch; when the batch completes the entity's cached
  /// snapshot holds the result.
  pub fn fetch_properties(&mut self, entity: &impl GraphEntity) {
    let batch_id = self.ledger.alloc_id();
    let cell = entity.cell().clone();
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::Get,
      target: OpTarget::entity(cell.entity_ref(), PROPERTIES_PATH),
      body: None,
      base_uri: self.base_uri(),
      converter: Some(Box::new(PropertiesConverter)),
      bind: Some(BindTarget::Snapshot(cell)),
    });
  }

  /// Record a single-property write
  pub fn set_property(
    &mut self,
    entity: &impl GraphEntity,
    key: &str,
    value: impl Into<PropValue>,
  ) {
    let batch_id = self.ledger.alloc_id();
    let cell = entity.cell().clone();
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::SetProperty,
      target: OpTarget::entity(cell.entity_ref(), format!("{PROPERTIES_PATH}/{key}")),
      body: Some(OpBody::Json(value.into().to_json())),
      base_uri: self.base_uri(),
      converter: None,
      bind: Some(BindTarget::Invalidate(cell)),
    });
  }

  /// Record a single-property removal
  pub fn remove_property(&mut self, entity: &impl GraphEntity, key: &str) {
    let batch_id = self.ledger.alloc_id();
    let cell = entity.cell().clone();
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::Delete,
      target: OpTarget::entity(cell.entity_ref(), format!("{PROPERTIES_PATH}/{key}")),
      body: None,
      base_uri: self.base_uri(),
      converter: None,
      bind: Some(BindTarget::Invalidate(cell)),
    });
  }

  /// Record an entity deletion
  pub fn delete(&mut self, entity: &impl GraphEntity) {
    let batch_id = self.ledger.alloc_id();
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::Delete,
      target: OpTarget::entity(entity.cell().entity_ref(), ""),
      body: None,
      base_uri: self.base_uri(),
      converter: None,
      bind: None,
    });
  }

  // ==========================================================================
  // Recording: indexes
  // ==========================================================================

  /// Record an index-entry addition; the node may be unbound from this
  /// same batch.
  pub fn add_to_node_index(
    &mut self,
    index: &NodeIndex,
    node: &RestNode,
    key: &str,
    value: impl Into<PropValue>,
  ) -> Result<()> {
    self.record_index_add(index.entry_path(key, &value.into())?, node)
  }

  /// Record an index-entry removal. The node must already be bound: the
  /// removal path is keyed by its numeric id, which placeholders cannot
  /// express.
  pub fn remove_from_node_index(
    &mut self,
    index: &NodeIndex,
    node: &RestNode,
    key: Option<&str>,
    value: Option<&PropValue>,
  ) -> Result<()> {
    self.record_index_remove(index.removal_path(node.id()?, key, value)?)
  }

  /// Record an index-entry addition for a relationship
  pub fn add_to_relationship_index(
    &mut self,
    index: &RelationshipIndex,
    rel: &RestRelationship,
    key: &str,
    value: impl Into<PropValue>,
  ) -> Result<()> {
    self.record_index_add(index.entry_path(key, &value.into())?, rel)
  }

  /// Record an index-entry removal for a relationship
  pub fn remove_from_relationship_index(
    &mut self,
    index: &RelationshipIndex,
    rel: &RestRelationship,
    key: Option<&str>,
    value: Option<&PropValue>,
  ) -> Result<()> {
    self.record_index_remove(index.removal_path(rel.id()?, key, value)?)
  }

  fn record_index_add(&mut self, path: String, entity: &impl GraphEntity) -> Result<()> {
    let batch_id = self.ledger.alloc_id();
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::AddToIndex,
      target: OpTarget::root(path),
      body: Some(OpBody::IndexEntry {
        entity: entity.cell().entity_ref(),
      }),
      base_uri: self.base_uri(),
      converter: None,
      bind: None,
    });
    Ok(())
  }

  fn record_index_remove(&mut self, path: String) -> Result<()> {
    let batch_id = self.ledger.alloc_id();
    self.ledger.insert(Operation {
      batch_id,
      method: OpMethod::RemoveFromIndex,
      target: OpTarget::root(path),
      body: None,
      base_uri: self.base_uri(),
      converter: None,
      bind: None,
    });
    Ok(())
  }

  // ==========================================================================
  // Lifecycle
  // ==========================================================================

  /// Submit the batch: one network round trip, then bind every recorded
  /// operation's result into the placeholders returned at record time.
  ///
  /// Consumes the handle; a batch cannot be submitted twice. An empty
  /// batch is a legal no-op and short-circuits without a network call.
  pub fn submit(self) -> Result<()> {
    let Self { api, ledger } = self;

    if ledger.is_empty() {
      debug!("empty batch, skipping submission");
      return Ok(());
    }

    let entries = build_batch_request(&ledger, api.base_uri());
    let body = serde_json::to_value(&entries)?;
    debug!("submitting batch of {} operations", ledger.len());

    let response = api.transport().send(
      HttpMethod::Post,
      &join_uri(api.base_uri(), BATCH_PATH),
      Some(&body),
    )?;

    let fragments = correlate(&ledger, &response)?;
    bind_results(&api, ledger, fragments)
  }

  /// Abandon the batch without submitting. Side-effect-free: no network
  /// call happened, and the unbound placeholders stay permanently unbound.
  pub fn discard(self) {
    debug!("discarding batch of {} operations", self.ledger.len());
  }
}
