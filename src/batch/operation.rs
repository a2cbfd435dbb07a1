//! Recorded operations and the batch ledger
//!
//! A recording call produces one [`Operation`] instead of a network call.
//! The ledger assigns batch ids in recording order; the id is the only
//! correlation key between the batch request and its response.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::entity::cell::EntityCell;
use crate::entity::converter::ResultConverter;
use crate::entity::RestRelationship;
use crate::error::{RestError, Result};
use crate::transport::HttpMethod;
use crate::types::{BatchId, EntityRef, PropMap};

// ============================================================================
// Operation method
// ============================================================================

/// Logical method of a recorded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMethod {
  Create,
  Get,
  SetProperty,
  Delete,
  AddToIndex,
  RemoveFromIndex,
  Query,
}

impl OpMethod {
  /// HTTP verb this operation uses on the wire
  pub fn http_method(&self) -> HttpMethod {
    match self {
      OpMethod::Create | OpMethod::AddToIndex => HttpMethod::Post,
      OpMethod::Get | OpMethod::Query => HttpMethod::Get,
      OpMethod::SetProperty => HttpMethod::Put,
      OpMethod::Delete | OpMethod::RemoveFromIndex => HttpMethod::Delete,
    }
  }
}

// ============================================================================
// Operation target and payload
// ============================================================================

/// Where an operation's request is aimed: a path hanging off an entity
/// reference, or off the service root.
#[derive(Debug, Clone)]
pub(crate) struct OpTarget {
  /// Entity the path hangs off; `None` means the service root
  pub base: Option<EntityRef>,
  /// Path suffix relative to the base; may be empty
  pub suffix: String,
}

impl OpTarget {
  pub fn root(suffix: impl Into<String>) -> Self {
    Self {
      base: None,
      suffix: suffix.into(),
    }
  }

  pub fn entity(reference: EntityRef, suffix: impl Into<String>) -> Self {
    Self {
      base: Some(reference),
      suffix: suffix.into(),
    }
  }
}

/// Request payload of a recorded operation.
///
/// Payloads that embed entity references keep them as references; the
/// request builder rewrites them into placeholder syntax or URIs once the
/// full ledger is known.
#[derive(Debug, Clone)]
pub(crate) enum OpBody {
  /// Literal JSON payload
  Json(serde_json::Value),
  /// Relationship creation: the end node is rewritten by the builder
  Relationship {
    to: EntityRef,
    rel_type: String,
    props: PropMap,
  },
  /// Index entry addition: the entity URI string is rewritten by the
  /// builder
  IndexEntry { entity: EntityRef },
}

// ============================================================================
// Bind target
// ============================================================================

/// What the result binder updates once the operation's fragment is known
pub(crate) enum BindTarget {
  /// Bind a pending entity to its materialized representation
  Entity(Arc<EntityCell>),
  /// Fill a pending relationship-list placeholder
  Relationships(Arc<RelListCell>),
  /// Refresh the target's cached snapshot from a property-map result
  Snapshot(Arc<EntityCell>),
  /// Drop the target's cached snapshot once the operation completes
  Invalidate(Arc<EntityCell>),
}

// ============================================================================
// Operation
// ============================================================================

/// One recorded graph operation awaiting batch submission
pub(crate) struct Operation {
  pub batch_id: BatchId,
  pub method: OpMethod,
  pub target: OpTarget,
  pub body: Option<OpBody>,
  /// Base URI of the client the operation was recorded against
  pub base_uri: String,
  /// Present when the operation expects an entity-shaped result
  pub converter: Option<Box<dyn ResultConverter>>,
  pub bind: Option<BindTarget>,
}

// ============================================================================
// Ledger
// ============================================================================

/// Ordered, id-indexed collection of the operations recorded for one batch.
///
/// Owned exclusively by one in-flight batch; insertion order drives the
/// request array, correlation relies on ids alone.
pub(crate) struct OperationLedger {
  ops: IndexMap<BatchId, Operation>,
  next_id: BatchId,
}

impl OperationLedger {
  pub fn new() -> Self {
    Self {
      ops: IndexMap::new(),
      next_id: 0,
    }
  }

  /// Allocate the next batch id, in strict recording order
  pub fn alloc_id(&mut self) -> BatchId {
    let id = self.next_id;
    self.next_id += 1;
    id
  }

  pub fn insert(&mut self, op: Operation) {
    let replaced = self.ops.insert(op.batch_id, op);
    debug_assert!(replaced.is_none(), "batch id recorded twice");
  }

  pub fn len(&self) -> usize {
    self.ops.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }

  pub fn contains(&self, id: BatchId) -> bool {
    self.ops.contains_key(&id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Operation> {
    self.ops.values()
  }
}

// ============================================================================
// Relationship-list placeholder
// ============================================================================

pub(crate) struct RelListCell {
  state: RwLock<Option<Vec<RestRelationship>>>,
}

impl RelListCell {
  pub fn new_pending() -> Arc<Self> {
    Arc::new(Self {
      state: RwLock::new(None),
    })
  }

  pub fn fill(&self, rels: Vec<RestRelationship>) -> Result<()> {
    let mut state = self.state.write();
    if state.is_some() {
      return Err(RestError::AlreadyBound);
    }
    *state = Some(rels);
    Ok(())
  }

  pub fn get(&self) -> Result<Vec<RestRelationship>> {
    self.state.read().clone().ok_or(RestError::UnboundEntity)
  }
}

/// Placeholder for a relationship listing recorded inside a batch.
///
/// `get` returns `UnboundEntity` until the batch completes.
#[derive(Clone)]
pub struct RecordedRelationships {
  cell: Arc<RelListCell>,
}

impl RecordedRelationships {
  pub(crate) fn from_cell(cell: Arc<RelListCell>) -> Self {
    Self { cell }
  }

  pub fn get(&self) -> Result<Vec<RestRelationship>> {
    self.cell.get()
  }
}

// ============================================================================
// Tests
// ============================================================================
