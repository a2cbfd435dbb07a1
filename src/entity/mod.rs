//! Client-side entities
//!
//! Nodes and relationships are thin handles over shared cells. A handle
//! returned from a recording call is unbound until its batch completes;
//! reads on an unbound handle return `UnboundEntity` rather than a silent
//! default.

pub(crate) mod cell;
pub(crate) mod converter;
pub mod node;
pub mod relationship;

use std::sync::Arc;

use crate::error::Result;
use crate::types::{EntityId, PropMap, PropValue};

pub use node::RestNode;
pub use relationship::RestRelationship;

#[doc(hidden)]
pub use cell::EntityCell;

// ============================================================================
// Common entity surface
// ============================================================================

/// Operations shared by nodes and relationships.
///
/// Property reads go through the client's refetch cache: a snapshot younger
/// than the freshness window is served locally, anything older triggers one
/// refetch. Property writes are immediate network calls and invalidate the
/// snapshot.
pub trait GraphEntity {
  #[doc(hidden)]
  fn cell(&self) -> &Arc<EntityCell>;

  /// Absolute URI of this entity on the server
  fn uri(&self) -> Result<String> {
    self.cell().uri()
  }

  /// Numeric server-side identity
  fn id(&self) -> Result<EntityId> {
    self.cell().id()
  }

  /// Whether this entity has a server identity yet
  fn is_bound(&self) -> bool {
    self.cell().is_bound()
  }

  fn property(&self, key: &str) -> Result<Option<PropValue>> {
    self.cell().property(key)
  }

  fn has_property(&self, key: &str) -> Result<bool> {
    Ok(self.cell().property(key)?.is_some())
  }

  fn properties(&self) -> Result<PropMap> {
    self.cell().properties()
  }

  /// Set one property, immediately
  fn set_property(&self, key: &str, value: impl Into<PropValue>) -> Result<()>
  where
    Self: Sized,
  {
    self.cell().set_property(key, value.into())
  }

  /// Remove one property, immediately
  fn remove_property(&self, key: &str) -> Result<()> {
    self.cell().remove_property(key)
  }

  /// Delete this entity on the server
  fn delete(&self) -> Result<()> {
    self.cell().delete()
  }
}
