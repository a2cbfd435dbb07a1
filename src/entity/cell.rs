//! Client-side entity state
//!
//! An entity returned from a recording call starts out pending: it knows
//! only which batch operation will produce it. The result binder promotes
//! it to bound exactly once; a second bind is an error, and reads before
//! binding are a programming error surfaced as `UnboundEntity`.
//!
//! Bound entities cache their last property snapshot. Reads inside the
//! client's freshness window serve the cache; reads outside it refetch the
//! property map once and re-stamp.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::api::RestApi;
use crate::error::{RestError, Result};
use crate::types::{BatchId, EntityId, EntityRef, PropMap, PropValue};

// ============================================================================
// Snapshot data
// ============================================================================

/// Structural data of a relationship, fixed at creation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RelData {
  pub start_uri: String,
  pub end_uri: String,
  pub rel_type: String,
}

/// Locally cached server-side state of one entity
#[derive(Debug, Clone)]
pub(crate) struct EntityData {
  pub props: PropMap,
  /// Present for relationships only
  pub rel: Option<RelData>,
  pub fetched_at: Instant,
}

impl EntityData {
  pub fn new(props: PropMap, rel: Option<RelData>) -> Self {
    Self {
      props,
      rel,
      fetched_at: Instant::now(),
    }
  }
}

// ============================================================================
// Entity cell
// ============================================================================

enum EntityState {
  /// Awaiting the result of the batch operation with this id
  Pending(BatchId),
  /// Resolved to a server identity, with an optional cached snapshot
  Bound {
    uri: String,
    data: Option<EntityData>,
  },
}

/// Shared state behind every node and relationship handle.
///
/// Handles are cheap clones over an `Arc<EntityCell>`; the batch engine
/// holds the same cell, which is how a placeholder returned at record time
/// becomes valid after the batch completes.
pub struct EntityCell {
  api: RestApi,
  state: RwLock<EntityState>,
}

impl EntityCell {
  pub(crate) fn new_pending(api: RestApi, batch_id: BatchId) -> Arc<Self> {
    Arc::new(Self {
      api,
      state: RwLock::new(EntityState::Pending(batch_id)),
    })
  }

  pub(crate) fn new_bound(api: RestApi, uri: String, data: Option<EntityData>) -> Arc<Self> {
    Arc::new(Self {
      api,
      state: RwLock::new(EntityState::Bound { uri, data }),
    })
  }

  pub(crate) fn api(&self) -> &RestApi {
    &self.api
  }

  // ==========================================================================
  // Identity
  // ==========================================================================

  /// Reference for serialization: the URI when bound, the producing batch
  /// id when pending
  pub(crate) fn entity_ref(&self) -> EntityRef {
    match &*self.state.read() {
      EntityState::Pending(id) => EntityRef::Pending(*id),
      EntityState::Bound { uri, .. } => EntityRef::Resolved(uri.clone()),
    }
  }

  pub(crate) fn uri(&self) -> Result<String> {
    match &*self.state.read() {
      EntityState::Pending(_) => Err(RestError::UnboundEntity),
      EntityState::Bound { uri, .. } => Ok(uri.clone()),
    }
  }

  /// Numeric identity, parsed from the trailing URI segment
  pub(crate) fn id(&self) -> Result<EntityId> {
    let uri = self.uri()?;
    parse_entity_id(&uri)
  }

  pub(crate) fn is_bound(&self) -> bool {
    matches!(&*self.state.read(), EntityState::Bound { .. })
  }

  // ==========================================================================
  // Binding
  // ==========================================================================

  /// Promote a pending entity to bound. Called exactly once by the result
  /// binder; a second call is an `AlreadyBound` error.
  pub(crate) fn bind(&self, uri: String, data: Option<EntityData>) -> Result<()> {
    let mut state = self.state.write();
    match &*state {
      EntityState::Bound { .. } => Err(RestError::AlreadyBound),
      EntityState::Pending(_) => {
        *state = EntityState::Bound { uri, data };
        Ok(())
      }
    }
  }

  /// Replace the cached snapshot of a bound entity (a batched property
  /// fetch completing, or a refetch after the freshness window expired).
  /// Structural relationship data survives the refresh.
  pub(crate) fn refresh_snapshot(&self, props: PropMap) -> Result<()> {
    let mut state = self.state.write();
    match &mut *state {
      EntityState::Pending(_) => Err(RestError::UnboundEntity),
      EntityState::Bound { data, .. } => {
        let rel = data.as_ref().and_then(|d| d.rel.clone());
        *data = Some(EntityData::new(props, rel));
        Ok(())
      }
    }
  }

  /// Drop the cached snapshot; the next read refetches
  pub(crate) fn invalidate(&self) {
    if let EntityState::Bound { data, .. } = &mut *self.state.write() {
      *data = None;
    }
  }

  // ==========================================================================
  // Property access
  // ==========================================================================

  pub(crate) fn property(&self, key: &str) -> Result<Option<PropValue>> {
    self.ensure_fresh()?;
    let state = self.state.read();
    match &*state {
      EntityState::Bound {
        data: Some(data), ..
      } => Ok(data.props.get(key).cloned()),
      _ => Err(RestError::UnboundEntity),
    }
  }

  pub(crate) fn properties(&self) -> Result<PropMap> {
    self.ensure_fresh()?;
    let state = self.state.read();
    match &*state {
      EntityState::Bound {
        data: Some(data), ..
      } => Ok(data.props.clone()),
      _ => Err(RestError::UnboundEntity),
    }
  }

  pub(crate) fn set_property(&self, key: &str, value: PropValue) -> Result<()> {
    let uri = self.uri()?;
    self.api.put_property(&uri, key, &value)?;
    self.invalidate();
    Ok(())
  }

  pub(crate) fn remove_property(&self, key: &str) -> Result<()> {
    let uri = self.uri()?;
    self.api.delete_property(&uri, key)?;
    self.invalidate();
    Ok(())
  }

  pub(crate) fn delete(&self) -> Result<()> {
    let uri = self.uri()?;
    self.api.delete_at(&uri)
  }

  /// Refetch the property map when the cached snapshot is missing or older
  /// than the client's freshness window.
  fn ensure_fresh(&self) -> Result<()> {
    let window = self.api.property_refetch_time();
    let uri = {
      let state = self.state.read();
      match &*state {
        EntityState::Pending(_) => return Err(RestError::UnboundEntity),
        EntityState::Bound { uri, data } => {
          let fresh = data
            .as_ref()
            .is_some_and(|d| d.fetched_at.elapsed() < window);
          if fresh {
            return Ok(());
          }
          uri.clone()
        }
      }
    };

    let props = self.api.fetch_properties(&uri)?;
    self.refresh_snapshot(props)
  }

  // ==========================================================================
  // Structural data (relationships)
  // ==========================================================================

  /// Start/end/type of a relationship. Fetches the full representation
  /// once for entities constructed from a bare URI.
  pub(crate) fn rel_data(&self) -> Result<RelData> {
    let uri = {
      let state = self.state.read();
      match &*state {
        EntityState::Pending(_) => return Err(RestError::UnboundEntity),
        EntityState::Bound { uri, data } => {
          if let Some(rel) = data.as_ref().and_then(|d| d.rel.as_ref()) {
            return Ok(rel.clone());
          }
          uri.clone()
        }
      }
    };

    let payload = self.api.fetch_representation(&uri)?;
    let rel = payload.rel.clone().ok_or_else(|| {
      RestError::Protocol(format!("entity at {uri} has no relationship data"))
    })?;

    let mut state = self.state.write();
    if let EntityState::Bound { data, .. } = &mut *state {
      *data = Some(EntityData::new(payload.props, Some(rel.clone())));
    }
    Ok(rel)
  }
}

/// Parse the numeric identity out of an entity URI
pub(crate) fn parse_entity_id(uri: &str) -> Result<EntityId> {
  uri
    .trim_end_matches('/')
    .rsplit('/')
    .next()
    .and_then(|segment| segment.parse::<EntityId>().ok())
    .ok_or_else(|| RestError::InvalidUri(uri.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::RestApi;

  fn test_api() -> RestApi {
    RestApi::unconnected("http://localhost:7474/db/data")
  }

  #[test]
  fn test_pending_reads_are_errors() {
    let cell = EntityCell::new_pending(test_api(), 3);
    assert!(matches!(cell.uri(), Err(RestError::UnboundEntity)));
    assert!(matches!(cell.id(), Err(RestError::UnboundEntity)));
    assert_eq!(cell.entity_ref(), EntityRef::Pending(3));
  }

  #[test]
  fn test_bind_is_once() {
    let cell = EntityCell::new_pending(test_api(), 0);
    cell
      .bind("http://localhost:7474/db/data/node/7".to_string(), None)
      .unwrap();
    assert_eq!(cell.id().unwrap(), 7);

    let again = cell.bind("http://localhost:7474/db/data/node/8".to_string(), None);
    assert!(matches!(again, Err(RestError::AlreadyBound)));
    // Identity is unchanged after the rejected rebind
    assert_eq!(cell.id().unwrap(), 7);
  }

  #[test]
  fn test_parse_entity_id() {
    assert_eq!(parse_entity_id("http://h/db/data/node/42").unwrap(), 42);
    assert_eq!(parse_entity_id("http://h/db/data/relationship/7/").unwrap(), 7);
    assert!(parse_entity_id("http://h/db/data/node/abc").is_err());
  }
}
