//! Error types for restgraph
//!
//! A single crate-wide error enum. Batch-level failures, protocol defects
//! and per-entity application errors are distinct variants so callers can
//! tell "my batch was rejected outright" from "one operation logically
//! failed" from "the network was unreachable".

use serde_json::Value;
use thiserror::Error;

/// All errors surfaced by the client
#[derive(Error, Debug)]
pub enum RestError {
  /// The network call itself did not complete
  #[error("transport error: {0}")]
  Transport(String),

  /// The server rejected the whole batch with a single error payload.
  /// The payload is carried verbatim.
  #[error("batch rejected by server: {0}")]
  BatchRejected(Value),

  /// The response violated the wire contract (unknown batch id, missing
  /// result for an operation that expected one, malformed fragment)
  #[error("protocol error: {0}")]
  Protocol(String),

  /// A directly fetched entity does not exist on the server
  #[error("entity not found: {0}")]
  NotFound(String),

  /// The server answered with a status outside the expected set
  #[error("unexpected status {status} from {method} {uri}")]
  UnexpectedStatus {
    method: &'static str,
    uri: String,
    status: u16,
  },

  /// The entity has no server identity yet; its batch has not completed
  #[error("entity is not bound to a server identity yet")]
  UnboundEntity,

  /// A second bind was attempted on an already-bound entity
  #[error("entity is already bound")]
  AlreadyBound,

  /// A property value could not be represented on the wire
  #[error("invalid property value: {0}")]
  InvalidProperty(String),

  /// An entity URI did not have the expected shape
  #[error("invalid entity uri: {0}")]
  InvalidUri(String),

  /// The named index does not exist
  #[error("index {0} does not exist")]
  NoSuchIndex(String),

  /// JSON (de)serialization failure
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, RestError>;
