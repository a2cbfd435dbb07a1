//! restgraph - Graph database client over HTTP
//!
//! A client library that exposes a graph-database programming surface
//! (nodes, relationships, properties, indexes) backed entirely by HTTP
//! calls to a remote graph server.
//!
//! # Architecture
//!
//! The core is the **batched-operation execution engine**: mutation calls
//! made through a [`BatchHandle`] are recorded instead of executed, the
//! whole sequence goes to the server as a single request, and the response
//! is correlated by batch id, materialized into typed entities and bound
//! back into the placeholders returned at record time. Operations that
//! reference entities created earlier in the same batch travel as
//! intra-batch placeholders, because their URIs do not exist yet.
//!
//! - **Recording**: one operation per mutation call, batch ids assigned in
//!   recording order
//! - **Building**: ledger → wire descriptors, `{N}` placeholder rewriting
//! - **Correlation**: response fragments matched by id, never by position
//! - **Binding**: placeholders resolve exactly once; reads before binding
//!   are typed errors

#![deny(clippy::all)]

// Core modules
pub mod constants;
pub mod error;
pub mod types;

// Transport layer
pub mod transport;

// Client-side entities
pub mod entity;

// Batched operation execution
pub mod batch;

// Index surface
pub mod index;

// Traversal descriptions
pub mod traversal;

// Client entry point
pub mod api;

// Re-export commonly used items
pub use error::{RestError, Result};

pub use api::RestApi;
pub use batch::{BatchHandle, RecordedRelationships};
pub use entity::{GraphEntity, RestNode, RestRelationship};
pub use index::{IndexHits, IndexManager, NodeIndex, RelationshipIndex};
pub use transport::{HttpMethod, HttpTransport, RequestResult, Transport};
pub use traversal::{Path, TraversalDescription, TraversalOrder, Uniqueness};
pub use types::{BatchId, Direction, EntityId, EntityRef, PropMap, PropValue};
