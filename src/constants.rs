//! Wire-protocol constants
//!
//! URL sub-paths, HTTP status codes and index configurations are a fixed
//! external contract; they are collected here rather than scattered through
//! the call sites.

// ============================================================================
// Server sub-paths
// ============================================================================

/// Sub-path for batch submission (POST)
pub const BATCH_PATH: &str = "batch";

/// Sub-path for node creation and lookup
pub const NODE_PATH: &str = "node";

/// Sub-path for relationship lookup
pub const RELATIONSHIP_PATH: &str = "relationship";

/// Sub-path for an entity's property map, relative to the entity URI
pub const PROPERTIES_PATH: &str = "properties";

/// Sub-path for relationship listing, relative to a node URI
pub const RELATIONSHIPS_PATH: &str = "relationships";

/// Sub-path for index management
pub const INDEX_PATH: &str = "index";

/// Sub-path for traversal execution, relative to a node URI
pub const TRAVERSAL_PATH: &str = "traversal";

// ============================================================================
// HTTP status codes the protocol distinguishes
// ============================================================================

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_NOT_FOUND: u16 = 404;

// ============================================================================
// Index configurations
// ============================================================================

/// Exact-match index configuration (the default)
pub const EXACT_INDEX_CONFIG: [(&str, &str); 2] =
  [("provider", "lucene"), ("type", "exact")];

/// Full-text index configuration
pub const FULLTEXT_INDEX_CONFIG: [(&str, &str); 2] =
  [("provider", "lucene"), ("type", "fulltext")];

// ============================================================================
// Client defaults
// ============================================================================

/// Freshness window for cached property snapshots (milliseconds)
pub const DEFAULT_PROPERTY_REFETCH_MS: u64 = 1000;
