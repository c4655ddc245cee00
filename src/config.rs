//! Global configuration constants for hnsw-index.
//!
//! Tuning defaults used by [`HnswConfig::default`](crate::hnsw::HnswConfig) and
//! snapshot format constants. Runtime configuration lives in `HnswConfig`.

/// Default number of bidirectional links per HNSW node.
///
/// Higher values improve recall but increase memory and build time.
/// Typical range: 8–64. Default: 16.
pub const HNSW_DEFAULT_M: usize = 16;

/// Default ef parameter during HNSW index construction.
///
/// Controls the size of the dynamic candidate list during insertion.
/// Higher values produce a better graph but slow down build time.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default ef parameter during HNSW search.
///
/// Used by `search_knn_default`. Higher values improve recall at the cost of latency.
pub const HNSW_DEFAULT_EF_SEARCH: usize = 50;

/// Maximum number of layers in the HNSW graph.
pub const HNSW_DEFAULT_MAX_LAYERS: usize = 16;

/// Upper bound on `max_layers`; node levels are stored as `u8`.
pub const HNSW_MAX_LAYERS_LIMIT: usize = 256;

/// Default seed for the level sampler RNG.
pub const HNSW_DEFAULT_SEED: u64 = 0x5EED_5EED;

/// Magic bytes at the start of every snapshot file.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"HNSW";

/// Snapshot format version written by this build.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Magic bytes preceding the CRC32 footer.
pub const SNAPSHOT_CRC_MAGIC: &[u8; 4] = b"HCR1";
