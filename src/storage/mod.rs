//! Storage layer: exact-state snapshots and the shared index handle.
//!
//! Snapshots are bincode payloads framed by a versioned header and a CRC32
//! footer, written with atomic temp-file + rename.

/// Disk persistence: snapshot save/load with atomic writes.
pub mod persistence;
/// Thread-safe handle around a single index.
pub mod shared;

pub use persistence::{decode_snapshot, encode_snapshot, load_index, save_index};
pub use shared::SharedIndex;
