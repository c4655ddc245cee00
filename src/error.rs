use thiserror::Error;

use crate::hnsw::Label;

/// Error type for all index operations.
#[derive(Error, Debug)]
pub enum HnswError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Label {0} is already present in the index")]
    DuplicateLabel(Label),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot format error: {0}")]
    Format(String),

    #[error("Snapshot version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },

    #[error("Cannot load into a non-empty index ({count} points)")]
    NotEmpty { count: usize },

    #[error("Index is full: node ids are exhausted")]
    CapacityExceeded,
}

// Snapshots are encoded and decoded in memory, so an io error out of bincode
// means the payload ended early.
impl From<bincode::Error> for HnswError {
    fn from(err: bincode::Error) -> Self {
        HnswError::Format(err.to_string())
    }
}

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, HnswError>;
