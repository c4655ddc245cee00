//! Exact-state snapshots of an [`HnswIndex`] using bincode serialization.
//!
//! File layout:
//! `[magic "HNSW"][u32 format version LE][bincode payload][magic "HCR1"][u32 CRC32 BE]`.
//! The payload holds, in order, the configuration block, the global state
//! block, and one record per node. Writes use atomic temp-file + rename.

use crate::config::{SNAPSHOT_CRC_MAGIC, SNAPSHOT_FORMAT_VERSION, SNAPSHOT_MAGIC};
use crate::error::{HnswError, Result};
use crate::hnsw::graph::{HnswConfig, HnswIndex, Label};
use crate::hnsw::level::{level_multiplier, LevelSampler};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const HEADER_LEN: usize = 8;
const FOOTER_LEN: usize = 8;

#[derive(Serialize, Deserialize)]
struct ConfigBlock<'a> {
    config: Cow<'a, HnswConfig>,
    dimension: u64,
    m_max: u64,
    m_max0: u64,
    level_multiplier: f64,
}

#[derive(Serialize, Deserialize)]
struct StateBlock<'a> {
    max_level: u64,
    entry_point: Option<u32>,
    sampler: Cow<'a, LevelSampler>,
}

#[derive(Serialize, Deserialize)]
struct NodeRecord<'a> {
    point: Cow<'a, [f32]>,
    level: u8,
    label: Label,
    neighbors: Cow<'a, [Vec<u32>]>,
    anchors: Cow<'a, [Option<u32>]>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot<'a> {
    config: ConfigBlock<'a>,
    state: StateBlock<'a>,
    nodes: Vec<NodeRecord<'a>>,
}

/// Encode the complete index state into snapshot bytes.
pub fn encode_snapshot(index: &HnswIndex) -> Result<Vec<u8>> {
    let snapshot = Snapshot {
        config: ConfigBlock {
            config: Cow::Borrowed(&index.config),
            dimension: index.dimension as u64,
            m_max: index.m_max as u64,
            m_max0: index.m_max0 as u64,
            level_multiplier: index.sampler.mult(),
        },
        state: StateBlock {
            max_level: index.max_level as u64,
            entry_point: index.entry_point,
            sampler: Cow::Borrowed(&index.sampler),
        },
        nodes: (0..index.len())
            .map(|id| NodeRecord {
                point: Cow::Borrowed(index.vector(id as u32)),
                level: index.levels[id],
                label: index.labels[id],
                neighbors: Cow::Borrowed(index.neighbors[id].as_slice()),
                anchors: Cow::Borrowed(index.anchors[id].as_slice()),
            })
            .collect(),
    };
    let payload = bincode::serialize(&snapshot)?;
    let crc = crc32fast::hash(&payload);

    let mut output = Vec::with_capacity(HEADER_LEN + payload.len() + FOOTER_LEN);
    output.extend_from_slice(SNAPSHOT_MAGIC);
    output.extend_from_slice(&SNAPSHOT_FORMAT_VERSION.to_le_bytes());
    output.extend_from_slice(&payload);
    output.extend_from_slice(SNAPSHOT_CRC_MAGIC);
    output.extend_from_slice(&crc.to_be_bytes());
    Ok(output)
}

/// Decode snapshot bytes, verifying header, checksum, and graph invariants.
pub fn decode_snapshot(raw: &[u8]) -> Result<HnswIndex> {
    if raw.len() < HEADER_LEN {
        return Err(HnswError::Format(format!(
            "snapshot truncated: {} bytes is shorter than the header",
            raw.len()
        )));
    }
    let (header, body) = raw.split_at(HEADER_LEN);
    if &header[..4] != SNAPSHOT_MAGIC {
        return Err(HnswError::VersionMismatch {
            expected: String::from_utf8_lossy(SNAPSHOT_MAGIC).into_owned(),
            found: String::from_utf8_lossy(&header[..4]).into_owned(),
        });
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != SNAPSHOT_FORMAT_VERSION {
        return Err(HnswError::VersionMismatch {
            expected: SNAPSHOT_FORMAT_VERSION.to_string(),
            found: version.to_string(),
        });
    }

    if body.len() < FOOTER_LEN || &body[body.len() - 8..body.len() - 4] != SNAPSHOT_CRC_MAGIC {
        return Err(HnswError::Format(
            "snapshot truncated: checksum footer missing".into(),
        ));
    }
    let (payload, footer) = body.split_at(body.len() - FOOTER_LEN);
    let stored_crc = u32::from_be_bytes([footer[4], footer[5], footer[6], footer[7]]);
    let computed_crc = crc32fast::hash(payload);
    if computed_crc != stored_crc {
        return Err(HnswError::Format(format!(
            "snapshot CRC32 mismatch: expected {:#010x}, got {:#010x}",
            stored_crc, computed_crc
        )));
    }
    tracing::debug!("Snapshot CRC32 verified: {:#010x}", stored_crc);

    let snapshot: Snapshot<'static> = bincode::deserialize(payload)?;
    let index = restore(snapshot)?;
    index.validate().map_err(|e| {
        tracing::warn!("Snapshot rejected by validation: {}", e);
        HnswError::Format(format!("snapshot validation failed: {}", e))
    })?;
    Ok(index)
}

fn restore(snapshot: Snapshot<'static>) -> Result<HnswIndex> {
    let Snapshot {
        config: config_block,
        state,
        nodes,
    } = snapshot;
    let config = config_block.config.into_owned();
    let dimension = usize::try_from(config_block.dimension)
        .map_err(|_| HnswError::Format("dimension does not fit in usize".into()))?;

    // Rebuild through the constructor so stored parameters get the same checks
    let mut index = HnswIndex::new(dimension, config)
        .map_err(|e| HnswError::Format(format!("invalid stored configuration: {}", e)))?;

    if config_block.m_max != index.m_max as u64 || config_block.m_max0 != index.m_max0 as u64 {
        return Err(HnswError::Format(format!(
            "stored degree bounds ({}, {}) do not match M={}",
            config_block.m_max, config_block.m_max0, index.config.m
        )));
    }
    let sampler = state.sampler.into_owned();
    let expected_mult = level_multiplier(index.config.m);
    if config_block.level_multiplier.to_bits() != expected_mult.to_bits()
        || sampler.mult().to_bits() != expected_mult.to_bits()
    {
        return Err(HnswError::Format(format!(
            "stored level multiplier {} does not match M={}",
            config_block.level_multiplier, index.config.m
        )));
    }
    if sampler.max_level() + 1 != index.config.max_layers {
        return Err(HnswError::Format(format!(
            "sampler level cap {} does not match max_layers {}",
            sampler.max_level(),
            index.config.max_layers
        )));
    }
    index.sampler = sampler;

    index.points.reserve(nodes.len() * dimension);
    index.label_lookup = HashMap::with_capacity(nodes.len());
    for (id, node) in nodes.into_iter().enumerate() {
        if node.point.len() != dimension {
            return Err(HnswError::Format(format!(
                "node {} has {} coordinates, expected {}",
                id,
                node.point.len(),
                dimension
            )));
        }
        if index.label_lookup.insert(node.label, id as u32).is_some() {
            return Err(HnswError::Format(format!(
                "label {} appears more than once",
                node.label
            )));
        }
        index.points.extend_from_slice(&node.point);
        index.levels.push(node.level);
        index.labels.push(node.label);
        index.neighbors.push(node.neighbors.into_owned());
        index.anchors.push(node.anchors.into_owned());
    }

    index.max_level = usize::try_from(state.max_level)
        .map_err(|_| HnswError::Format("max_level does not fit in usize".into()))?;
    index.entry_point = state.entry_point;
    if index.is_empty() && index.entry_point.is_some() {
        return Err(HnswError::Format("empty snapshot has an entry point".into()));
    }
    Ok(index)
}

/// Save the index to `path` with atomic write.
pub fn save_index(index: &HnswIndex, path: &Path) -> Result<()> {
    let output = encode_snapshot(index)?;
    let tmp_path = temp_path(path);

    // Atomic write: write to temp, then rename
    fs::write(&tmp_path, &output)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            tracing::warn!("Failed to remove temp snapshot {:?}: {}", tmp_path, cleanup);
        }
        return Err(e.into());
    }

    tracing::info!(
        "Saved index to {:?} ({} points, {} bytes)",
        path,
        index.len(),
        output.len()
    );
    Ok(())
}

/// Load an index from `path`.
pub fn load_index(path: &Path) -> Result<HnswIndex> {
    let raw = fs::read(path)?;
    let index = decode_snapshot(&raw)?;
    tracing::info!(
        "Loaded index from {:?} ({} points, max level {})",
        path,
        index.len(),
        index.max_level()
    );
    Ok(index)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl HnswIndex {
    /// Save the complete index state to `path`.
    pub fn save_index(&self, path: impl AsRef<Path>) -> Result<()> {
        save_index(self, path.as_ref())
    }

    /// Replace this (empty) index with the state stored at `path`.
    ///
    /// Loading into an index that already holds points fails with
    /// [`HnswError::NotEmpty`]. The stored configuration replaces the current one.
    pub fn load_index(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if !self.is_empty() {
            return Err(HnswError::NotEmpty { count: self.len() });
        }
        *self = load_index(path.as_ref())?;
        Ok(())
    }

    /// Construct an index from the state stored at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_index(path.as_ref())
    }
}
