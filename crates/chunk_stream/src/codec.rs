//! Palette + run-length codec for chunk arrays.
//!
//! Block ids and metadata are encoded independently with the same algorithm:
//! a single left-to-right pass assigns palette indices in first-seen order
//! (starting at 1) and collapses equal neighbors into maximal runs.
//!
//! Decoding is tolerant. It runs on the render tick, so a corrupt payload
//! degrades to safe values instead of failing:
//! - palette indices that do not resolve become [`SAFE_DEFAULT_BLOCK`]
//! - a missing metadata channel decodes as all zeros
//! - run totals that disagree with `dims` are truncated or zero-padded
//! - `dims` with a zero axis or more than [`MAX_DECODED_CELLS`] cells are
//!   ignored and the layout is inferred from the runs
//!
//! Every repair is counted in a [`DecodeReport`].
//!
//! # Example
//!
//! ```
//! use chunk_stream::codec::{compress, decompress, Run};
//! use chunk_stream::core::{ChunkDims, LinearChunk};
//!
//! let chunk = LinearChunk::new(ChunkDims::new(2, 1, 2), vec![1, 1, 2, 2], vec![0; 4]).unwrap();
//! let packed = compress(&chunk);
//! assert_eq!(packed.palette, vec![1, 2]);
//! assert_eq!(packed.runs, vec![Run::new(1, 2), Run::new(2, 2)]);
//! assert_eq!(decompress(&packed), chunk);
//! ```

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::{BlockId, ChunkDims, LinearChunk, SAFE_DEFAULT_BLOCK};

/// Version written by [`compress`].
pub const CODEC_VERSION: u32 = 1;

/// Upper bound on decoded cells. Declared `dims` above it are rejected.
pub const MAX_DECODED_CELLS: usize = 1 << 24;

/// Errors surfaced by the codec.
///
/// Decoding a parsed [`CompressedChunk`] never fails; only malformed wire text,
/// invalid [`LinearChunk`] construction and loading a chunk into a view with
/// other dims do.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("{channel} length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("malformed chunk payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chunk dims {actual:?} do not match view dims {expected:?}")]
    DimsMismatch { expected: [u32; 3], actual: [u32; 3] },
}

/// One `(palette index, repeat count)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub index: u32,
    pub count: u32,
}

impl Run {
    pub const fn new(index: u32, count: u32) -> Self {
        Self { index, count }
    }
}

/// Ordered runs; adjacent runs never share an index.
pub type RunList = Vec<Run>;

/// First-seen-order palette built during a single encode pass.
///
/// Indices are 1-based and only meaningful within the call that built them.
#[derive(Debug, Default)]
pub struct Palette {
    values: Vec<BlockId>,
    lookup: HashMap<BlockId, u32>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `value`, appending it if unseen.
    pub fn index_of(&mut self, value: BlockId) -> u32 {
        if let Some(&index) = self.lookup.get(&value) {
            return index;
        }
        self.values.push(value);
        let index = self.values.len() as u32;
        self.lookup.insert(value, index);
        index
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[BlockId] {
        &self.values
    }

    pub fn into_values(self) -> Vec<BlockId> {
        self.values
    }
}

/// Compact wire form of a chunk.
///
/// `meta_palette`/`meta_runs` are absent in payloads from producers that
/// predate the metadata channel; `dims` may be absent in raw array payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedChunk {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dims: Option<[u32; 3]>,
    pub palette: Vec<BlockId>,
    pub runs: RunList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_palette: Option<Vec<BlockId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_runs: Option<RunList>,
}

impl CompressedChunk {
    /// Parse the JSON wire form.
    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse the JSON wire form from raw bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether the payload carries a metadata channel.
    pub fn has_meta(&self) -> bool {
        self.meta_palette.is_some() && self.meta_runs.is_some()
    }

    /// Total cells described by the block runs.
    pub fn run_total(&self) -> usize {
        self.runs.iter().map(|r| r.count as usize).sum()
    }
}

/// What [`decompress_with_report`] had to repair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Block cells whose palette index did not resolve.
    pub substituted_cells: usize,
    /// Metadata cells whose palette index did not resolve.
    pub meta_substituted_cells: usize,
    /// Cells dropped because runs overshot the expected length.
    pub truncated_cells: usize,
    /// Cells zero-filled because runs fell short of the expected length.
    pub padded_cells: usize,
    /// Metadata was absent and synthesized as zeros.
    pub meta_synthesized: bool,
    /// `dims` was absent or rejected; the chunk is laid out as `(len, 1, 1)`.
    pub dims_inferred: bool,
    /// Declared `dims` were unusable (zero axis or too many cells).
    pub dims_rejected: bool,
}

impl DecodeReport {
    /// True when the payload decoded without any repair beyond missing
    /// optional fields.
    pub fn is_clean(&self) -> bool {
        self.substituted_cells == 0
            && self.meta_substituted_cells == 0
            && self.truncated_cells == 0
            && self.padded_cells == 0
            && !self.dims_rejected
    }
}

/// Palette + run encode of one channel.
pub fn encode_channel(values: &[BlockId]) -> (Vec<BlockId>, RunList) {
    let mut palette = Palette::new();
    let mut runs: RunList = Vec::new();

    for &value in values {
        let index = palette.index_of(value);
        match runs.last_mut() {
            Some(run) if run.index == index => run.count += 1,
            _ => runs.push(Run::new(index, 1)),
        }
    }

    (palette.into_values(), runs)
}

/// Expand one channel.
///
/// Returns the values and the number of cells whose index did not resolve.
/// Expansion stops at `limit` cells; anything beyond is reported as truncated
/// by the caller.
fn decode_channel(palette: &[BlockId], runs: &[Run], limit: usize) -> (Vec<BlockId>, usize, usize) {
    let mut out = Vec::with_capacity(limit.min(runs.iter().map(|r| r.count as usize).sum()));
    let mut substituted = 0;
    let mut dropped = 0;

    for run in runs {
        let value = match (run.index as usize).checked_sub(1).and_then(|i| palette.get(i)) {
            Some(&value) => value,
            None => {
                substituted += run.count as usize;
                SAFE_DEFAULT_BLOCK
            }
        };
        let room = limit - out.len();
        let take = (run.count as usize).min(room);
        dropped += run.count as usize - take;
        out.extend(std::iter::repeat(value).take(take));
    }

    (out, substituted, dropped)
}

/// Declared dims the decoder will lay cells out in.
fn decodable(dims: ChunkDims) -> bool {
    !dims.is_degenerate()
        && dims.checked_volume().is_some_and(|volume| volume <= MAX_DECODED_CELLS)
}

/// Compress both channels of a chunk.
pub fn compress(chunk: &LinearChunk) -> CompressedChunk {
    let (palette, runs) = encode_channel(chunk.flat());
    let (meta_palette, meta_runs) = encode_channel(chunk.flat_meta());

    CompressedChunk {
        version: CODEC_VERSION,
        dims: Some(chunk.dims().to_array()),
        palette,
        runs,
        meta_palette: Some(meta_palette),
        meta_runs: Some(meta_runs),
    }
}

/// Decompress a payload, discarding the repair report.
pub fn decompress(compressed: &CompressedChunk) -> LinearChunk {
    decompress_with_report(compressed).0
}

/// Decompress a payload and report every repair that was applied.
pub fn decompress_with_report(compressed: &CompressedChunk) -> (LinearChunk, DecodeReport) {
    let mut report = DecodeReport::default();
    let declared = match compressed.dims.map(ChunkDims::from) {
        Some(dims) if !decodable(dims) => {
            report.dims_rejected = true;
            None
        }
        other => other,
    };
    let limit = declared.map(|d| d.volume()).unwrap_or(MAX_DECODED_CELLS);

    let (mut flat, substituted, dropped) = decode_channel(&compressed.palette, &compressed.runs, limit);
    report.substituted_cells = substituted;
    report.truncated_cells += dropped;

    let dims = match declared {
        Some(dims) => {
            if flat.len() < dims.volume() {
                report.padded_cells += dims.volume() - flat.len();
                flat.resize(dims.volume(), SAFE_DEFAULT_BLOCK);
            }
            dims
        }
        None => {
            report.dims_inferred = true;
            if flat.is_empty() {
                report.padded_cells += 1;
                flat.push(SAFE_DEFAULT_BLOCK);
            }
            ChunkDims::new(flat.len() as u32, 1, 1)
        }
    };
    let len = dims.volume();

    let flat_meta = match (&compressed.meta_palette, &compressed.meta_runs) {
        (Some(meta_palette), Some(meta_runs)) => {
            let (mut meta, substituted, dropped) = decode_channel(meta_palette, meta_runs, len);
            report.meta_substituted_cells = substituted;
            report.truncated_cells += dropped;
            if meta.len() < len {
                report.padded_cells += len - meta.len();
                meta.resize(len, 0);
            }
            meta
        }
        _ => {
            report.meta_synthesized = true;
            vec![0; len]
        }
    };

    if !report.is_clean() {
        warn!(
            "repaired chunk payload: {} substituted, {} meta substituted, {} truncated, {} padded, dims rejected: {:?}",
            report.substituted_cells,
            report.meta_substituted_cells,
            report.truncated_cells,
            report.padded_cells,
            report.dims_rejected.then_some(compressed.dims).flatten(),
        );
    }

    // Both arrays were sized to `dims.volume()` above.
    let chunk = match LinearChunk::new(dims, flat, flat_meta) {
        Ok(chunk) => chunk,
        Err(_) => LinearChunk::empty(dims),
    };
    (chunk, report)
}
