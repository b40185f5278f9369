//! Core type definitions shared by the codec, sampler and scheduler.

use crate::codec::CodecError;

/// Block (or metadata) identifier. Wire values are non-negative integers.
pub type BlockId = u32;

/// Reserved block value for air / empty cells.
pub const BLOCK_EMPTY: BlockId = 0;

/// Stand-in returned for cells whose chunk is not loaded yet.
///
/// Treated as solid by geometry builders so unresolved borders never show
/// see-through seams.
pub const BLOCK_OCCLUDER: BlockId = u32::MAX;

/// Id substituted when a payload references a palette slot that does not exist.
///
/// Also the implicit metadata value for payloads without a metadata channel.
pub const SAFE_DEFAULT_BLOCK: BlockId = 0;

/// Default chunk dimensions (16 × 256 × 16).
pub const DEFAULT_DIMS: ChunkDims = ChunkDims::new(16, 256, 16);

/// Dimensions of a chunk in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkDims {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
}

impl ChunkDims {
    pub const fn new(size_x: u32, size_y: u32, size_z: u32) -> Self {
        Self { size_x, size_y, size_z }
    }

    /// Total number of cells, saturating at `usize::MAX`.
    pub const fn volume(&self) -> usize {
        (self.size_x as usize)
            .saturating_mul(self.size_y as usize)
            .saturating_mul(self.size_z as usize)
    }

    /// Total number of cells, or `None` on overflow.
    pub fn checked_volume(&self) -> Option<usize> {
        (self.size_x as usize)
            .checked_mul(self.size_y as usize)?
            .checked_mul(self.size_z as usize)
    }

    /// True when some axis is zero wide.
    pub fn is_degenerate(&self) -> bool {
        self.size_x == 0 || self.size_y == 0 || self.size_z == 0
    }

    /// Flat array index for a local cell, or `None` if outside the chunk.
    ///
    /// Layout is X fastest, then Z, then Y (horizontal layers stacked upward).
    pub fn index(&self, x: u32, y: u32, z: u32) -> Option<usize> {
        if x >= self.size_x || y >= self.size_y || z >= self.size_z {
            return None;
        }
        let sx = self.size_x as usize;
        let sz = self.size_z as usize;
        Some(x as usize + sx * (z as usize + sz * y as usize))
    }

    pub fn to_array(self) -> [u32; 3] {
        [self.size_x, self.size_y, self.size_z]
    }
}

impl From<[u32; 3]> for ChunkDims {
    fn from(dims: [u32; 3]) -> Self {
        Self::new(dims[0], dims[1], dims[2])
    }
}

/// Decoded chunk: block ids and per-cell metadata in flat arrays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearChunk {
    dims: ChunkDims,
    flat: Vec<BlockId>,
    flat_meta: Vec<BlockId>,
}

impl LinearChunk {
    /// Build a chunk, checking that both arrays cover `dims` exactly.
    pub fn new(dims: ChunkDims, flat: Vec<BlockId>, flat_meta: Vec<BlockId>) -> Result<Self, CodecError> {
        let expected = dims.volume();
        if flat.len() != expected {
            return Err(CodecError::LengthMismatch { channel: "flat", expected, actual: flat.len() });
        }
        if flat_meta.len() != expected {
            return Err(CodecError::LengthMismatch {
                channel: "flat_meta",
                expected,
                actual: flat_meta.len(),
            });
        }
        Ok(Self { dims, flat, flat_meta })
    }

    /// Chunk filled with a single block id and zero metadata.
    pub fn filled(dims: ChunkDims, block: BlockId) -> Self {
        let volume = dims.volume();
        Self {
            dims,
            flat: vec![block; volume],
            flat_meta: vec![0; volume],
        }
    }

    /// Chunk with all cells empty.
    pub fn empty(dims: ChunkDims) -> Self {
        Self::filled(dims, BLOCK_EMPTY)
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn flat(&self) -> &[BlockId] {
        &self.flat
    }

    pub fn flat_meta(&self) -> &[BlockId] {
        &self.flat_meta
    }

    /// Block at local coordinates, or `None` outside the chunk.
    pub fn block(&self, x: u32, y: u32, z: u32) -> Option<BlockId> {
        self.dims.index(x, y, z).map(|i| self.flat[i])
    }

    /// Metadata at local coordinates, or `None` outside the chunk.
    pub fn meta(&self, x: u32, y: u32, z: u32) -> Option<BlockId> {
        self.dims.index(x, y, z).map(|i| self.flat_meta[i])
    }

    /// Set a block. Returns false (and changes nothing) when out of bounds.
    pub fn set_block(&mut self, x: u32, y: u32, z: u32, block: BlockId) -> bool {
        match self.dims.index(x, y, z) {
            Some(i) => {
                self.flat[i] = block;
                true
            }
            None => false,
        }
    }

    /// Set a metadata value. Returns false when out of bounds.
    pub fn set_meta(&mut self, x: u32, y: u32, z: u32, meta: BlockId) -> bool {
        match self.dims.index(x, y, z) {
            Some(i) => {
                self.flat_meta[i] = meta;
                true
            }
            None => false,
        }
    }

    /// Count of non-empty cells.
    pub fn solid_count(&self) -> usize {
        self.flat.iter().filter(|&&b| b != BLOCK_EMPTY).count()
    }

    /// Approximate heap memory used by the arrays.
    pub fn memory_bytes(&self) -> usize {
        (self.flat.len() + self.flat_meta.len()) * std::mem::size_of::<BlockId>()
    }

    /// Split into `(dims, flat, flat_meta)`.
    pub fn into_parts(self) -> (ChunkDims, Vec<BlockId>, Vec<BlockId>) {
        (self.dims, self.flat, self.flat_meta)
    }
}
