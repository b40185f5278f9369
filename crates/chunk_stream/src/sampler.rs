//! Cross-chunk block reads for geometry builders.
//!
//! A builder working on one chunk asks for cells at local coordinates that may
//! fall outside it (to decide whether a border face is hidden). Horizontal
//! overflow is wrapped into the neighboring chunk. When that neighbor is not
//! loaded the sampler answers [`BLOCK_OCCLUDER`], so border faces stay
//! suppressed instead of showing gaps into unloaded terrain.
//!
//! ```
//! use std::collections::HashMap;
//! use chunk_stream::chunk::ChunkCoord;
//! use chunk_stream::core::{ChunkDims, LinearChunk, BLOCK_OCCLUDER};
//! use chunk_stream::sampler::sample;
//!
//! let mut store = HashMap::new();
//! store.insert(ChunkCoord::ZERO, LinearChunk::filled(ChunkDims::new(4, 4, 4), 3));
//!
//! assert_eq!(sample(&store, ChunkCoord::ZERO, 1, 1, 1), 3);
//! assert_eq!(sample(&store, ChunkCoord::ZERO, -1, 1, 1), BLOCK_OCCLUDER);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::chunk::ChunkCoord;
use crate::core::{BlockId, LinearChunk, BLOCK_EMPTY, BLOCK_OCCLUDER, SAFE_DEFAULT_BLOCK};

/// Read access to loaded chunks by coordinate.
pub trait ChunkStore {
    /// Loaded chunk at `coord`, or `None` if it has not arrived yet.
    fn get_chunk(&self, coord: ChunkCoord) -> Option<&LinearChunk>;
}

impl ChunkStore for HashMap<ChunkCoord, LinearChunk> {
    fn get_chunk(&self, coord: ChunkCoord) -> Option<&LinearChunk> {
        self.get(&coord)
    }
}

impl ChunkStore for HashMap<ChunkCoord, Arc<LinearChunk>> {
    fn get_chunk(&self, coord: ChunkCoord) -> Option<&LinearChunk> {
        self.get(&coord).map(Arc::as_ref)
    }
}

/// Where a local coordinate lands after horizontal wrapping.
enum Target<'a> {
    Cell(&'a LinearChunk, u32, u32, u32),
    Unloaded,
    BelowWorld,
    AboveWorld,
}

/// Sampler bound to one origin chunk.
///
/// Local coordinates are signed; `x` and `z` may run any distance past the
/// origin's edges. Chunk columns span the full world height, so `y` does not
/// wrap: below the floor reads as [`BLOCK_OCCLUDER`], above the ceiling as
/// [`BLOCK_EMPTY`].
#[derive(Clone, Copy)]
pub struct NeighborSampler<'a> {
    store: &'a dyn ChunkStore,
    origin: ChunkCoord,
    chunk: &'a LinearChunk,
}

impl<'a> NeighborSampler<'a> {
    pub fn new(store: &'a dyn ChunkStore, origin: ChunkCoord, chunk: &'a LinearChunk) -> Self {
        Self { store, origin, chunk }
    }

    /// Sampler for a chunk that is itself in `store`.
    pub fn from_store(store: &'a dyn ChunkStore, origin: ChunkCoord) -> Option<Self> {
        store.get_chunk(origin).map(|chunk| Self::new(store, origin, chunk))
    }

    pub fn origin(&self) -> ChunkCoord {
        self.origin
    }

    pub fn chunk(&self) -> &'a LinearChunk {
        self.chunk
    }

    fn resolve(&self, lx: i32, ly: i32, lz: i32) -> Target<'a> {
        let dims = self.chunk.dims();
        if ly < 0 {
            return Target::BelowWorld;
        }
        if ly as u32 >= dims.size_y {
            return Target::AboveWorld;
        }

        if dims.size_x == 0 || dims.size_z == 0 {
            return Target::Unloaded;
        }

        let (sx, sz) = (dims.size_x as i32, dims.size_z as i32);
        let (cx, x) = (lx.div_euclid(sx), lx.rem_euclid(sx));
        let (cz, z) = (lz.div_euclid(sz), lz.rem_euclid(sz));

        let chunk = if cx == 0 && cz == 0 {
            self.chunk
        } else {
            match self.store.get_chunk(self.origin.offset(cx, cz)) {
                Some(neighbor) if neighbor.dims() == dims => neighbor,
                _ => return Target::Unloaded,
            }
        };
        Target::Cell(chunk, x as u32, ly as u32, z as u32)
    }

    /// Block id at local coordinates relative to the origin chunk.
    pub fn sample(&self, lx: i32, ly: i32, lz: i32) -> BlockId {
        match self.resolve(lx, ly, lz) {
            Target::Cell(chunk, x, y, z) => chunk.block(x, y, z).unwrap_or(BLOCK_OCCLUDER),
            Target::Unloaded | Target::BelowWorld => BLOCK_OCCLUDER,
            Target::AboveWorld => BLOCK_EMPTY,
        }
    }

    /// Metadata at local coordinates. Unknown cells read as zero.
    pub fn sample_meta(&self, lx: i32, ly: i32, lz: i32) -> BlockId {
        match self.resolve(lx, ly, lz) {
            Target::Cell(chunk, x, y, z) => chunk.meta(x, y, z).unwrap_or(SAFE_DEFAULT_BLOCK),
            _ => SAFE_DEFAULT_BLOCK,
        }
    }

    /// Whether the cell reads as solid (loaded non-empty, or placeholder).
    pub fn is_solid(&self, lx: i32, ly: i32, lz: i32) -> bool {
        self.sample(lx, ly, lz) != BLOCK_EMPTY
    }
}

/// One-shot read through `store`. An absent origin chunk reads as the placeholder.
pub fn sample(store: &dyn ChunkStore, origin: ChunkCoord, lx: i32, ly: i32, lz: i32) -> BlockId {
    match NeighborSampler::from_store(store, origin) {
        Some(sampler) => sampler.sample(lx, ly, lz),
        None => BLOCK_OCCLUDER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChunkDims;

    const DIMS: ChunkDims = ChunkDims::new(4, 4, 4);

    fn store_with(coords: &[(ChunkCoord, BlockId)]) -> HashMap<ChunkCoord, LinearChunk> {
        coords
            .iter()
            .map(|&(c, b)| (c, LinearChunk::filled(DIMS, b)))
            .collect()
    }

    #[test]
    fn reads_inside_origin() {
        let mut store = store_with(&[(ChunkCoord::ZERO, 0)]);
        store.get_mut(&ChunkCoord::ZERO).unwrap().set_block(2, 1, 3, 9);

        assert_eq!(sample(&store, ChunkCoord::ZERO, 2, 1, 3), 9);
        assert_eq!(sample(&store, ChunkCoord::ZERO, 2, 1, 2), BLOCK_EMPTY);
    }

    #[test]
    fn wraps_into_loaded_neighbors() {
        let mut store = store_with(&[
            (ChunkCoord::ZERO, 1),
            (ChunkCoord::new(1, 0), 2),
            (ChunkCoord::new(-1, 0), 3),
            (ChunkCoord::new(0, 1), 4),
            (ChunkCoord::new(0, -1), 5),
        ]);
        store.get_mut(&ChunkCoord::new(-1, 0)).unwrap().set_block(3, 0, 0, 30);

        assert_eq!(sample(&store, ChunkCoord::ZERO, 4, 0, 0), 2);
        assert_eq!(sample(&store, ChunkCoord::ZERO, -1, 0, 0), 30);
        assert_eq!(sample(&store, ChunkCoord::ZERO, 0, 0, 4), 4);
        assert_eq!(sample(&store, ChunkCoord::ZERO, 0, 0, -1), 5);
    }

    #[test]
    fn missing_neighbor_is_occluder_not_empty() {
        let store = store_with(&[(ChunkCoord::ZERO, BLOCK_EMPTY)]);

        for (lx, lz) in [(-1, 0), (4, 0), (0, -1), (0, 4), (-1, -1), (4, 4)] {
            let id = sample(&store, ChunkCoord::ZERO, lx, 0, lz);
            assert_eq!(id, BLOCK_OCCLUDER);
            assert_ne!(id, BLOCK_EMPTY);
        }
    }

    #[test]
    fn diagonal_and_far_offsets() {
        let store = store_with(&[(ChunkCoord::ZERO, 1), (ChunkCoord::new(1, 1), 7), (ChunkCoord::new(-2, 0), 8)]);

        assert_eq!(sample(&store, ChunkCoord::ZERO, 4, 0, 4), 7);
        assert_eq!(sample(&store, ChunkCoord::ZERO, -5, 0, 0), 8);
    }

    #[test]
    fn vertical_bounds() {
        let store = store_with(&[(ChunkCoord::ZERO, 1)]);
        assert_eq!(sample(&store, ChunkCoord::ZERO, 0, -1, 0), BLOCK_OCCLUDER);
        assert_eq!(sample(&store, ChunkCoord::ZERO, 0, 4, 0), BLOCK_EMPTY);
    }

    #[test]
    fn absent_origin_is_occluder() {
        let store: HashMap<ChunkCoord, LinearChunk> = HashMap::new();
        assert_eq!(sample(&store, ChunkCoord::new(5, 5), 0, 0, 0), BLOCK_OCCLUDER);
    }

    #[test]
    fn meta_channel() {
        let mut store = store_with(&[(ChunkCoord::ZERO, 1), (ChunkCoord::new(1, 0), 1)]);
        store.get_mut(&ChunkCoord::new(1, 0)).unwrap().set_meta(0, 2, 1, 6);

        let sampler = NeighborSampler::from_store(&store, ChunkCoord::ZERO).unwrap();
        assert_eq!(sampler.sample_meta(4, 2, 1), 6);
        assert_eq!(sampler.sample_meta(-1, 2, 1), 0);
        assert!(sampler.is_solid(-1, 0, 0));
    }

    #[test]
    fn arc_store() {
        let store: HashMap<ChunkCoord, Arc<LinearChunk>> =
            [(ChunkCoord::ZERO, Arc::new(LinearChunk::filled(DIMS, 2)))].into_iter().collect();
        assert_eq!(sample(&store, ChunkCoord::ZERO, 3, 3, 3), 2);
    }

    #[test]
    fn zero_width_origin_reads_occluder() {
        let mut store = store_with(&[(ChunkCoord::new(-1, 0), 1)]);
        store.insert(ChunkCoord::ZERO, LinearChunk::empty(ChunkDims::new(0, 4, 4)));

        assert_eq!(sample(&store, ChunkCoord::ZERO, 0, 0, 0), BLOCK_OCCLUDER);
        assert_eq!(sample(&store, ChunkCoord::ZERO, -1, 2, 0), BLOCK_OCCLUDER);
        assert_eq!(sample(&store, ChunkCoord::ZERO, 0, 9, 0), BLOCK_EMPTY);
    }

    #[test]
    fn larger_neighbor_reads_occluder() {
        let mut store = store_with(&[(ChunkCoord::ZERO, 1)]);
        store.insert(ChunkCoord::new(1, 0), LinearChunk::filled(ChunkDims::new(8, 4, 8), 2));

        assert_eq!(sample(&store, ChunkCoord::ZERO, 4, 0, 0), BLOCK_OCCLUDER);
    }
}
