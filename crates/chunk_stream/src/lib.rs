//! Voxel chunk streaming: palette/RLE codec and budgeted rebuild scheduling.
//!
//! Compressed chunk payloads are decoded into [`LinearChunk`]s, kept per
//! viewer in a [`ChunkView`](chunk::ChunkView), and turned into renderables a
//! few at a time each tick, nearest and visible chunks first. Single-cell edits
//! are debounced so a burst of edits costs one rebuild.
//!
//! # Example
//!
//! ```
//! use chunk_stream::{compress, decompress, ChunkDims, LinearChunk};
//!
//! let chunk = LinearChunk::new(ChunkDims::new(2, 1, 2), vec![1, 1, 2, 2], vec![0; 4]).unwrap();
//!
//! let packed = compress(&chunk);
//! assert_eq!(packed.palette, vec![1, 2]);
//! assert_eq!(packed.runs.len(), 2);
//! assert_eq!(decompress(&packed), chunk);
//! ```

pub mod core;
pub mod codec;
pub mod sampler;
pub mod chunk;

// Re-export primary types
pub use crate::core::{
    BlockId,
    ChunkDims,
    LinearChunk,
    // Constants
    BLOCK_EMPTY, BLOCK_OCCLUDER, SAFE_DEFAULT_BLOCK, DEFAULT_DIMS,
};

// Re-export main entry points
pub use crate::codec::{
    compress,
    decompress,
    decompress_with_report,
    CodecError,
    CompressedChunk,
    DecodeReport,
    Run,
};
pub use crate::sampler::{sample, ChunkStore, NeighborSampler};
