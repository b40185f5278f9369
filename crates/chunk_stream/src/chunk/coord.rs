//! Chunk coordinate type for chunk-space addressing.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;

use crate::core::ChunkDims;
use super::frustum::Aabb;

/// Error parsing a textual chunk key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkKeyError {
    #[error("chunk key {0:?} is not of the form \"cx,cz\"")]
    Malformed(String),
    #[error("chunk key {key:?} has a non-integer component {part:?}")]
    InvalidComponent { key: String, part: String },
}

/// Chunk coordinate in chunk-space (not world-space).
///
/// Chunks tile the horizontal plane; the vertical extent is fixed per world,
/// so only `x` and `z` are tracked. Coordinates can be negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    /// Origin chunk at (0, 0).
    pub const ZERO: ChunkCoord = ChunkCoord { x: 0, z: 0 };

    /// Create a new chunk coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Parse a `"cx,cz"` key as produced by the chunk store.
    ///
    /// # Example
    /// ```
    /// use chunk_stream::chunk::ChunkCoord;
    ///
    /// assert_eq!(ChunkCoord::parse_key("3,-7").unwrap(), ChunkCoord::new(3, -7));
    /// assert!(ChunkCoord::parse_key("3").is_err());
    /// ```
    pub fn parse_key(key: &str) -> Result<Self, ChunkKeyError> {
        let mut parts = key.split(',');
        let (Some(x), Some(z), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ChunkKeyError::Malformed(key.to_string()));
        };
        let parse = |part: &str| {
            part.trim().parse::<i32>().map_err(|_| ChunkKeyError::InvalidComponent {
                key: key.to_string(),
                part: part.to_string(),
            })
        };
        Ok(Self::new(parse(x)?, parse(z)?))
    }

    /// Textual key, inverse of [`parse_key`](Self::parse_key).
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Coordinate shifted by whole chunks.
    pub const fn offset(&self, dx: i32, dz: i32) -> Self {
        Self { x: self.x + dx, z: self.z + dz }
    }

    /// Get the 4 edge-adjacent neighbors.
    ///
    /// Returns neighbors in order: +X, -X, +Z, -Z
    pub fn neighbors(&self) -> [ChunkCoord; 4] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
        ]
    }

    /// Largest per-axis chunk distance (Chebyshev).
    pub fn chebyshev_distance(&self, other: ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// Squared chunk distance `dx² + dz²`.
    pub fn distance_squared(&self, other: ChunkCoord) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }

    /// Convert a world position to the chunk containing it.
    pub fn from_world(world_pos: Vec3, dims: ChunkDims, voxel_size: f32) -> Self {
        ChunkCoord {
            x: (world_pos.x / (dims.size_x as f32 * voxel_size)).floor() as i32,
            z: (world_pos.z / (dims.size_z as f32 * voxel_size)).floor() as i32,
        }
    }

    /// World-space origin (minimum corner) of this chunk. Chunks start at y = 0.
    pub fn origin_world(&self, dims: ChunkDims, voxel_size: f32) -> Vec3 {
        Vec3::new(
            self.x as f32 * dims.size_x as f32 * voxel_size,
            0.0,
            self.z as f32 * dims.size_z as f32 * voxel_size,
        )
    }

    /// World-space bounding box of the whole chunk column.
    pub fn aabb_world(&self, dims: ChunkDims, voxel_size: f32) -> Aabb {
        let min = self.origin_world(dims, voxel_size);
        let extent = Vec3::new(dims.size_x as f32, dims.size_y as f32, dims.size_z as f32) * voxel_size;
        Aabb::new(min, min + extent)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.z)
    }
}

impl FromStr for ChunkCoord {
    type Err = ChunkKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_key(s)
    }
}
