//! Chunk state machine and boundary tracking.

/// Lifecycle state of a chunk's renderable.
///
/// Tracks whether a chunk's geometry is up-to-date with its block data and
/// where an in-progress rebuild stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChunkState {
    /// Geometry is up-to-date with block data.
    Clean,

    /// Block data changed; geometry needs rebuild.
    #[default]
    Dirty,

    /// A builder accepted the request and has not delivered yet.
    ///
    /// `data_version` records the version the build was started from, used to
    /// detect edits that landed while it was in flight.
    Building {
        /// Version of block data when the build started.
        data_version: u64,
    },

    /// New geometry ready; waiting to swap into the visible slot.
    ReadyToSwap {
        /// Version of block data the geometry was built from.
        data_version: u64,
    },
}

impl ChunkState {
    /// Check if this chunk needs a rebuild.
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, ChunkState::Dirty)
    }

    /// Check if a build for this chunk is in flight.
    pub fn is_building(&self) -> bool {
        matches!(self, ChunkState::Building { .. })
    }

    /// Check if this chunk has new geometry waiting to swap.
    pub fn has_pending_mesh(&self) -> bool {
        matches!(self, ChunkState::ReadyToSwap { .. })
    }

    /// Check if this chunk's geometry is up-to-date.
    pub fn is_clean(&self) -> bool {
        matches!(self, ChunkState::Clean)
    }
}

/// Flags indicating which horizontal chunk faces a cell touches.
///
/// Used to determine which neighbor chunks need a remesh when a boundary
/// cell is edited. The vertical extent is fixed, so there are no Y faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundaryFlags {
    /// Cell is on the -X face (local x == 0).
    pub neg_x: bool,
    /// Cell is on the +X face (local x == size_x - 1).
    pub pos_x: bool,
    /// Cell is on the -Z face (local z == 0).
    pub neg_z: bool,
    /// Cell is on the +Z face (local z == size_z - 1).
    pub pos_z: bool,
}

impl BoundaryFlags {
    /// Flags for local cell `(x, z)` in a chunk of `size_x × size_z`.
    pub fn for_cell(x: u32, z: u32, size_x: u32, size_z: u32) -> Self {
        Self {
            neg_x: x == 0,
            pos_x: x + 1 == size_x,
            neg_z: z == 0,
            pos_z: z + 1 == size_z,
        }
    }

    /// Check if any boundary flag is set.
    pub fn any(&self) -> bool {
        self.neg_x || self.pos_x || self.neg_z || self.pos_z
    }

    /// Count how many boundaries this touches.
    pub fn count(&self) -> usize {
        [self.neg_x, self.pos_x, self.neg_z, self.pos_z]
            .iter()
            .filter(|&&f| f)
            .count()
    }

    /// Neighbor chunk offsets `[dx, dz]` sharing a touched face.
    pub fn affected_neighbors(&self) -> Vec<[i32; 2]> {
        let mut neighbors = Vec::with_capacity(4);
        if self.neg_x { neighbors.push([-1, 0]); }
        if self.pos_x { neighbors.push([1, 0]); }
        if self.neg_z { neighbors.push([0, -1]); }
        if self.pos_z { neighbors.push([0, 1]); }
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_state_default_is_dirty() {
        assert_eq!(ChunkState::default(), ChunkState::Dirty);
    }

    #[test]
    fn chunk_state_predicates() {
        assert!(ChunkState::Dirty.needs_rebuild());
        assert!(!ChunkState::Clean.needs_rebuild());
        assert!(ChunkState::Building { data_version: 1 }.is_building());
        assert!(ChunkState::ReadyToSwap { data_version: 1 }.has_pending_mesh());
        assert!(!ChunkState::Dirty.has_pending_mesh());
        assert!(ChunkState::Clean.is_clean());
    }

    #[test]
    fn interior_cell_has_no_boundary() {
        let flags = BoundaryFlags::for_cell(5, 5, 16, 16);
        assert!(!flags.any());
        assert_eq!(flags.count(), 0);
        assert!(flags.affected_neighbors().is_empty());
    }

    #[test]
    fn corner_cell_touches_two_faces() {
        let flags = BoundaryFlags::for_cell(15, 0, 16, 16);
        assert!(flags.pos_x && flags.neg_z);
        assert_eq!(flags.count(), 2);

        let neighbors = flags.affected_neighbors();
        assert!(neighbors.contains(&[1, 0]));
        assert!(neighbors.contains(&[0, -1]));
    }

    #[test]
    fn single_cell_wide_chunk_touches_both_faces() {
        let flags = BoundaryFlags::for_cell(0, 3, 1, 8);
        assert!(flags.neg_x && flags.pos_x);
        assert_eq!(flags.count(), 2);
    }
}
