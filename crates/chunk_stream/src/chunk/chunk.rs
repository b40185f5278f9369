//! Per-chunk view entry: block data, version and renderable slots.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{BlockId, LinearChunk};
use crate::sampler::ChunkStore;
use super::coord::ChunkCoord;
use super::state::{BoundaryFlags, ChunkState};

/// Result of [`ViewChunk::try_swap`].
#[derive(Debug, PartialEq, Eq)]
pub enum SwapOutcome<H> {
    /// No pending renderable.
    Nothing,
    /// New renderable is visible; `released` is the one it replaced.
    Swapped { released: Option<H> },
    /// Data changed since the build started; the new renderable was discarded.
    Conflict { discarded: H },
}

/// A loaded chunk as seen by one viewer.
///
/// Holds the block data, a version bumped on every mutation, the visible
/// renderable and a staging slot for its replacement. The visible renderable
/// is only ever replaced, never cleared, while a rebuild is in progress.
#[derive(Clone, Debug)]
pub struct ViewChunk<H> {
    /// Chunk coordinate in chunk-space.
    pub coord: ChunkCoord,

    /// Current lifecycle state.
    pub state: ChunkState,

    /// Monotonically increasing version, incremented on any data change.
    pub data_version: u64,

    /// Block data. Shared with pending entries and in-flight builds;
    /// mutation copies on write.
    pub data: Arc<LinearChunk>,

    /// Renderable currently visible.
    pub mesh: Option<H>,

    /// Renderable built off to the side, waiting to swap in.
    pub pending_mesh: Option<H>,

    /// Whether the visible renderable was built with near features.
    pub near_features: bool,

    pending_near_features: bool,
}

impl<H> ViewChunk<H> {
    /// New chunks start Dirty since they have no renderable yet.
    pub fn new(coord: ChunkCoord, data: Arc<LinearChunk>) -> Self {
        Self {
            coord,
            state: ChunkState::Dirty,
            data_version: 0,
            data,
            mesh: None,
            pending_mesh: None,
            near_features: false,
            pending_near_features: false,
        }
    }

    /// Block at local coordinates.
    pub fn block(&self, x: u32, y: u32, z: u32) -> Option<BlockId> {
        self.data.block(x, y, z)
    }

    /// Set a block. Bumps the version and marks Dirty when in bounds.
    pub fn set_block(&mut self, x: u32, y: u32, z: u32, block: BlockId) -> bool {
        if self.data.block(x, y, z).is_none() {
            return false;
        }
        Arc::make_mut(&mut self.data).set_block(x, y, z, block);
        self.touch();
        true
    }

    /// Set a metadata value. Bumps the version and marks Dirty when in bounds.
    pub fn set_meta(&mut self, x: u32, y: u32, z: u32, meta: BlockId) -> bool {
        if self.data.meta(x, y, z).is_none() {
            return false;
        }
        Arc::make_mut(&mut self.data).set_meta(x, y, z, meta);
        self.touch();
        true
    }

    /// Replace the block data wholesale (newer payload for the same chunk).
    pub fn replace_data(&mut self, data: Arc<LinearChunk>) {
        self.data = data;
        self.touch();
    }

    /// Horizontal faces a local cell touches.
    pub fn boundary_of(&self, x: u32, z: u32) -> BoundaryFlags {
        let dims = self.data.dims();
        BoundaryFlags::for_cell(x, z, dims.size_x, dims.size_z)
    }

    fn touch(&mut self) {
        self.data_version += 1;
        if !self.state.is_building() && !self.state.has_pending_mesh() {
            self.state = ChunkState::Dirty;
        }
    }

    /// Flag a Clean chunk for rebuild without touching its data, e.g. when a
    /// neighbor changed what its border faces should hide.
    pub fn mark_dirty(&mut self) {
        if self.state.is_clean() {
            self.state = ChunkState::Dirty;
        }
    }

    /// Record that a build for `data_version` was handed to a builder.
    pub fn mark_building(&mut self, data_version: u64, near_features: bool) {
        self.pending_near_features = near_features;
        self.state = ChunkState::Building { data_version };
    }

    /// Stage a finished renderable built from `data_version`.
    ///
    /// Replaces anything already staged; the old staged renderable is returned.
    pub fn mark_ready_to_swap(&mut self, mesh: H, data_version: u64, near_features: bool) -> Option<H> {
        self.pending_near_features = near_features;
        self.state = ChunkState::ReadyToSwap { data_version };
        self.pending_mesh.replace(mesh)
    }

    /// Deliver the result of a build that was left running.
    ///
    /// Accepted only while this chunk is Building from the same version;
    /// otherwise the renderable is handed back as `Err`.
    pub fn finish_build(&mut self, mesh: H, data_version: u64) -> Result<Option<H>, H> {
        match self.state {
            ChunkState::Building { data_version: v } if v == data_version => {
                let near = self.pending_near_features;
                Ok(self.mark_ready_to_swap(mesh, data_version, near))
            }
            _ => Err(mesh),
        }
    }

    /// Swap the staged renderable into the visible slot.
    ///
    /// The new renderable becomes visible before the old one is handed back
    /// for release.
    pub fn try_swap(&mut self) -> SwapOutcome<H> {
        let ChunkState::ReadyToSwap { data_version } = self.state else {
            return SwapOutcome::Nothing;
        };
        let Some(pending) = self.pending_mesh.take() else {
            self.state = ChunkState::Dirty;
            return SwapOutcome::Nothing;
        };

        if data_version == self.data_version {
            let released = self.mesh.replace(pending);
            self.near_features = self.pending_near_features;
            self.state = ChunkState::Clean;
            SwapOutcome::Swapped { released }
        } else {
            self.state = ChunkState::Dirty;
            SwapOutcome::Conflict { discarded: pending }
        }
    }

    /// Take every renderable this chunk holds, for release on unload.
    pub fn take_renderables(&mut self) -> Vec<H> {
        self.mesh.take().into_iter().chain(self.pending_mesh.take()).collect()
    }
}

impl<H> ChunkStore for HashMap<ChunkCoord, ViewChunk<H>> {
    fn get_chunk(&self, coord: ChunkCoord) -> Option<&LinearChunk> {
        self.get(&coord).map(|c| c.data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChunkDims;

    fn chunk() -> ViewChunk<&'static str> {
        ViewChunk::new(ChunkCoord::ZERO, Arc::new(LinearChunk::empty(ChunkDims::new(4, 4, 4))))
    }

    #[test]
    fn new_chunk_is_dirty() {
        let c = chunk();
        assert_eq!(c.state, ChunkState::Dirty);
        assert_eq!(c.data_version, 0);
        assert!(c.mesh.is_none());
    }

    #[test]
    fn set_block_increments_version() {
        let mut c = chunk();
        assert!(c.set_block(0, 0, 0, 5));
        assert_eq!(c.data_version, 1);
        assert!(c.set_meta(1, 1, 1, 2));
        assert_eq!(c.data_version, 2);
        assert_eq!(c.block(0, 0, 0), Some(5));

        assert!(!c.set_block(4, 0, 0, 5));
        assert_eq!(c.data_version, 2);
    }

    #[test]
    fn set_block_copies_shared_data() {
        let mut c = chunk();
        let snapshot = Arc::clone(&c.data);
        c.set_block(1, 1, 1, 9);
        assert_eq!(snapshot.block(1, 1, 1), Some(0));
        assert_eq!(c.block(1, 1, 1), Some(9));
    }

    #[test]
    fn swap_keeps_old_until_new_is_in() {
        let mut c = chunk();
        c.mesh = Some("old");
        c.mark_ready_to_swap("new", 0, true);

        assert_eq!(c.try_swap(), SwapOutcome::Swapped { released: Some("old") });
        assert_eq!(c.mesh, Some("new"));
        assert!(c.near_features);
        assert_eq!(c.state, ChunkState::Clean);
        assert_eq!(c.try_swap(), SwapOutcome::Nothing);
    }

    #[test]
    fn swap_version_mismatch_discards() {
        let mut c = chunk();
        c.mesh = Some("old");
        c.mark_building(0, false);
        c.set_block(0, 0, 0, 1); // edit lands while building
        assert!(c.state.is_building());

        c.mark_ready_to_swap("stale", 0, false);
        assert_eq!(c.try_swap(), SwapOutcome::Conflict { discarded: "stale" });
        assert_eq!(c.mesh, Some("old"));
        assert_eq!(c.state, ChunkState::Dirty);
    }

    #[test]
    fn finish_build_requires_matching_build() {
        let mut c = chunk();
        assert_eq!(c.finish_build("early", 0), Err("early"));

        c.mark_building(0, true);
        assert_eq!(c.finish_build("wrong", 3), Err("wrong"));
        assert_eq!(c.finish_build("done", 0), Ok(None));
        assert_eq!(c.state, ChunkState::ReadyToSwap { data_version: 0 });

        assert_eq!(c.try_swap(), SwapOutcome::Swapped { released: None });
        assert!(c.near_features);
    }

    #[test]
    fn boundary_of_uses_dims() {
        let c = chunk();
        assert!(c.boundary_of(3, 1).pos_x);
        assert!(c.boundary_of(1, 0).neg_z);
        assert!(!c.boundary_of(1, 2).any());
    }

    #[test]
    fn take_renderables() {
        let mut c = chunk();
        c.mesh = Some("a");
        c.pending_mesh = Some("b");
        assert_eq!(c.take_renderables(), vec!["a", "b"]);
        assert!(c.mesh.is_none() && c.pending_mesh.is_none());
    }
}
