//! ChunkView - per-viewer chunk store, pending set, debounce timers and tick loop.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use web_time::Instant;

use crate::codec::{decompress_with_report, CodecError, CompressedChunk, DecodeReport};
use crate::core::{BlockId, LinearChunk};
use crate::sampler::ChunkStore;
use super::candidates::{Candidate, CandidateSelector, Viewer};
use super::chunk::ViewChunk;
use super::config::{ConfigError, ViewConfig};
use super::coord::ChunkCoord;
use super::debounce::EditDebouncer;
use super::pending::PendingMeshSet;
use super::scheduler::{FrameBudgetScheduler, GeometryBuilder};
use super::state::ChunkState;
use super::stats::{ChunkDebugInfo, TickStats};

/// Mutable per-viewer state threaded through every scheduler call.
///
/// Only the operations on [`ChunkView`] and the scheduler mutate it:
/// insert-if-absent and remove-on-process for the pending set, arm and
/// cancel-on-unload for the timers.
#[derive(Debug)]
pub struct ChunkViewState<H> {
    pub(crate) chunks: HashMap<ChunkCoord, ViewChunk<H>>,
    pub(crate) pending: PendingMeshSet,
    pub(crate) timers: EditDebouncer,
}

impl<H> Default for ChunkViewState<H> {
    fn default() -> Self {
        Self {
            chunks: HashMap::new(),
            pending: PendingMeshSet::new(),
            timers: EditDebouncer::default(),
        }
    }
}

impl<H> ChunkViewState<H> {
    pub fn chunks(&self) -> &HashMap<ChunkCoord, ViewChunk<H>> {
        &self.chunks
    }

    pub fn pending(&self) -> &PendingMeshSet {
        &self.pending
    }

    pub fn timers(&self) -> &EditDebouncer {
        &self.timers
    }
}

/// What [`ChunkView::complete_build`] did with a delivered renderable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Staged; it swaps in on the next tick.
    Staged,
    /// No matching build was in flight; the renderable was released.
    Stale,
    /// The chunk was unloaded meanwhile; the renderable was released.
    Unloaded,
}

/// Central orchestrator for one viewer.
///
/// Handles:
/// - Chunk storage keyed by [`ChunkCoord`]
/// - Payload decode and direct pending inserts
/// - Debounced remesh on single-cell edits
/// - Budgeted candidate builds and renderable swaps
#[derive(Debug)]
pub struct ChunkView<H> {
    state: ChunkViewState<H>,
    selector: CandidateSelector,
    scheduler: FrameBudgetScheduler,
    config: ViewConfig,
}

impl<H> ChunkView<H> {
    /// Create a view with the default configuration.
    pub fn new() -> Self {
        Self::build(ViewConfig::default())
    }

    /// Create a view with a validated custom configuration.
    pub fn with_config(config: ViewConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ViewConfig) -> Self {
        Self {
            state: ChunkViewState {
                chunks: HashMap::new(),
                pending: PendingMeshSet::new(),
                timers: EditDebouncer::new(config.debounce_interval()),
            },
            selector: CandidateSelector::from_config(&config),
            scheduler: FrameBudgetScheduler::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn state(&self) -> &ChunkViewState<H> {
        &self.state
    }

    // ========================================================================
    // Chunk Store
    // ========================================================================

    /// Loaded chunk entry.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&ViewChunk<H>> {
        self.state.chunks.get(&coord)
    }

    pub fn has_chunk(&self, coord: ChunkCoord) -> bool {
        self.state.chunks.contains_key(&coord)
    }

    pub fn chunk_count(&self) -> usize {
        self.state.chunks.len()
    }

    pub fn iter_chunks(&self) -> impl Iterator<Item = (&ChunkCoord, &ViewChunk<H>)> {
        self.state.chunks.iter()
    }

    /// Whether `coord` is waiting for a rebuild.
    pub fn is_pending(&self, coord: ChunkCoord) -> bool {
        self.state.pending.contains(coord)
    }

    pub fn pending_count(&self) -> usize {
        self.state.pending.len()
    }

    /// Whether a debounce timer is armed for `coord`.
    pub fn has_timer(&self, coord: ChunkCoord) -> bool {
        self.state.timers.is_armed(coord)
    }

    /// Builds handed out and not yet delivered.
    pub fn in_flight_builds(&self) -> usize {
        self.state.chunks.values().filter(|c| c.state.is_building()).count()
    }

    /// Load a chunk, or replace the data of an already loaded one.
    ///
    /// The chunk goes straight into the pending set; any debounced edit for it
    /// is superseded. Returns true when the chunk was not loaded before.
    pub fn insert_chunk(&mut self, coord: ChunkCoord, data: LinearChunk) -> bool {
        let data = Arc::new(data);
        self.state.timers.cancel(coord);

        let newly_loaded = match self.state.chunks.get_mut(&coord) {
            Some(chunk) => {
                chunk.replace_data(Arc::clone(&data));
                false
            }
            None => {
                self.state.chunks.insert(coord, ViewChunk::new(coord, Arc::clone(&data)));
                true
            }
        };
        self.state.pending.insert(coord, data);

        if newly_loaded && self.config.remesh_neighbors_on_load {
            // Their border faces were built against the occluder placeholder.
            for neighbor in coord.neighbors() {
                self.mark_pending(neighbor);
            }
        }
        newly_loaded
    }

    /// Decode a payload and load it.
    ///
    /// A payload without `dims` is laid out with the configured chunk dims
    /// when its length fits them exactly. A payload that still does not match
    /// the configured dims is not loaded.
    pub fn apply_payload(&mut self, coord: ChunkCoord, payload: &CompressedChunk) -> Result<DecodeReport, CodecError> {
        let (mut chunk, report) = decompress_with_report(payload);
        let dims = self.config.dims();

        if report.dims_inferred && chunk.flat().len() == dims.volume() {
            let (inferred, flat, meta) = chunk.into_parts();
            chunk = LinearChunk::new(dims, flat, meta).unwrap_or_else(|_| LinearChunk::empty(inferred));
        }

        if chunk.dims() != dims {
            warn!(
                "dropping chunk {} payload: dims {:?}, expected {:?}",
                coord,
                chunk.dims().to_array(),
                dims.to_array()
            );
            return Err(CodecError::DimsMismatch {
                expected: dims.to_array(),
                actual: chunk.dims().to_array(),
            });
        }

        self.insert_chunk(coord, chunk);
        Ok(report)
    }

    /// Parse a JSON payload and load it.
    pub fn apply_payload_json(&mut self, coord: ChunkCoord, json: &str) -> Result<DecodeReport, CodecError> {
        let payload = CompressedChunk::from_json(json)?;
        self.apply_payload(coord, &payload)
    }

    /// Put a loaded chunk into the pending set directly. Returns false when it
    /// is not loaded.
    pub fn mark_pending(&mut self, coord: ChunkCoord) -> bool {
        let Some(chunk) = self.state.chunks.get_mut(&coord) else {
            return false;
        };
        chunk.mark_dirty();
        self.state.pending.insert(coord, Arc::clone(&chunk.data));
        true
    }

    /// Unload a chunk: cancel its timer, drop its pending entry and hand back
    /// the entry so the caller can release its renderables.
    pub fn unload_chunk(&mut self, coord: ChunkCoord) -> Option<ViewChunk<H>> {
        self.state.timers.cancel(coord);
        self.state.pending.remove(coord);
        let removed = self.state.chunks.remove(&coord);
        if removed.is_some() {
            debug!("unloaded chunk {}", coord);
        }
        removed
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Edit one block and debounce a remesh of the chunk and any neighbor
    /// sharing the touched border.
    ///
    /// Returns false (and arms nothing) when the chunk is not loaded or the
    /// cell is out of bounds.
    pub fn set_block(&mut self, coord: ChunkCoord, lx: u32, ly: u32, lz: u32, block: BlockId, now: Instant) -> bool {
        self.edit(coord, lx, lz, now, |chunk| chunk.set_block(lx, ly, lz, block))
    }

    /// Edit one metadata value; debounced like [`set_block`](Self::set_block).
    pub fn set_block_metadata(&mut self, coord: ChunkCoord, lx: u32, ly: u32, lz: u32, meta: BlockId, now: Instant) -> bool {
        self.edit(coord, lx, lz, now, |chunk| chunk.set_meta(lx, ly, lz, meta))
    }

    fn edit(&mut self, coord: ChunkCoord, lx: u32, lz: u32, now: Instant, apply: impl FnOnce(&mut ViewChunk<H>) -> bool) -> bool {
        let Some(chunk) = self.state.chunks.get_mut(&coord) else {
            return false;
        };
        if !apply(chunk) {
            return false;
        }
        let boundary = chunk.boundary_of(lx, lz);
        self.state.timers.schedule_edit(coord, boundary, now);
        true
    }

    /// Split a world voxel position into its chunk and local cell.
    pub fn locate_voxel(&self, voxel: [i32; 3]) -> Option<(ChunkCoord, [u32; 3])> {
        let dims = self.config.dims();
        if voxel[1] < 0 || voxel[1] as u32 >= dims.size_y {
            return None;
        }
        let (sx, sz) = (dims.size_x as i32, dims.size_z as i32);
        let coord = ChunkCoord::new(voxel[0].div_euclid(sx), voxel[2].div_euclid(sz));
        let local = [voxel[0].rem_euclid(sx) as u32, voxel[1] as u32, voxel[2].rem_euclid(sz) as u32];
        Some((coord, local))
    }

    /// Block at a world voxel position; `None` when not loaded.
    pub fn block_at(&self, voxel: [i32; 3]) -> Option<BlockId> {
        let (coord, [x, y, z]) = self.locate_voxel(voxel)?;
        self.state.chunks.get(&coord)?.block(x, y, z)
    }

    /// [`set_block`](Self::set_block) addressed by world voxel position.
    pub fn set_block_at(&mut self, voxel: [i32; 3], block: BlockId, now: Instant) -> bool {
        match self.locate_voxel(voxel) {
            Some((coord, [x, y, z])) => self.set_block(coord, x, y, z, block, now),
            None => false,
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Candidates the next tick would consider, ranked.
    pub fn candidates(&self, viewer: &Viewer) -> Vec<Candidate> {
        self.selector.select(&self.state.pending, viewer)
    }

    /// Run one tick: fire due debounce timers, rank pending chunks, build
    /// within budget and swap finished renderables in.
    ///
    /// `now` drives the debounce timers; the build budget measures real time.
    pub fn tick<B>(&mut self, viewer: &Viewer, builder: &mut B, now: Instant) -> TickStats
    where
        B: GeometryBuilder<Handle = H>,
    {
        let started_at = Instant::now();
        let mut stats = TickStats::default();

        for coord in self.state.timers.fire_due(now) {
            match self.state.chunks.get_mut(&coord) {
                Some(chunk) => {
                    chunk.mark_dirty();
                    self.state.pending.insert(coord, Arc::clone(&chunk.data));
                    stats.debounce_fired += 1;
                }
                None => stats.debounce_skipped += 1,
            }
        }

        let candidates = self.selector.select(&self.state.pending, viewer);
        stats.candidates = candidates.len();

        let carried = self.in_flight_builds();
        self.scheduler.begin_tick(started_at, carried);
        self.scheduler.run(&candidates, viewer.home, &mut self.state, builder, &mut stats);
        self.scheduler.swap_ready(&mut self.state, builder, &mut stats);

        stats.pending_remaining = self.state.pending.len();
        stats.elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;

        if stats.builds > 0 || stats.swapped > 0 || stats.deferred > 0 {
            debug!(
                "tick: {} built, {} swapped, {} deferred, {} pending, {:.2}ms",
                stats.builds, stats.swapped, stats.deferred, stats.pending_remaining, stats.elapsed_ms
            );
        }
        stats
    }

    /// Deliver a build that returned [`BuildPoll::Pending`](super::scheduler::BuildPoll::Pending).
    pub fn complete_build<B>(&mut self, builder: &mut B, coord: ChunkCoord, data_version: u64, handle: H) -> CompletionOutcome
    where
        B: GeometryBuilder<Handle = H>,
    {
        let Some(chunk) = self.state.chunks.get_mut(&coord) else {
            builder.release(handle);
            return CompletionOutcome::Unloaded;
        };
        match chunk.finish_build(handle, data_version) {
            Ok(replaced) => {
                if let Some(old) = replaced {
                    builder.release(old);
                }
                CompletionOutcome::Staged
            }
            Err(handle) => {
                builder.release(handle);
                CompletionOutcome::Stale
            }
        }
    }

    // ========================================================================
    // Debug / Inspection
    // ========================================================================

    /// Get comprehensive debug information.
    pub fn debug_info(&self) -> ChunkDebugInfo {
        let mut info = ChunkDebugInfo::default();

        for chunk in self.state.chunks.values() {
            info.total_chunks += 1;
            match chunk.state {
                ChunkState::Clean => info.clean_chunks += 1,
                ChunkState::Dirty => info.dirty_chunks += 1,
                ChunkState::Building { .. } => info.building_chunks += 1,
                ChunkState::ReadyToSwap { .. } => info.ready_to_swap_chunks += 1,
            }
            if chunk.mesh.is_some() {
                info.chunks_with_mesh += 1;
                if chunk.near_features {
                    info.near_feature_chunks += 1;
                }
            }
            info.block_memory_bytes += chunk.data.memory_bytes();
        }

        info.pending_size = self.state.pending.len();
        info.armed_timers = self.state.timers.len();
        info
    }

    /// Unload everything, releasing every renderable through `builder`.
    pub fn clear<B>(&mut self, builder: &mut B)
    where
        B: GeometryBuilder<Handle = H>,
    {
        for (_, mut chunk) in self.state.chunks.drain() {
            for handle in chunk.take_renderables() {
                builder.release(handle);
            }
        }
        self.state.pending.clear();
        self.state.timers.clear();
    }
}

impl<H> Default for ChunkView<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ChunkStore for ChunkView<H> {
    fn get_chunk(&self, coord: ChunkCoord) -> Option<&LinearChunk> {
        self.state.chunks.get_chunk(coord)
    }
}
