//! Budgeted build loop and swap phase.
//!
//! Once per tick the scheduler resets its [`FrameBudget`], walks the ranked
//! candidates and hands each one to the [`GeometryBuilder`] until a budget runs
//! out. Candidates it does not reach are left in the pending set untouched.
//! Finished renderables are staged next to the visible one and swapped in by
//! [`FrameBudgetScheduler::swap_ready`], which releases the old renderable only
//! after its replacement is visible.

use std::sync::Arc;

use log::trace;
use web_time::Instant;

use crate::core::LinearChunk;
use crate::sampler::NeighborSampler;
use super::budget::FrameBudget;
use super::candidates::Candidate;
use super::chunk::SwapOutcome;
use super::config::ViewConfig;
use super::coord::ChunkCoord;
use super::stats::TickStats;
use super::view::ChunkViewState;

/// Result of asking the builder for geometry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildPoll<H> {
    /// Geometry is finished.
    Ready(H),
    /// Geometry will be delivered later through `ChunkView::complete_build`.
    Pending,
    /// The builder could not produce geometry. Nothing is staged and the
    /// visible renderable stays; the chunk is retried on a later tick.
    Failed,
}

/// Everything a builder gets for one chunk.
pub struct BuildRequest<'a> {
    pub coord: ChunkCoord,
    pub chunk: &'a LinearChunk,
    /// Reads across chunk borders; unloaded neighbors read as the occluder.
    pub sampler: NeighborSampler<'a>,
    /// Face budget for this chunk.
    pub max_faces: usize,
    /// Build precise borders and a collider.
    pub near_features: bool,
    /// Version the build is taken from; echo it back on delayed delivery.
    pub data_version: u64,
}

/// Turns block data into renderables. Triangulation lives behind this trait.
pub trait GeometryBuilder {
    /// Opaque renderable owned by the caller's renderer.
    type Handle;

    fn build(&mut self, request: &BuildRequest<'_>) -> BuildPoll<Self::Handle>;

    /// Dispose of a renderable that is no longer visible.
    fn release(&mut self, handle: Self::Handle);
}

/// Per-tick build scheduler.
#[derive(Clone, Debug)]
pub struct FrameBudgetScheduler {
    budget: FrameBudget,
    near_feature_radius: i32,
    max_faces: usize,
}

impl FrameBudgetScheduler {
    pub fn from_config(config: &ViewConfig) -> Self {
        Self {
            budget: FrameBudget::new(
                config.max_builds_per_tick,
                config.build_time_budget(),
                config.in_flight_cap(),
            ),
            near_feature_radius: config.near_feature_radius,
            max_faces: config.max_faces_per_chunk,
        }
    }

    pub fn budget(&self) -> &FrameBudget {
        &self.budget
    }

    /// Whether a chunk gets near features when built for a viewer at `home`.
    pub fn near_features(&self, coord: ChunkCoord, home: ChunkCoord) -> bool {
        coord.chebyshev_distance(home) <= self.near_feature_radius
    }

    /// Reset the budget. Call exactly once per tick, before [`run`](Self::run).
    pub fn begin_tick(&mut self, started_at: Instant, carried_in_flight: usize) {
        self.budget.reset(started_at, carried_in_flight);
    }

    /// Build candidates in order until a budget runs out.
    pub fn run<B: GeometryBuilder>(
        &mut self,
        candidates: &[Candidate],
        home: ChunkCoord,
        state: &mut ChunkViewState<B::Handle>,
        builder: &mut B,
        stats: &mut TickStats,
    ) {
        for (i, candidate) in candidates.iter().enumerate() {
            if let Some(stop) = self.budget.check(Instant::now()) {
                stats.record_stop(stop);
                stats.deferred = candidates.len() - i;
                trace!("budget stop {:?}, {} candidates deferred", stop, stats.deferred);
                break;
            }

            let coord = candidate.coord;
            let Some(chunk) = state.chunks.get(&coord) else {
                state.pending.remove(coord);
                stats.chunks_missing += 1;
                continue;
            };
            if chunk.state.is_building() {
                // Stays pending until the running build is delivered.
                stats.skipped_in_flight += 1;
                continue;
            }

            state.pending.remove(coord);
            let near_features = self.near_features(coord, home);
            let data_version = chunk.data_version;
            let data = Arc::clone(&chunk.data);

            let poll = {
                let request = BuildRequest {
                    coord,
                    chunk: &data,
                    sampler: NeighborSampler::new(&state.chunks, coord, &data),
                    max_faces: self.max_faces,
                    near_features,
                    data_version,
                };
                builder.build(&request)
            };

            self.budget.record_started();
            stats.builds += 1;
            if near_features {
                stats.near_feature_builds += 1;
            }
            trace!("built chunk {} v{} near={}", coord, data_version, near_features);

            let Some(chunk) = state.chunks.get_mut(&coord) else {
                continue;
            };
            match poll {
                BuildPoll::Ready(handle) => {
                    self.budget.record_finished();
                    if let Some(stale) = chunk.mark_ready_to_swap(handle, data_version, near_features) {
                        builder.release(stale);
                        stats.released += 1;
                    }
                }
                BuildPoll::Pending => {
                    chunk.mark_building(data_version, near_features);
                    stats.builds_pending += 1;
                }
                BuildPoll::Failed => {
                    self.budget.record_finished();
                    stats.failed_builds += 1;
                    state.pending.insert(coord, Arc::clone(&chunk.data));
                }
            }
        }
    }

    /// Swap every staged renderable in, then release what it replaced.
    ///
    /// A renderable built from outdated data is released instead and its
    /// chunk goes back to pending, unless a debounce timer for it is still
    /// armed (the timer will enqueue it).
    pub fn swap_ready<B: GeometryBuilder>(
        &mut self,
        state: &mut ChunkViewState<B::Handle>,
        builder: &mut B,
        stats: &mut TickStats,
    ) {
        let ChunkViewState { chunks, pending, timers } = state;

        for chunk in chunks.values_mut() {
            match chunk.try_swap() {
                SwapOutcome::Nothing => {}
                SwapOutcome::Swapped { released } => {
                    stats.swapped += 1;
                    if let Some(old) = released {
                        builder.release(old);
                        stats.released += 1;
                    }
                }
                SwapOutcome::Conflict { discarded } => {
                    builder.release(discarded);
                    stats.released += 1;
                    stats.version_conflicts += 1;
                    if !timers.is_armed(chunk.coord) {
                        pending.insert(chunk.coord, Arc::clone(&chunk.data));
                    }
                }
            }
        }
    }
}
