//! Statistics structs for chunk view operations.

use super::budget::BudgetStop;

/// Statistics from one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickStats {
    /// Debounce timers that fired and enqueued their chunk.
    pub debounce_fired: usize,
    /// Debounce timers that fired after their chunk was unloaded.
    pub debounce_skipped: usize,
    /// Pending chunks that passed candidate selection.
    pub candidates: usize,
    /// Builds handed to the geometry builder this tick.
    pub builds: usize,
    /// Builds started with near features (precise borders, collider).
    pub near_feature_builds: usize,
    /// Builds that are still running after the builder returned.
    pub builds_pending: usize,
    /// Builds the builder gave up on; their chunks stay pending.
    pub failed_builds: usize,
    /// Candidates left pending because a budget ran out.
    pub deferred: usize,
    /// Candidates skipped because an earlier build for them is still in flight.
    pub skipped_in_flight: usize,
    /// Pending entries dropped because their chunk no longer exists.
    pub chunks_missing: usize,
    /// Whether the time budget stopped the tick.
    pub time_budget_exceeded: bool,
    /// Whether the count budget stopped the tick.
    pub count_budget_reached: bool,
    /// Whether the concurrency cap stopped the tick.
    pub concurrency_cap_reached: bool,
    /// Renderables swapped into the visible slot.
    pub swapped: usize,
    /// Renderables released to the builder.
    pub released: usize,
    /// Finished builds discarded because the chunk changed meanwhile.
    pub version_conflicts: usize,
    /// Pending set size after the tick.
    pub pending_remaining: usize,
    /// Total time spent in the tick (milliseconds).
    pub elapsed_ms: f64,
}

impl TickStats {
    /// Check if any builds were started.
    pub fn any_built(&self) -> bool {
        self.builds > 0
    }

    /// Check if more work remains.
    pub fn has_remaining(&self) -> bool {
        self.pending_remaining > 0
    }

    /// Record why the scheduler stopped.
    pub fn record_stop(&mut self, stop: BudgetStop) {
        match stop {
            BudgetStop::CountExhausted => self.count_budget_reached = true,
            BudgetStop::TimeExceeded => self.time_budget_exceeded = true,
            BudgetStop::ConcurrencyCapped => self.concurrency_cap_reached = true,
        }
    }

    /// Reason the tick stopped early, if any.
    pub fn stop_reason(&self) -> Option<BudgetStop> {
        if self.count_budget_reached {
            Some(BudgetStop::CountExhausted)
        } else if self.time_budget_exceeded {
            Some(BudgetStop::TimeExceeded)
        } else if self.concurrency_cap_reached {
            Some(BudgetStop::ConcurrencyCapped)
        } else {
            None
        }
    }
}

/// Debug information about chunk view state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkDebugInfo {
    /// Total number of loaded chunks.
    pub total_chunks: usize,
    /// Chunks in Clean state.
    pub clean_chunks: usize,
    /// Chunks in Dirty state.
    pub dirty_chunks: usize,
    /// Chunks with a build in flight.
    pub building_chunks: usize,
    /// Chunks in ReadyToSwap state.
    pub ready_to_swap_chunks: usize,
    /// Chunks with a visible renderable.
    pub chunks_with_mesh: usize,
    /// Chunks whose visible renderable carries near features.
    pub near_feature_chunks: usize,
    /// Size of the pending set.
    pub pending_size: usize,
    /// Live debounce timers.
    pub armed_timers: usize,
    /// Estimated memory usage for block data (bytes).
    pub block_memory_bytes: usize,
}

impl ChunkDebugInfo {
    /// Block memory in megabytes.
    pub fn block_memory_mb(&self) -> f32 {
        self.block_memory_bytes as f32 / (1024.0 * 1024.0)
    }
}
