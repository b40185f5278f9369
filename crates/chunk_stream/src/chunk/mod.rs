//! Chunk streaming for one viewer.
//!
//! This module provides the per-viewer side of the system:
//! - [`ChunkCoord`]: Chunk-space coordinates and key parsing
//! - [`ViewChunk`]: Block data plus visible and staged renderables
//! - [`PendingMeshSet`]: Deduped set of chunks awaiting rebuild
//! - [`EditDebouncer`]: One cancellable quiet-interval timer per chunk
//! - [`CandidateSelector`]: Radius and frustum filtering, distance ranking
//! - [`FrameBudgetScheduler`]: Count/time/concurrency-budgeted builds and swaps
//! - [`ChunkView`]: Central orchestrator owning all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          ChunkView                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ChunkViewState                                                 │
//! │    HashMap<ChunkCoord, ViewChunk>  - Chunk storage              │
//! │    PendingMeshSet                  - Awaiting rebuild           │
//! │    EditDebouncer                   - Debounce timers            │
//! │  CandidateSelector                 - Filter + rank              │
//! │  FrameBudgetScheduler              - Budgeted build + swap      │
//! │  ViewConfig                        - Tunables                   │
//! └─────────────────────────────────────────────────────────────────┘
//!
//!  payload ──▶ decode ──▶ insert ─────────────┐
//!  edit ─────▶ debounce ──(quiet interval)──▶ PendingMeshSet
//!                                             │
//!                                   CandidateSelector
//!                                             │
//!                                FrameBudgetScheduler ──▶ GeometryBuilder
//!                                             │
//!                                      swap, then release
//! ```
//!
//! # State Machine
//!
//! Each chunk's renderable goes through the following states:
//!
//! ```text
//!                     ┌──────────────────────────────────┐
//!                     │      (version conflict)          │
//!                     ▼                                  │
//! ┌─────────┐    ┌─────────┐    ┌──────────┐    ┌──────────────┐
//! │  Clean  │───▶│  Dirty  │───▶│ Building │───▶│ ReadyToSwap  │
//! └─────────┘    └─────────┘    └──────────┘    └──────────────┘
//!      ▲              │                                 │
//!      │              └──────(synchronous build)───────▶│
//!      └────────────────────────────────────────────────┘
//!                    (swap complete)
//! ```
//!
//! # Usage
//!
//! ```
//! use chunk_stream::chunk::{
//!     BuildPoll, BuildRequest, ChunkCoord, ChunkView, Frustum, GeometryBuilder, Viewer,
//! };
//! use chunk_stream::core::{ChunkDims, LinearChunk};
//! use glam::Vec3;
//! use web_time::Instant;
//!
//! struct CountFaces;
//!
//! impl GeometryBuilder for CountFaces {
//!     type Handle = usize;
//!
//!     fn build(&mut self, request: &BuildRequest<'_>) -> BuildPoll<usize> {
//!         BuildPoll::Ready(request.chunk.solid_count().min(request.max_faces))
//!     }
//!
//!     fn release(&mut self, _handle: usize) {}
//! }
//!
//! let mut view = ChunkView::new();
//! view.insert_chunk(ChunkCoord::new(0, 0), LinearChunk::filled(ChunkDims::new(16, 256, 16), 1));
//!
//! let viewer = Viewer::new(Vec3::new(8.0, 64.0, 8.0), Frustum::unbounded(), ChunkCoord::ZERO);
//! let stats = view.tick(&viewer, &mut CountFaces, Instant::now());
//!
//! assert_eq!(stats.builds, 1);
//! assert!(view.chunk(ChunkCoord::ZERO).unwrap().mesh.is_some());
//! ```

pub mod coord;
pub mod frustum;
pub mod state;
pub mod chunk;
pub mod pending;
pub mod debounce;
pub mod candidates;
pub mod budget;
pub mod config;
pub mod stats;
pub mod scheduler;
pub mod view;

// Re-export primary types
pub use coord::{ChunkCoord, ChunkKeyError};
pub use frustum::{Aabb, Frustum, Plane};
pub use state::{ChunkState, BoundaryFlags};
pub use chunk::{SwapOutcome, ViewChunk};
pub use pending::{PendingEntry, PendingMeshSet};
pub use debounce::{EditDebouncer, TimerToken, DEFAULT_DEBOUNCE_INTERVAL};
pub use candidates::{Candidate, CandidateSelector, Viewer, ranking_distance};
pub use budget::{BudgetStop, FrameBudget};
pub use config::{ConfigError, ViewConfig};
pub use stats::{ChunkDebugInfo, TickStats};
pub use scheduler::{BuildPoll, BuildRequest, FrameBudgetScheduler, GeometryBuilder};
pub use view::{ChunkView, ChunkViewState, CompletionOutcome};
