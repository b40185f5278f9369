//! Configuration for candidate selection, build budgets and debouncing.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::codec::MAX_DECODED_CELLS;
use crate::core::{ChunkDims, DEFAULT_DIMS};

/// Rejected configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("maxBuildsPerTick must be at least 1")]
    ZeroBuildBudget,

    #[error("maxInFlightBuilds must be at least 1")]
    ZeroConcurrency,

    #[error("buildTimeBudgetMs must be finite and > 0 (got {0})")]
    InvalidTimeBudget(f64),

    #[error("{name} must be >= 0 (got {value})")]
    NegativeRadius { name: &'static str, value: i32 },

    #[error("nearFeatureRadius ({near}) must be smaller than mustIncludeRadius ({must_include})")]
    NearFeatureRadiusTooLarge { near: i32, must_include: i32 },

    #[error("chunkDims must be >= 1 on every axis and hold at most 16M cells (got {0:?})")]
    InvalidDims([u32; 3]),

    #[error("voxelSize must be finite and > 0 (got {0})")]
    InvalidVoxelSize(f32),

    #[error("malformed view config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables for one chunk view.
///
/// Deserializes from camelCase JSON; every field is optional and falls back to
/// [`ViewConfig::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewConfig {
    /// Maximum builds started per tick.
    pub max_builds_per_tick: usize,

    /// Maximum builds in flight at once. `None` means equal to
    /// `max_builds_per_tick`.
    pub max_in_flight_builds: Option<usize>,

    /// Maximum time (ms) to spend building per tick.
    pub build_time_budget_ms: f64,

    /// Chunks farther than this (chunk units, squared distance) are never candidates.
    pub visual_radius: i32,

    /// Chunks within this Chebyshev radius of home skip the frustum test.
    pub must_include_radius: i32,

    /// Chunks within this Chebyshev radius of home get precise borders and colliders.
    pub near_feature_radius: i32,

    /// Quiet interval before a debounced edit triggers a rebuild.
    pub debounce_interval_ms: u64,

    /// Diagnostic switch: treat every chunk as inside the frustum.
    pub frustum_culling_disabled: bool,

    /// Face budget handed to the geometry builder per chunk.
    pub max_faces_per_chunk: usize,

    /// Cells per chunk on each axis.
    pub chunk_dims: [u32; 3],

    /// World units per cell.
    pub voxel_size: f32,

    /// Margin (world units) added around chunk boxes before the frustum test.
    pub aabb_padding: f32,

    /// Re-mark loaded neighbors when a chunk arrives, so faces hidden behind
    /// the unloaded-neighbor placeholder get rebuilt.
    pub remesh_neighbors_on_load: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            max_builds_per_tick: 4,
            max_in_flight_builds: None,
            build_time_budget_ms: 8.0, // ~half a frame at 60fps
            visual_radius: 12,
            must_include_radius: 2,
            near_feature_radius: 1,
            debounce_interval_ms: 150,
            frustum_culling_disabled: false,
            max_faces_per_chunk: 65_536,
            chunk_dims: DEFAULT_DIMS.to_array(),
            voxel_size: 1.0,
            aabb_padding: 0.5,
            remesh_neighbors_on_load: true,
        }
    }
}

impl ViewConfig {
    /// Create a config optimized for high-end systems.
    pub fn high_performance() -> Self {
        Self {
            max_builds_per_tick: 8,
            build_time_budget_ms: 12.0,
            visual_radius: 24,
            ..Self::default()
        }
    }

    /// Create a config optimized for low-end systems.
    pub fn low_performance() -> Self {
        Self {
            max_builds_per_tick: 2,
            build_time_budget_ms: 4.0,
            visual_radius: 8,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_builds_per_tick == 0 {
            return Err(ConfigError::ZeroBuildBudget);
        }
        if self.max_in_flight_builds == Some(0) {
            return Err(ConfigError::ZeroConcurrency);
        }
        if !self.build_time_budget_ms.is_finite() || self.build_time_budget_ms <= 0.0 {
            return Err(ConfigError::InvalidTimeBudget(self.build_time_budget_ms));
        }
        for (name, value) in [
            ("visualRadius", self.visual_radius),
            ("mustIncludeRadius", self.must_include_radius),
            ("nearFeatureRadius", self.near_feature_radius),
        ] {
            if value < 0 {
                return Err(ConfigError::NegativeRadius { name, value });
            }
        }
        if self.near_feature_radius >= self.must_include_radius {
            return Err(ConfigError::NearFeatureRadiusTooLarge {
                near: self.near_feature_radius,
                must_include: self.must_include_radius,
            });
        }
        let dims = self.dims();
        if dims.is_degenerate() || dims.checked_volume().map_or(true, |v| v > MAX_DECODED_CELLS) {
            return Err(ConfigError::InvalidDims(self.chunk_dims));
        }
        if !self.voxel_size.is_finite() || self.voxel_size <= 0.0 {
            return Err(ConfigError::InvalidVoxelSize(self.voxel_size));
        }
        Ok(())
    }

    /// Effective concurrency cap.
    pub fn in_flight_cap(&self) -> usize {
        self.max_in_flight_builds.unwrap_or(self.max_builds_per_tick)
    }

    pub fn build_time_budget(&self) -> Duration {
        Duration::from_micros((self.build_time_budget_ms.max(0.0) * 1000.0).round() as u64)
    }

    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }

    pub fn dims(&self) -> ChunkDims {
        ChunkDims::from(self.chunk_dims)
    }
}
