//! Distance-ranked, visibility-filtered rebuild candidates.

use glam::Vec3;
use log::trace;

use crate::core::ChunkDims;
use super::config::ViewConfig;
use super::coord::ChunkCoord;
use super::frustum::{Aabb, Frustum};
use super::pending::PendingMeshSet;

/// Where the viewer is and what it can see.
#[derive(Clone, Copy, Debug)]
pub struct Viewer {
    /// World-space eye position.
    pub position: Vec3,
    /// Current view frustum.
    pub frustum: Frustum,
    /// Chunk the viewer stands in.
    pub home: ChunkCoord,
}

impl Viewer {
    pub fn new(position: Vec3, frustum: Frustum, home: ChunkCoord) -> Self {
        Self { position, frustum, home }
    }

    /// Viewer whose home chunk is derived from its position.
    pub fn at(position: Vec3, frustum: Frustum, dims: ChunkDims, voxel_size: f32) -> Self {
        Self::new(position, frustum, ChunkCoord::from_world(position, dims, voxel_size))
    }
}

/// A pending chunk selected for this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub coord: ChunkCoord,
    /// Distance from the viewer to the chunk's center at the viewer's height.
    pub distance: f32,
    /// Pending-set insertion sequence.
    pub seq: u64,
    /// Within the must-include radius of home.
    pub must_include: bool,
    /// Padded box intersected the frustum.
    pub in_frustum: bool,
}

/// Filters and ranks pending chunks.
///
/// A chunk is a candidate iff it is inside the visual radius **and** at least
/// one of: inside the must-include radius, its padded box intersects the
/// frustum, or frustum culling is disabled.
#[derive(Clone, Debug)]
pub struct CandidateSelector {
    pub must_include_radius: i32,
    pub visual_radius: i32,
    pub frustum_culling_disabled: bool,
    pub aabb_padding: f32,
    pub dims: ChunkDims,
    pub voxel_size: f32,
}

impl CandidateSelector {
    pub fn from_config(config: &ViewConfig) -> Self {
        Self {
            must_include_radius: config.must_include_radius,
            visual_radius: config.visual_radius,
            frustum_culling_disabled: config.frustum_culling_disabled,
            aabb_padding: config.aabb_padding,
            dims: config.dims(),
            voxel_size: config.voxel_size,
        }
    }

    /// Evaluate one chunk on the configured grid. `None` when it is filtered
    /// out.
    pub fn evaluate(&self, coord: ChunkCoord, seq: u64, viewer: &Viewer) -> Option<Candidate> {
        self.evaluate_sized(coord, seq, self.dims, viewer)
    }

    /// Evaluate one chunk whose block data spans `chunk_dims`. The box starts
    /// at the chunk's grid origin and covers the data it actually holds.
    pub fn evaluate_sized(
        &self,
        coord: ChunkCoord,
        seq: u64,
        chunk_dims: ChunkDims,
        viewer: &Viewer,
    ) -> Option<Candidate> {
        let visual = self.visual_radius as i64;
        if coord.distance_squared(viewer.home) > visual * visual {
            trace!("chunk {} beyond visual radius", coord);
            return None;
        }

        let must_include = coord.chebyshev_distance(viewer.home) <= self.must_include_radius;
        let min = coord.origin_world(self.dims, self.voxel_size);
        let extent = Vec3::new(
            chunk_dims.size_x as f32,
            chunk_dims.size_y as f32,
            chunk_dims.size_z as f32,
        ) * self.voxel_size;
        let aabb = Aabb::new(min, min + extent);
        let in_frustum = viewer.frustum.intersects_aabb(&aabb.expanded(self.aabb_padding));

        if !(must_include || in_frustum || self.frustum_culling_disabled) {
            trace!("chunk {} outside frustum", coord);
            return None;
        }

        Some(Candidate {
            coord,
            distance: ranking_distance(aabb.center(), viewer.position),
            seq,
            must_include,
            in_frustum,
        })
    }

    /// Candidates from `pending`, nearest first, ties in insertion order.
    pub fn select(&self, pending: &PendingMeshSet, viewer: &Viewer) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = pending
            .iter()
            .filter_map(|(&coord, entry)| self.evaluate_sized(coord, entry.seq, entry.chunk.dims(), viewer))
            .collect();
        sort_candidates(&mut candidates);
        candidates
    }
}

/// Distance from `viewer` to `center` measured at the viewer's own height.
pub fn ranking_distance(center: Vec3, viewer: Vec3) -> f32 {
    viewer.distance(Vec3::new(center.x, viewer.y, center.z))
}

/// Ascending by distance; equal distances keep insertion order.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.seq.cmp(&b.seq))
    });
}
