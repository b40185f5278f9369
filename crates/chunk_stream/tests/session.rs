//! End-to-end chunk view sessions: payloads in, renderables out.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use web_time::{Duration, Instant};

use chunk_stream::chunk::{
    BuildPoll, BuildRequest, ChunkCoord, ChunkView, Frustum, GeometryBuilder, ViewConfig, Viewer,
};
use chunk_stream::{compress, sample, ChunkDims, LinearChunk, BLOCK_EMPTY, BLOCK_OCCLUDER};

const DIMS: ChunkDims = ChunkDims::new(8, 16, 8);

/// Builder that counts exposed border faces through the sampler and keeps
/// track of which handles are alive.
#[derive(Default)]
struct FaceCounter {
    next: u64,
    live: HashMap<u64, ChunkCoord>,
    builds_per_chunk: HashMap<ChunkCoord, usize>,
    exposed_west_faces: HashMap<ChunkCoord, usize>,
}

impl GeometryBuilder for FaceCounter {
    type Handle = u64;

    fn build(&mut self, request: &BuildRequest<'_>) -> BuildPoll<u64> {
        let dims = request.chunk.dims();
        let mut exposed = 0;
        for y in 0..dims.size_y {
            for z in 0..dims.size_z {
                let inside = request.chunk.block(0, y, z).unwrap_or(BLOCK_EMPTY);
                let west = request.sampler.sample(-1, y as i32, z as i32);
                if inside != BLOCK_EMPTY && west == BLOCK_EMPTY {
                    exposed += 1;
                }
            }
        }
        self.exposed_west_faces.insert(request.coord, exposed);
        *self.builds_per_chunk.entry(request.coord).or_default() += 1;

        self.next += 1;
        self.live.insert(self.next, request.coord);
        BuildPoll::Ready(self.next)
    }

    fn release(&mut self, handle: u64) {
        assert!(self.live.remove(&handle).is_some(), "double release of {handle}");
    }
}

fn config() -> ViewConfig {
    ViewConfig {
        chunk_dims: DIMS.to_array(),
        build_time_budget_ms: 60_000.0,
        max_builds_per_tick: 3,
        visual_radius: 6,
        must_include_radius: 1,
        near_feature_radius: 0,
        ..ViewConfig::default()
    }
}

fn terrain(height: u32) -> LinearChunk {
    let mut chunk = LinearChunk::empty(DIMS);
    for y in 0..height {
        for z in 0..DIMS.size_z {
            for x in 0..DIMS.size_x {
                chunk.set_block(x, y, z, 1);
            }
        }
    }
    chunk
}

fn overhead_viewer() -> Viewer {
    Viewer::new(Vec3::new(4.0, 8.0, 4.0), Frustum::unbounded(), ChunkCoord::ZERO)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn streamed_payloads_build_nearest_first_within_budget() {
    let mut view: ChunkView<u64> = ChunkView::with_config(config()).unwrap();
    let mut builder = FaceCounter::default();

    let coords: Vec<ChunkCoord> = (-2..=2)
        .flat_map(|x| (-2..=2).map(move |z| ChunkCoord::new(x, z)))
        .collect();
    for &coord in coords.iter().rev() {
        let payload = compress(&terrain(4));
        let json = payload.to_json().unwrap();
        view.apply_payload_json(coord, &json).unwrap();
    }
    assert_eq!(view.chunk_count(), 25);

    let t0 = Instant::now();
    let mut ticks = 0;
    let mut first_tick_builds = Vec::new();
    while view.pending_count() > 0 {
        let before: Vec<_> = builder.builds_per_chunk.keys().copied().collect();
        let stats = view.tick(&overhead_viewer(), &mut builder, t0 + ms(16 * ticks));
        assert!(stats.builds <= 3);
        if ticks == 0 {
            first_tick_builds = builder
                .builds_per_chunk
                .keys()
                .filter(|c| !before.contains(c))
                .copied()
                .collect();
        }
        ticks += 1;
        assert!(ticks < 100, "pending set never drained");
    }

    assert!(first_tick_builds.contains(&ChunkCoord::ZERO));
    for coord in &first_tick_builds {
        assert!(coord.chebyshev_distance(ChunkCoord::ZERO) <= 1);
    }
    assert!(view.iter_chunks().all(|(_, c)| c.mesh.is_some()));
    assert_eq!(builder.live.len(), 25);
}

#[test]
fn budget_conservation_across_ticks() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut view: ChunkView<u64> = ChunkView::with_config(config()).unwrap();
    let mut builder = FaceCounter::default();
    let t0 = Instant::now();

    for x in -3..=3 {
        for z in -3..=3 {
            view.insert_chunk(ChunkCoord::new(x, z), terrain(rng.gen_range(0..DIMS.size_y)));
        }
    }

    for tick in 0..40u64 {
        let pending_before: Vec<ChunkCoord> = view
            .iter_chunks()
            .map(|(&c, _)| c)
            .filter(|&c| view.is_pending(c))
            .collect();
        let builds_before = builder.builds_per_chunk.clone();

        let stats = view.tick(&overhead_viewer(), &mut builder, t0 + ms(tick * 16));
        assert!(stats.builds <= view.config().max_builds_per_tick);

        // Every chunk that was pending and not built this tick is still pending.
        for coord in pending_before {
            let built = builder.builds_per_chunk.get(&coord) != builds_before.get(&coord);
            assert!(built || view.is_pending(coord), "chunk {coord} dropped");
        }

        if rng.gen_bool(0.5) {
            let coord = ChunkCoord::new(rng.gen_range(-3..=3), rng.gen_range(-3..=3));
            view.set_block(coord, rng.gen_range(0..8), rng.gen_range(0..16), rng.gen_range(0..8), 2, t0 + ms(tick * 16));
        }
    }
}

#[test]
fn edit_burst_coalesces_into_one_rebuild() {
    let mut view: ChunkView<u64> = ChunkView::with_config(config()).unwrap();
    let mut builder = FaceCounter::default();
    let coord = ChunkCoord::ZERO;
    let t0 = Instant::now();

    view.insert_chunk(coord, terrain(4));
    view.tick(&overhead_viewer(), &mut builder, t0);
    assert_eq!(builder.builds_per_chunk[&coord], 1);

    // 30 edits, 40 ms apart, ticking at 60 Hz throughout.
    let mut now = t0;
    let mut fired = 0;
    for i in 0..30u32 {
        view.set_block(coord, 1 + i % 6, 10, 1 + i % 6, 3, now);
        for _ in 0..2 {
            now += ms(20);
            fired += view.tick(&overhead_viewer(), &mut builder, now).debounce_fired;
        }
    }
    assert_eq!(fired, 0);
    assert_eq!(builder.builds_per_chunk[&coord], 1);

    let stats = view.tick(&overhead_viewer(), &mut builder, now + ms(150));
    assert_eq!(stats.debounce_fired, 1);
    assert_eq!(stats.builds, 1);
    assert_eq!(builder.builds_per_chunk[&coord], 2);
}

#[test]
fn unload_during_debounce_is_silent() {
    let mut view: ChunkView<u64> = ChunkView::with_config(config()).unwrap();
    let mut builder = FaceCounter::default();
    let coord = ChunkCoord::new(1, 1);
    let t0 = Instant::now();

    view.insert_chunk(coord, terrain(4));
    view.tick(&overhead_viewer(), &mut builder, t0);
    view.set_block(coord, 3, 3, 3, 0, t0);

    let mut removed = view.unload_chunk(coord).unwrap();
    for handle in removed.take_renderables() {
        builder.release(handle);
    }

    let stats = view.tick(&overhead_viewer(), &mut builder, t0 + ms(500));
    assert_eq!(stats.debounce_fired, 0);
    assert_eq!(stats.debounce_skipped, 0);
    assert_eq!(stats.builds, 0);
    assert!(builder.live.is_empty());
}

#[test]
fn unloaded_neighbor_reads_as_occluder_until_it_arrives() {
    let mut view: ChunkView<u64> = ChunkView::with_config(config()).unwrap();
    let mut builder = FaceCounter::default();
    let t0 = Instant::now();

    view.insert_chunk(ChunkCoord::ZERO, terrain(4));
    view.tick(&overhead_viewer(), &mut builder, t0);

    assert_eq!(sample(&view, ChunkCoord::ZERO, -1, 0, 0), BLOCK_OCCLUDER);
    assert_eq!(builder.exposed_west_faces[&ChunkCoord::ZERO], 0);

    // An empty west neighbor arrives: the seam faces become visible.
    view.insert_chunk(ChunkCoord::new(-1, 0), LinearChunk::empty(DIMS));
    assert!(view.is_pending(ChunkCoord::ZERO));
    view.tick(&overhead_viewer(), &mut builder, t0 + ms(16));

    assert_eq!(sample(&view, ChunkCoord::ZERO, -1, 0, 0), BLOCK_EMPTY);
    assert_eq!(builder.exposed_west_faces[&ChunkCoord::ZERO], 4 * DIMS.size_z as usize);
}

#[test]
fn frustum_defers_offscreen_chunks_but_keeps_them_pending() {
    let mut view: ChunkView<u64> = ChunkView::with_config(config()).unwrap();
    let mut builder = FaceCounter::default();

    let eye = Vec3::new(4.0, 8.0, 4.0);
    let proj = Mat4::perspective_rh(70f32.to_radians(), 1.0, 0.1, 500.0);
    let looking_east = Mat4::look_at_rh(eye, eye + Vec3::X, Vec3::Y);
    let viewer = Viewer::new(eye, Frustum::from_view_projection(proj * looking_east), ChunkCoord::ZERO);

    let east = ChunkCoord::new(4, 0);
    let west = ChunkCoord::new(-4, 0);
    view.insert_chunk(east, terrain(2));
    view.insert_chunk(west, terrain(2));

    let stats = view.tick(&viewer, &mut builder, Instant::now());
    assert_eq!(stats.builds, 1);
    assert!(view.chunk(east).unwrap().mesh.is_some());
    assert!(view.is_pending(west));

    // Turning around brings it in.
    let looking_west = Mat4::look_at_rh(eye, eye - Vec3::X, Vec3::Y);
    let viewer = Viewer::new(eye, Frustum::from_view_projection(proj * looking_west), ChunkCoord::ZERO);
    let stats = view.tick(&viewer, &mut builder, Instant::now());
    assert_eq!(stats.builds, 1);
    assert!(!view.is_pending(west));
}
