//! WASM bindings for the chunk codec and remesh scheduler.
//!
//! Provides JavaScript-accessible functions for decoding chunk payloads and a
//! [`WasmChunkView`] that drives per-tick rebuilds through two JS callbacks:
//! `build(request)` returns a renderable handle (or `undefined` to deliver it
//! later through `completeBuild`), and `release(handle)` disposes of one. A
//! callback that throws or returns `null` leaves the visible renderable in
//! place and the chunk is retried on a later tick.

use std::sync::Once;

use glam::{Mat4, Vec3};
use js_sys::{Function, Object, Reflect, Uint32Array};
use log::warn;
use wasm_bindgen::prelude::*;
use web_time::Instant;

use chunk_stream::chunk::{
    BuildPoll, BuildRequest, ChunkCoord, ChunkView, CompletionOutcome, Frustum, GeometryBuilder,
    TickStats, ViewConfig, Viewer,
};
use chunk_stream::{compress, decompress_with_report, BlockId, ChunkDims, CompressedChunk, LinearChunk, NeighborSampler};

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ============================================================================
// Logging
// ============================================================================

static INIT: Once = Once::new();

/// Install the panic hook and console logger. Safe to call more than once.
#[wasm_bindgen]
pub fn init() {
    INIT.call_once(|| {
        #[cfg(target_arch = "wasm32")]
        {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            if console_log::init_with_level(log::Level::Trace).is_err() {
                return;
            }
        }
        log::set_max_level(log::LevelFilter::Off);
    });
}

/// Enable or disable console logging.
#[wasm_bindgen]
pub fn set_log_enabled(enabled: bool) {
    let level = if enabled { log::LevelFilter::Debug } else { log::LevelFilter::Off };
    log::set_max_level(level);
}

/// Get the version of the chunk streaming library.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// ============================================================================
// Codec
// ============================================================================

/// Decoded chunk returned to JavaScript.
#[wasm_bindgen]
pub struct DecodedChunk {
    dims: [u32; 3],
    flat: Vec<u32>,
    flat_meta: Vec<u32>,
    substituted_cells: usize,
    meta_synthesized: bool,
}

#[wasm_bindgen]
impl DecodedChunk {
    /// Chunk dimensions `[sizeX, sizeY, sizeZ]`.
    #[wasm_bindgen(getter)]
    pub fn dims(&self) -> Vec<u32> {
        self.dims.to_vec()
    }

    #[wasm_bindgen(getter)]
    pub fn flat(&self) -> Vec<u32> {
        self.flat.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn flat_meta(&self) -> Vec<u32> {
        self.flat_meta.clone()
    }

    /// Cells replaced by the safe default because their palette index was bad.
    #[wasm_bindgen(getter)]
    pub fn substituted_cells(&self) -> usize {
        self.substituted_cells
    }

    /// Payload had no metadata channel.
    #[wasm_bindgen(getter)]
    pub fn meta_synthesized(&self) -> bool {
        self.meta_synthesized
    }
}

/// Compress a chunk into its JSON wire form.
///
/// `flat_meta` may be omitted, in which case metadata is all zeros.
#[wasm_bindgen]
pub fn compress_chunk(dims: Vec<u32>, flat: Vec<u32>, flat_meta: Option<Vec<u32>>) -> Result<String, JsValue> {
    let [x, y, z] = <[u32; 3]>::try_from(dims.as_slice())
        .map_err(|_| js_error("dims must have exactly 3 entries"))?;
    let dims = ChunkDims::new(x, y, z);
    let flat_meta = flat_meta.unwrap_or_else(|| vec![0; flat.len()]);

    let chunk = LinearChunk::new(dims, flat, flat_meta).map_err(js_error)?;
    compress(&chunk).to_json().map_err(js_error)
}

/// Decompress a JSON wire payload.
#[wasm_bindgen]
pub fn decompress_chunk(json: &str) -> Result<DecodedChunk, JsValue> {
    let payload = CompressedChunk::from_json(json).map_err(js_error)?;
    let (chunk, report) = decompress_with_report(&payload);
    let (dims, flat, flat_meta) = chunk.into_parts();

    Ok(DecodedChunk {
        dims: dims.to_array(),
        flat,
        flat_meta,
        substituted_cells: report.substituted_cells,
        meta_synthesized: report.meta_synthesized,
    })
}

/// Parse a `"cx,cz"` chunk key into `[cx, cz]`.
#[wasm_bindgen]
pub fn parse_chunk_key(key: &str) -> Result<Vec<i32>, JsValue> {
    let coord = ChunkCoord::parse_key(key).map_err(js_error)?;
    Ok(vec![coord.x, coord.z])
}

// ============================================================================
// Builder bridge
// ============================================================================

/// Chunk blocks with a one-cell ring of neighbor samples around X and Z.
///
/// Layout is `x + (sx + 2) * (z + (sz + 2) * y)` with local `x` and `z`
/// shifted by one, so index `(0, y, 0)` is the cell at `(-1, y, -1)`.
/// Unloaded neighbors appear as the occluder id.
pub fn padded_blocks(sampler: &NeighborSampler<'_>) -> Vec<BlockId> {
    let dims = sampler.chunk().dims();
    let (sx, sy, sz) = (dims.size_x as i32, dims.size_y as i32, dims.size_z as i32);
    let mut out = Vec::with_capacity(((sx + 2) * sy * (sz + 2)) as usize);

    for y in 0..sy {
        for z in -1..=sz {
            for x in -1..=sx {
                out.push(sampler.sample(x, y, z));
            }
        }
    }
    out
}

/// [`GeometryBuilder`] backed by JS callbacks.
struct JsBuilder {
    build: Function,
    release: Function,
}

impl JsBuilder {
    fn request_object(request: &BuildRequest<'_>) -> Result<Object, JsValue> {
        let obj = Object::new();
        let dims = request.chunk.dims().to_array();
        let padded = padded_blocks(&request.sampler);

        Reflect::set(&obj, &"cx".into(), &request.coord.x.into())?;
        Reflect::set(&obj, &"cz".into(), &request.coord.z.into())?;
        Reflect::set(&obj, &"dims".into(), &Uint32Array::from(&dims[..]).into())?;
        Reflect::set(&obj, &"blocks".into(), &Uint32Array::from(padded.as_slice()).into())?;
        Reflect::set(&obj, &"meta".into(), &Uint32Array::from(request.chunk.flat_meta()).into())?;
        Reflect::set(&obj, &"maxFaces".into(), &(request.max_faces as f64).into())?;
        Reflect::set(&obj, &"nearFeatures".into(), &request.near_features.into())?;
        Reflect::set(&obj, &"dataVersion".into(), &(request.data_version as f64).into())?;
        Ok(obj)
    }
}

impl GeometryBuilder for JsBuilder {
    type Handle = JsValue;

    fn build(&mut self, request: &BuildRequest<'_>) -> BuildPoll<JsValue> {
        let result = Self::request_object(request)
            .and_then(|obj| self.build.call1(&JsValue::NULL, &obj));

        match result {
            Ok(handle) if handle.is_undefined() => BuildPoll::Pending,
            Ok(handle) if handle.is_null() => BuildPoll::Failed,
            Ok(handle) => BuildPoll::Ready(handle),
            Err(err) => {
                warn!("build callback failed for chunk {}: {:?}", request.coord, err);
                BuildPoll::Failed
            }
        }
    }

    fn release(&mut self, handle: JsValue) {
        if handle.is_null() {
            return;
        }
        if let Err(err) = self.release.call1(&JsValue::NULL, &handle) {
            warn!("release callback failed: {:?}", err);
        }
    }
}

// ============================================================================
// Chunk view
// ============================================================================

/// Tick statistics returned to JavaScript.
#[wasm_bindgen]
pub struct WasmTickStats {
    stats: TickStats,
}

#[wasm_bindgen]
impl WasmTickStats {
    #[wasm_bindgen(getter)]
    pub fn builds(&self) -> usize {
        self.stats.builds
    }

    #[wasm_bindgen(getter)]
    pub fn failed_builds(&self) -> usize {
        self.stats.failed_builds
    }

    #[wasm_bindgen(getter)]
    pub fn deferred(&self) -> usize {
        self.stats.deferred
    }

    #[wasm_bindgen(getter)]
    pub fn swapped(&self) -> usize {
        self.stats.swapped
    }

    #[wasm_bindgen(getter)]
    pub fn released(&self) -> usize {
        self.stats.released
    }

    #[wasm_bindgen(getter)]
    pub fn version_conflicts(&self) -> usize {
        self.stats.version_conflicts
    }

    #[wasm_bindgen(getter)]
    pub fn pending_remaining(&self) -> usize {
        self.stats.pending_remaining
    }

    #[wasm_bindgen(getter)]
    pub fn debounce_fired(&self) -> usize {
        self.stats.debounce_fired
    }

    #[wasm_bindgen(getter)]
    pub fn time_budget_exceeded(&self) -> bool {
        self.stats.time_budget_exceeded
    }

    #[wasm_bindgen(getter)]
    pub fn count_budget_reached(&self) -> bool {
        self.stats.count_budget_reached
    }

    #[wasm_bindgen(getter)]
    pub fn concurrency_cap_reached(&self) -> bool {
        self.stats.concurrency_cap_reached
    }

    #[wasm_bindgen(getter)]
    pub fn elapsed_ms(&self) -> f64 {
        self.stats.elapsed_ms
    }
}

/// Chunk view driven from JavaScript.
#[wasm_bindgen]
pub struct WasmChunkView {
    view: ChunkView<JsValue>,
    builder: JsBuilder,
}

#[wasm_bindgen]
impl WasmChunkView {
    /// Create a view. `config_json` uses camelCase keys; omitted keys take
    /// their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>, build: Function, release: Function) -> Result<WasmChunkView, JsValue> {
        let config = match config_json {
            Some(json) => ViewConfig::from_json(&json).map_err(js_error)?,
            None => ViewConfig::default(),
        };
        let view = ChunkView::with_config(config).map_err(js_error)?;
        Ok(Self { view, builder: JsBuilder { build, release } })
    }

    /// Decode and load a JSON payload for chunk `(cx, cz)`.
    ///
    /// Returns the number of cells that had to be repaired. Payloads whose
    /// dims do not match the view's chunk dims are rejected.
    pub fn apply_payload(&mut self, cx: i32, cz: i32, json: &str) -> Result<usize, JsValue> {
        let report = self
            .view
            .apply_payload_json(ChunkCoord::new(cx, cz), json)
            .map_err(js_error)?;
        Ok(report.substituted_cells + report.meta_substituted_cells + report.truncated_cells + report.padded_cells)
    }

    pub fn set_block(&mut self, cx: i32, cz: i32, lx: u32, ly: u32, lz: u32, block: u32) -> bool {
        self.view.set_block(ChunkCoord::new(cx, cz), lx, ly, lz, block, Instant::now())
    }

    pub fn set_block_metadata(&mut self, cx: i32, cz: i32, lx: u32, ly: u32, lz: u32, meta: u32) -> bool {
        self.view.set_block_metadata(ChunkCoord::new(cx, cz), lx, ly, lz, meta, Instant::now())
    }

    /// Block at local coordinates, or `undefined` when not loaded.
    pub fn get_block(&self, cx: i32, cz: i32, lx: u32, ly: u32, lz: u32) -> Option<u32> {
        self.view.chunk(ChunkCoord::new(cx, cz))?.block(lx, ly, lz)
    }

    /// Unload a chunk and release its renderables.
    pub fn unload_chunk(&mut self, cx: i32, cz: i32) -> bool {
        match self.view.unload_chunk(ChunkCoord::new(cx, cz)) {
            Some(mut chunk) => {
                for handle in chunk.take_renderables() {
                    self.builder.release(handle);
                }
                true
            }
            None => false,
        }
    }

    /// Deliver a renderable for a build whose callback returned `undefined`.
    ///
    /// Returns `"staged"`, `"stale"` or `"unloaded"`.
    pub fn complete_build(&mut self, cx: i32, cz: i32, data_version: f64, handle: JsValue) -> String {
        let outcome = self.view.complete_build(
            &mut self.builder,
            ChunkCoord::new(cx, cz),
            data_version as u64,
            handle,
        );
        match outcome {
            CompletionOutcome::Staged => "staged",
            CompletionOutcome::Stale => "stale",
            CompletionOutcome::Unloaded => "unloaded",
        }
        .to_string()
    }

    /// Run one tick for a viewer at `eye` with a column-major view-projection
    /// matrix (16 floats, 0..1 clip depth).
    pub fn tick(&mut self, eye_x: f32, eye_y: f32, eye_z: f32, view_proj: Vec<f32>) -> Result<WasmTickStats, JsValue> {
        let cols = <[f32; 16]>::try_from(view_proj.as_slice())
            .map_err(|_| js_error("viewProj must have exactly 16 entries"))?;
        let frustum = Frustum::from_view_projection(Mat4::from_cols_array(&cols));

        let config = self.view.config();
        let viewer = Viewer::at(Vec3::new(eye_x, eye_y, eye_z), frustum, config.dims(), config.voxel_size);
        let stats = self.view.tick(&viewer, &mut self.builder, Instant::now());
        Ok(WasmTickStats { stats })
    }

    #[wasm_bindgen(getter)]
    pub fn chunk_count(&self) -> usize {
        self.view.chunk_count()
    }

    #[wasm_bindgen(getter)]
    pub fn pending_count(&self) -> usize {
        self.view.pending_count()
    }

    #[wasm_bindgen(getter)]
    pub fn in_flight_builds(&self) -> usize {
        self.view.in_flight_builds()
    }

    /// Unload everything and release every renderable.
    pub fn clear(&mut self) {
        self.view.clear(&mut self.builder);
    }
}
