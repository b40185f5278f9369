//! Browser tests for the WASM bindings.

#![cfg(target_arch = "wasm32")]

use js_sys::Function;
use wasm_bindgen_test::*;

use wasm_chunk_stream::{compress_chunk, decompress_chunk, parse_chunk_key, WasmChunkView};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn codec_roundtrip() {
    let json = compress_chunk(vec![2, 1, 2], vec![1, 1, 2, 2], None).unwrap();
    let decoded = decompress_chunk(&json).unwrap();

    assert_eq!(decoded.dims(), vec![2, 1, 2]);
    assert_eq!(decoded.flat(), vec![1, 1, 2, 2]);
    assert_eq!(decoded.flat_meta(), vec![0, 0, 0, 0]);
    assert_eq!(decoded.substituted_cells(), 0);
}

#[wasm_bindgen_test]
fn legacy_payload_without_meta() {
    let decoded = decompress_chunk(r#"{"version":1,"dims":[2,1,2],"palette":[5],"runs":[{"index":1,"count":4}]}"#).unwrap();
    assert!(decoded.meta_synthesized());
    assert_eq!(decoded.flat_meta(), vec![0, 0, 0, 0]);
}

#[wasm_bindgen_test]
fn bad_inputs_are_errors() {
    assert!(compress_chunk(vec![2, 2], vec![1; 4], None).is_err());
    assert!(decompress_chunk("not json").is_err());
    assert!(parse_chunk_key("1;2").is_err());
    assert_eq!(parse_chunk_key("-3,4").unwrap(), vec![-3, 4]);
}

#[wasm_bindgen_test]
fn view_ticks_through_callbacks() {
    let build = Function::new_with_args("req", "return req.cx * 100 + req.cz;");
    let release = Function::new_no_args("");
    let config = r#"{"chunkDims":[4,4,4]}"#.to_string();
    let mut view = WasmChunkView::new(Some(config), build, release).unwrap();

    let payload = compress_chunk(vec![4, 4, 4], vec![1; 64], None).unwrap();
    assert_eq!(view.apply_payload(0, 0, &payload).unwrap(), 0);
    assert_eq!(view.pending_count(), 1);

    let identity: Vec<f32> = glam::Mat4::IDENTITY.to_cols_array().to_vec();
    let stats = view.tick(2.0, 2.0, 2.0, identity).unwrap();
    assert_eq!(stats.builds(), 1);
    assert_eq!(stats.swapped(), 1);
    assert_eq!(view.pending_count(), 0);

    assert!(view.unload_chunk(0, 0));
    assert_eq!(view.chunk_count(), 0);
}

#[wasm_bindgen_test]
fn throwing_build_keeps_chunk_pending() {
    let build = Function::new_with_args("req", "throw new Error('no geometry');");
    let release = Function::new_no_args("");
    let config = r#"{"chunkDims":[4,4,4]}"#.to_string();
    let mut view = WasmChunkView::new(Some(config), build, release).unwrap();

    let payload = compress_chunk(vec![4, 4, 4], vec![1; 64], None).unwrap();
    view.apply_payload(0, 0, &payload).unwrap();

    let identity: Vec<f32> = glam::Mat4::IDENTITY.to_cols_array().to_vec();
    let stats = view.tick(2.0, 2.0, 2.0, identity).unwrap();
    assert_eq!(stats.failed_builds(), 1);
    assert_eq!(stats.swapped(), 0);
    assert_eq!(view.pending_count(), 1);
}

#[wasm_bindgen_test]
fn mismatched_payload_dims_are_rejected() {
    let build = Function::new_with_args("req", "return 1;");
    let release = Function::new_no_args("");
    let config = r#"{"chunkDims":[4,4,4]}"#.to_string();
    let mut view = WasmChunkView::new(Some(config), build, release).unwrap();

    assert!(view.apply_payload(0, 0, r#"{"version":1,"dims":[0,4,4],"palette":[],"runs":[]}"#).is_err());
    assert_eq!(view.chunk_count(), 0);
}
