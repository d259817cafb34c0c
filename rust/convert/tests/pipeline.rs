// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end pipeline tests with a synthetic box parser standing in for
//! a real format parser.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use xkt_lite_convert::{
    convert, convert_batch, ConvertOptions, ConvertRequest, Error, ParseError, ParseInput,
    ParserRegistry, SceneModel, SourceFormat, SourceParser,
};
use xkt_lite_model::{GeometryBuffers, MeshParams, PrimitiveType};

/// Minimal source description: a list of axis-aligned boxes
#[derive(Deserialize)]
struct BoxSpec {
    center: [f64; 3],
    size: f64,
}

/// Test parser that builds one entity per box in a JSON source
struct BoxParser;

impl SourceParser for BoxParser {
    fn parse(&self, input: ParseInput<'_>, model: &mut SceneModel) -> Result<(), ParseError> {
        let boxes: Vec<BoxSpec> = serde_json::from_slice(input.data)
            .map_err(|e| ParseError(format!("invalid box source: {e}")))?;
        for spec in &boxes {
            let geometry = model
                .create_geometry(
                    PrimitiveType::Triangles,
                    GeometryBuffers::with_positions(box_positions(spec.center, spec.size / 2.0))
                        .indices(box_indices()),
                )
                .map_err(|e| ParseError(e.to_string()))?;
            let mesh = model
                .create_mesh(MeshParams::new(geometry))
                .map_err(|e| ParseError(e.to_string()))?;
            model
                .create_entity(&[mesh], None)
                .map_err(|e| ParseError(e.to_string()))?;
        }
        Ok(())
    }
}

fn box_positions(center: [f64; 3], half: f64) -> Vec<f64> {
    let mut positions = Vec::with_capacity(24);
    for corner in 0..8u8 {
        positions.push(center[0] + if corner & 1 != 0 { half } else { -half });
        positions.push(center[1] + if corner & 2 != 0 { half } else { -half });
        positions.push(center[2] + if corner & 4 != 0 { half } else { -half });
    }
    positions
}

fn box_indices() -> Vec<u32> {
    vec![
        0, 1, 3, 0, 3, 2, //
        4, 6, 7, 4, 7, 5, //
        0, 4, 5, 0, 5, 1, //
        2, 3, 7, 2, 7, 6, //
        0, 2, 6, 0, 6, 4, //
        1, 5, 7, 1, 7, 3,
    ]
}

fn registry() -> ParserRegistry {
    ParserRegistry::new().register(SourceFormat::Gltf, Box::new(BoxParser))
}

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("xkt-lite-tests-{}", std::process::id()))
        .join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn boxes_json(count: usize, spacing: f64) -> String {
    let specs: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#"{{"center": [{}, 0.0, 0.0], "size": 2.0}}"#,
                i as f64 * spacing
            )
        })
        .collect();
    format!("[{}]", specs.join(","))
}

#[test]
fn test_convert_in_memory_round_trip() {
    let collected: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_target = collected.clone();

    let mut request = ConvertRequest::from_data(
        boxes_json(3, 10.0).into_bytes(),
        SourceFormat::Gltf,
        Box::new(move |bytes| sink_target.lock().unwrap().extend_from_slice(bytes)),
    );
    let stats = convert(&mut request, &registry()).unwrap();

    assert_eq!(stats.source_format, "gltf");
    assert_eq!(stats.num_objects, 3);
    assert_eq!(stats.num_triangles, 36);
    assert_eq!(stats.num_vertices, 24);
    assert!(stats.xkt_size > 0);
    assert!(stats.conversion_time >= 0.0);

    let bytes = collected.lock().unwrap().clone();
    assert_eq!(bytes.len() as u64, stats.xkt_size);

    let scene = xkt_lite_codec::read_model(&bytes).unwrap();
    assert_eq!(scene.entity_count(), 3);
    assert_eq!(scene.triangle_count(), 36);
    assert_eq!(scene.vertex_count(), 24);
    assert_eq!(scene.meta_objects.len(), 3);
}

#[test]
fn test_empty_source_writes_no_output() {
    let dir = test_dir("empty-source");
    let source = dir.join("empty.gltf");
    std::fs::write(&source, "[]").unwrap();
    let output = dir.join("empty.xkt");

    let mut request = ConvertRequest::from_path(&source, &output);
    let result = convert(&mut request, &registry());
    assert!(matches!(
        result,
        Err(Error::Model(xkt_lite_model::Error::EmptyModel))
    ));
    assert!(!output.exists());
}

#[test]
fn test_no_parser_registered() {
    let mut request = ConvertRequest::from_data(
        b"solid x".to_vec(),
        SourceFormat::Stl,
        Box::new(|_| {}),
    );
    let result = convert(&mut request, &registry());
    assert!(matches!(result, Err(Error::NoParser(SourceFormat::Stl))));
}

#[test]
fn test_batch_preserves_manifest_order() {
    let dir = test_dir("batch-order");
    for name in ["alpha", "beta", "gamma"] {
        std::fs::write(dir.join(format!("{name}.gltf")), boxes_json(2, 5.0)).unwrap();
    }
    let manifest_path = dir.join("manifest.json");
    std::fs::write(
        &manifest_path,
        r#"{"gltfOutFiles": ["alpha.gltf", "beta.gltf", "gamma.gltf"]}"#,
    )
    .unwrap();

    let output_manifest = dir.join("out").join("model.xkt.manifest.json");
    std::fs::create_dir_all(output_manifest.parent().unwrap()).unwrap();

    let result = convert_batch(
        &manifest_path,
        &output_manifest,
        &ConvertOptions::default(),
        &registry(),
    )
    .unwrap();

    assert_eq!(
        result.manifest.xkt_files,
        vec!["alpha.xkt", "beta.xkt", "gamma.xkt"]
    );
    assert_eq!(result.stats.len(), 3);
    assert!(output_manifest.exists());
    for name in &result.manifest.xkt_files {
        assert!(output_manifest.parent().unwrap().join(name).exists());
    }

    // The written manifest parses back with the same order
    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&output_manifest).unwrap()).unwrap();
    let files: Vec<&str> = written["xktFiles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(files, vec!["alpha.xkt", "beta.xkt", "gamma.xkt"]);
}

#[test]
fn test_batch_fails_fast_on_invalid_manifest() {
    let dir = test_dir("batch-invalid");
    let manifest_path = dir.join("manifest.json");
    // Length mismatch; the listed sources intentionally do not exist, so
    // any attempt to read them would fail loudly
    std::fs::write(
        &manifest_path,
        r#"{"gltfOutFiles": ["a.gltf", "b.gltf"], "metadataOutFiles": ["a.json"]}"#,
    )
    .unwrap();
    let output_manifest = dir.join("model.xkt.manifest.json");

    let result = convert_batch(
        &manifest_path,
        &output_manifest,
        &ConvertOptions::default(),
        &registry(),
    );
    assert!(matches!(result, Err(Error::Input(_))));
    assert!(!output_manifest.exists());
    assert!(!dir.join("a.xkt").exists());
}

#[test]
fn test_batch_aborts_without_output_manifest() {
    let dir = test_dir("batch-abort");
    std::fs::write(dir.join("good.gltf"), boxes_json(1, 1.0)).unwrap();
    std::fs::write(dir.join("bad.gltf"), "not json at all").unwrap();
    let manifest_path = dir.join("manifest.json");
    std::fs::write(
        &manifest_path,
        r#"{"gltfOutFiles": ["good.gltf", "bad.gltf"]}"#,
    )
    .unwrap();
    let output_manifest = dir.join("model.xkt.manifest.json");

    let result = convert_batch(
        &manifest_path,
        &output_manifest,
        &ConvertOptions::default(),
        &registry(),
    );
    assert!(matches!(result, Err(Error::Parse(_))));
    // First entry stays on disk (no rollback), but no manifest is written
    assert!(dir.join("good.xkt").exists());
    assert!(!output_manifest.exists());
}

#[test]
fn test_metamodel_feeds_stats_and_tree() {
    let dir = test_dir("metamodel");
    let source = dir.join("model.gltf");
    std::fs::write(&source, boxes_json(1, 1.0)).unwrap();
    let metamodel = dir.join("model.json");
    std::fs::write(
        &metamodel,
        r#"{
            "id": "Duplex",
            "author": "drafter",
            "schema": "IFC4",
            "metaObjects": [{"id": "root", "type": "IfcProject", "name": "Duplex"}]
        }"#,
    )
    .unwrap();
    let output = dir.join("model.xkt");

    let mut request =
        ConvertRequest::from_path(&source, &output).with_meta_model_source(&metamodel);
    let stats = convert(&mut request, &registry()).unwrap();

    assert_eq!(stats.schema_version, "IFC4");
    assert_eq!(stats.title, "Duplex");
    assert_eq!(stats.author, "drafter");
    // "root" from the metamodel plus one synthesized default
    assert_eq!(stats.num_meta_objects, 2);

    let scene = xkt_lite_codec::read_model(&std::fs::read(&output).unwrap()).unwrap();
    assert!(scene.meta_objects.iter().any(|m| m.id == "root"));
}

#[test]
fn test_dedup_option_changes_storage_not_totals() {
    let run = |reuse: bool| {
        let collected: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_target = collected.clone();
        // Two identical boxes at the same origin: byte-identical buffers
        let source = r#"[
            {"center": [0.0, 0.0, 0.0], "size": 2.0},
            {"center": [0.0, 0.0, 0.0], "size": 2.0}
        ]"#;
        let mut request = ConvertRequest::from_data(
            source.as_bytes().to_vec(),
            SourceFormat::Gltf,
            Box::new(move |bytes| sink_target.lock().unwrap().extend_from_slice(bytes)),
        )
        .with_options(ConvertOptions {
            reuse_geometries: reuse,
            ..Default::default()
        });
        convert(&mut request, &registry()).unwrap()
    };

    let with_reuse = run(true);
    let without_reuse = run(false);

    assert_eq!(with_reuse.num_geometries, 1);
    assert_eq!(without_reuse.num_geometries, 2);
    // Instance totals are identical either way
    assert_eq!(with_reuse.num_triangles, without_reuse.num_triangles);
    assert_eq!(with_reuse.num_vertices, without_reuse.num_vertices);
}

#[test]
fn test_quantization_bound_through_container() {
    let dir = test_dir("quantization");
    let source = dir.join("model.gltf");
    std::fs::write(&source, boxes_json(5, 137.3)).unwrap();
    let output = dir.join("model.xkt");

    let mut request = ConvertRequest::from_path(&source, &output).with_options(ConvertOptions {
        min_tile_size: 200.0,
        ..Default::default()
    });
    convert(&mut request, &registry()).unwrap();

    let scene = xkt_lite_codec::read_model(&std::fs::read(&output).unwrap()).unwrap();
    for tile in &scene.tiles {
        for entity in &tile.entities {
            let index: usize = entity.object_id.parse().unwrap();
            let original = box_positions([index as f64 * 137.3, 0.0, 0.0], 1.0);
            for mesh in &entity.meshes {
                let geometry = &scene.geometries[mesh.geometry as usize];
                let decoded = tile.decode.dequantize_positions(&geometry.positions);
                for (i, (&expected, &actual)) in
                    original.iter().zip(decoded.iter()).enumerate()
                {
                    let step = tile.decode.step[i % 3];
                    assert!(
                        (expected - actual).abs() <= step / 2.0 + 1e-9,
                        "coordinate {i}: |{expected} - {actual}| > {}",
                        step / 2.0
                    );
                }
            }
        }
    }
}
