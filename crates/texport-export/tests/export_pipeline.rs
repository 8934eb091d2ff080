//! End-to-end export tests
//!
//! Builds a PK3 in memory, mounts it, runs the material rewriter over JSON
//! documents and checks both the written files and the rewritten documents.

use std::sync::Arc;

use texport_core::{MaterialData, ShaderTable};
use texport_export::{export_textures, JsonExporter};
use texport_parsers::{CompressionMethod, Pk3Writer};
use texport_vfs::{Package, Pk3Mount, VfsTree};

const SHADERS: &str = r#"{
    "textures/base_wall/metal": {
        "stages": [
            { "map": "$lightmap", "rgbGen": "identity" },
            { "map": "textures/base_wall/metal.tga", "blendFunc": "filter" }
        ],
        "surfaceparm": ["metalsteps"]
    },
    "textures/sfx/flame": {
        "stages": [
            { "map": "anim", "animMaps": ["textures/sfx/flame1", "textures/sfx/flame2", "textures/sfx/flame3"] }
        ]
    }
}"#;

const MATERIALS: &str = r#"{
    "materials": [
        { "shaderName": "textures/base_wall/metal", "flags": 1 },
        { "shaderName": "textures/sfx/flame" },
        { "shaderName": "textures/base_floor/tiles" },
        { "shaderName": "textures/base_floor/missing" }
    ],
    "name": "q3dm1"
}"#;

/// 2x2, 32-bit, bottom row stored first
fn metal_tga() -> Vec<u8> {
    let mut data = vec![0u8; 18];
    data[2] = 2;
    data[12..14].copy_from_slice(&2u16.to_le_bytes());
    data[14..16].copy_from_slice(&2u16.to_le_bytes());
    data[16] = 32;
    data.extend_from_slice(&[
        255, 0, 0, 255, 255, 0, 0, 255, // bottom row: blue
        0, 0, 255, 128, 0, 0, 255, 128, // top row: red, half alpha
    ]);
    data
}

fn jpeg(tag: u8) -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, tag, 0xFF, 0xD9]
}

fn package() -> Pk3Mount {
    let mut writer = Pk3Writer::new();
    writer
        .add_file("textures/base_wall/metal.tga", &metal_tga(), CompressionMethod::Deflate)
        .unwrap()
        .add_file("textures/sfx/flame1.jpg", &jpeg(1), CompressionMethod::Store)
        .unwrap()
        .add_file("textures/sfx/flame2.jpg", &jpeg(2), CompressionMethod::Store)
        .unwrap()
        .add_file("textures/sfx/flame3.jpg", &jpeg(3), CompressionMethod::Store)
        .unwrap()
        .add_file("textures/base_floor/tiles.jpg", &jpeg(4), CompressionMethod::Deflate)
        .unwrap();
    Pk3Mount::from_bytes("pak0.pk3", writer.finish().unwrap()).unwrap()
}

#[test]
fn test_full_export() {
    let out = tempfile::tempdir().unwrap();
    let package = package();
    let mut shaders = ShaderTable::from_json_str(SHADERS).unwrap();
    let mut materials = MaterialData::from_json_str(MATERIALS).unwrap();

    let summary = export_textures(out.path(), &mut shaders, &mut materials, "maps/q3dm1/lm_0000.png", &package);

    assert_eq!(summary.exported, 1);
    assert_eq!(summary.passthrough, 4);
    assert_eq!(summary.lightmaps, 1);
    assert_eq!(summary.failed, 1);

    let metal = &shaders.get("textures/base_wall/metal").unwrap().stages;
    assert_eq!(metal[0].map.as_deref(), Some("maps/q3dm1/lm_0000.png"));
    assert_eq!(metal[1].map.as_deref(), Some("textures/base_wall/metal.png"));

    let flame = &shaders.get("textures/sfx/flame").unwrap().stages[0];
    let frames: Vec<_> = flame.anim_maps.iter().map(|f| f.as_deref()).collect();
    assert_eq!(
        frames,
        vec![
            Some("textures/sfx/flame1.jpg"),
            Some("textures/sfx/flame2.jpg"),
            Some("textures/sfx/flame3.jpg"),
        ]
    );

    assert_eq!(materials.materials[2].shader_name.as_deref(), Some("textures/base_floor/tiles.jpg"));
    assert_eq!(materials.materials[3].shader_name, None);

    // Decoded pixels: top row red at half alpha, bottom row opaque blue
    let png = image::open(out.path().join("textures/base_wall/metal.png")).unwrap().to_rgba8();
    assert_eq!(png.get_pixel(0, 0).0, [255, 0, 0, 128]);
    assert_eq!(png.get_pixel(1, 1).0, [0, 0, 255, 255]);

    // JPGs are copied untouched
    assert_eq!(std::fs::read(out.path().join("textures/sfx/flame2.jpg")).unwrap(), jpeg(2));
}

#[test]
fn test_rewritten_documents_keep_unknown_fields() {
    let out = tempfile::tempdir().unwrap();
    let package = package();
    let mut shaders = ShaderTable::from_json_str(SHADERS).unwrap();
    let mut materials = MaterialData::from_json_str(MATERIALS).unwrap();
    export_textures(out.path(), &mut shaders, &mut materials, "lm.png", &package);

    let json = JsonExporter::new();
    json.export_materials(&materials, out.path().join("materials.json")).unwrap();
    json.export_shaders(&shaders, out.path().join("shaders.json")).unwrap();

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.path().join("materials.json")).unwrap()).unwrap();
    assert_eq!(written["name"], "q3dm1");
    assert_eq!(written["materials"][0]["flags"], 1);
    assert!(written["materials"][3]["shaderName"].is_null());

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.path().join("shaders.json")).unwrap()).unwrap();
    let metal = &written["textures/base_wall/metal"];
    assert_eq!(metal["surfaceparm"][0], "metalsteps");
    assert_eq!(metal["stages"][0]["rgbGen"], "identity");
    assert_eq!(metal["stages"][1]["blendFunc"], "filter");
}

#[test]
fn test_second_run_reuses_output() {
    let out = tempfile::tempdir().unwrap();
    let package = package();

    let mut shaders = ShaderTable::from_json_str(SHADERS).unwrap();
    let mut materials = MaterialData::from_json_str(MATERIALS).unwrap();
    export_textures(out.path(), &mut shaders, &mut materials, "lm.png", &package);
    let first_shaders = shaders.clone();

    let mut shaders = ShaderTable::from_json_str(SHADERS).unwrap();
    let mut materials = MaterialData::from_json_str(MATERIALS).unwrap();
    let summary = export_textures(out.path(), &mut shaders, &mut materials, "lm.png", &package);

    assert_eq!(shaders, first_shaders);
    assert_eq!(summary.exported + summary.passthrough, 0);
    assert_eq!(summary.cached, 5);
}

#[test]
fn test_overlay_override() {
    let out = tempfile::tempdir().unwrap();

    let mut writer = Pk3Writer::new();
    writer
        .add_file("textures/sfx/flame1.jpg", &jpeg(9), CompressionMethod::Store)
        .unwrap();
    let patch = Pk3Mount::from_bytes("pak1.pk3", writer.finish().unwrap()).unwrap();

    let vfs = VfsTree::new();
    vfs.add_mount(Arc::new(package()));
    vfs.add_mount(Arc::new(patch));
    assert_eq!(vfs.file_count(), 5);

    let mut shaders = ShaderTable::from_json_str(SHADERS).unwrap();
    let mut materials = MaterialData::from_json_str(MATERIALS).unwrap();
    export_textures(out.path(), &mut shaders, &mut materials, "lm.png", &vfs);

    assert_eq!(std::fs::read(out.path().join("textures/sfx/flame1.jpg")).unwrap(), jpeg(9));
    assert_eq!(std::fs::read(out.path().join("textures/sfx/flame3.jpg")).unwrap(), jpeg(3));
}

#[test]
fn test_package_entry_cannot_escape_output_root() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");

    let mut writer = Pk3Writer::new();
    writer
        .add_file("evil.jpg", b"PWNED", CompressionMethod::Store)
        .unwrap()
        .add_file("textures/wall/../../../evil.jpg", b"PWNED", CompressionMethod::Store)
        .unwrap();
    let package = Pk3Mount::from_bytes("evil.pk3", writer.finish().unwrap()).unwrap();

    let mut shaders = ShaderTable::new();
    let mut materials = MaterialData::from_json_str(r#"{ "materials": [{ "shaderName": "textures/wall" }] }"#).unwrap();
    let summary = export_textures(&out, &mut shaders, &mut materials, "lm.png", &package);

    assert_eq!(materials.materials[0].shader_name, None);
    assert_eq!(summary.failed, 1);
    assert!(!tmp.path().join("evil.jpg").exists());
}
