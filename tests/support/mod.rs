#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Fresh scratch directory under `target/`.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Positions of a 2×2 quad in the XY plane, facing +Z, followed by u16 indices.
fn quad_buffer() -> Vec<u8> {
    let positions: [[f32; 3]; 4] = [
        [-1.0, -1.0, 0.0],
        [1.0, -1.0, 0.0],
        [1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0],
    ];
    let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];
    let mut bytes = Vec::with_capacity(60);
    for p in positions {
        for c in p {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
    }
    for i in indices {
        bytes.extend_from_slice(&i.to_le_bytes());
    }
    bytes
}

/// `nodes` and `scenes` JSON fragments around a single quad mesh.
fn write_gltf(dir: &Path, nodes: &str, scenes: &str) -> PathBuf {
    std::fs::write(dir.join("quad.bin"), quad_buffer()).unwrap();
    let json = format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": {scenes},
  "nodes": {nodes},
  "meshes": [{{ "name": "quad", "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}] }}],
  "materials": [{{ "name": "grey", "pbrMetallicRoughness": {{ "baseColorFactor": [0.6, 0.6, 0.6, 1.0] }} }}],
  "buffers": [{{ "uri": "quad.bin", "byteLength": 60 }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 48, "target": 34962 }},
    {{ "buffer": 0, "byteOffset": 48, "byteLength": 12, "target": 34963 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3", "min": [-1.0, -1.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 6, "type": "SCALAR" }}
  ]
}}"#
    );
    let path = dir.join("quad.gltf");
    std::fs::write(&path, json).unwrap();
    path
}

pub fn write_quad_gltf(dir: &Path) -> PathBuf {
    write_gltf(dir, r#"[{ "name": "quad", "mesh": 0 }]"#, r#"[{ "nodes": [0] }]"#)
}

/// Quad under a translated parent, with its own uniform scale.
pub fn write_nested_quad_gltf(dir: &Path) -> PathBuf {
    write_gltf(
        dir,
        r#"[
    { "name": "root", "translation": [10.0, 0.0, 0.0], "children": [1] },
    { "name": "quad", "mesh": 0, "scale": [3.0, 3.0, 3.0] }
  ]"#,
        r#"[{ "nodes": [0] }]"#,
    )
}

/// A valid document whose only node carries no mesh.
pub fn write_meshless_gltf(dir: &Path) -> PathBuf {
    let path = dir.join("empty.gltf");
    std::fs::write(
        &path,
        r#"{ "asset": { "version": "2.0" }, "scene": 0, "scenes": [{ "nodes": [0] }], "nodes": [{ "name": "lonely" }] }"#,
    )
    .unwrap();
    path
}
