use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    sync::Arc,
};

use glam::{Mat4, Vec2, Vec3, Vec4};
use gltf::mesh::Mode;

use crate::{
    assets::{
        decode::texture_from_gltf,
        mesh::{Material, MaterialId, Mesh, TextureImage, Vertex},
    },
    foundation::{
        error::{TurntableError, TurntableResult},
        math::Pose,
    },
};

/// How the loader hands geometry to the rest of the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryMode {
    /// One mesh per glTF primitive instance, node transforms pre-applied.
    #[default]
    Baked,
    /// Everything concatenated into a single mesh with one default material.
    Merged,
}

/// Geometry and materials read from one scene document.
#[derive(Clone, Debug)]
pub struct LoadedAsset {
    pub source: PathBuf,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl LoadedAsset {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Concatenate all meshes, folding each material's base color into vertex color.
    ///
    /// Per-node identity and textures are lost.
    pub fn merged(self) -> Self {
        let mut out = Mesh {
            name: Some("merged".to_string()),
            ..Default::default()
        };
        for mesh in &self.meshes {
            let tint = self
                .materials
                .get(mesh.material.0)
                .map_or(Vec4::ONE, |m| m.base_color);
            let base = out.vertices.len() as u32;
            out.vertices.extend(mesh.vertices.iter().map(|v| Vertex {
                color: v.color * tint,
                ..*v
            }));
            out.indices.extend(mesh.indices.iter().map(|i| base + i));
        }
        Self {
            source: self.source,
            meshes: vec![out],
            materials: vec![Material::default()],
        }
    }
}

/// Load a `.gltf`/`.glb` document plus its referenced buffers and images.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display(), ?mode))]
pub fn load_asset(path: impl AsRef<Path>, mode: GeometryMode) -> TurntableResult<LoadedAsset> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(TurntableError::asset_load(path, "file not found"));
    }
    let (document, buffers, images) = gltf::import(path).map_err(|e| {
        let missing = unresolved_references(path);
        let reason = if missing.is_empty() {
            e.to_string()
        } else {
            let list: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
            format!("{e} (unresolved: {})", list.join(", "))
        };
        TurntableError::asset_load(path, reason)
    })?;
    let asset = bake_document(path, &document, &buffers, &images)?;
    finish(asset, mode)
}

/// External buffer and image files the document names that do not exist next to it.
fn unresolved_references(path: &Path) -> Vec<PathBuf> {
    let Ok(gltf) = gltf::Gltf::open(path) else {
        return Vec::new();
    };
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let buffer_uris = gltf.buffers().filter_map(|b| match b.source() {
        gltf::buffer::Source::Uri(uri) => Some(uri),
        gltf::buffer::Source::Bin => None,
    });
    let image_uris = gltf.images().filter_map(|i| match i.source() {
        gltf::image::Source::Uri { uri, .. } => Some(uri),
        gltf::image::Source::View { .. } => None,
    });
    buffer_uris
        .chain(image_uris)
        .filter(|uri| !uri.starts_with("data:"))
        .map(|uri| base.join(uri))
        .filter(|p| !p.is_file())
        .collect()
}

/// Load a self-contained document (`.glb` or `.gltf` with data URIs) from memory.
pub fn load_asset_from_slice(bytes: &[u8], mode: GeometryMode) -> TurntableResult<LoadedAsset> {
    let path = Path::new("<memory>");
    let (document, buffers, images) =
        gltf::import_slice(bytes).map_err(|e| TurntableError::asset_load(path, e.to_string()))?;
    let asset = bake_document(path, &document, &buffers, &images)?;
    finish(asset, mode)
}

fn finish(asset: LoadedAsset, mode: GeometryMode) -> TurntableResult<LoadedAsset> {
    if asset.meshes.is_empty() {
        return Err(TurntableError::EmptyGeometry {
            path: asset.source,
        });
    }
    tracing::info!(
        meshes = asset.meshes.len(),
        materials = asset.materials.len(),
        vertices = asset.vertex_count(),
        triangles = asset.triangle_count(),
        "loaded asset"
    );
    Ok(match mode {
        GeometryMode::Baked => asset,
        GeometryMode::Merged => asset.merged(),
    })
}

fn bake_document(
    path: &Path,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> TurntableResult<LoadedAsset> {
    let world = world_transforms(document).map_err(|e| TurntableError::asset_load(path, e))?;
    let materials = collect_materials(document, images);
    let default_material = MaterialId(materials.len() - 1);

    let nodes: Vec<gltf::Node<'_>> = document.nodes().collect();

    let mut meshes = Vec::new();
    for &node_index in &world.order {
        let node = &nodes[node_index];
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let pose = Pose::new(world.matrices[node_index]);
        for primitive in mesh.primitives() {
            let material = primitive
                .material()
                .index()
                .map_or(default_material, MaterialId);
            let Some(mut baked) = read_primitive(path, &primitive, buffers, material)? else {
                continue;
            };
            baked.name = mesh.name().or(node.name()).map(str::to_string);
            let has_normals = primitive.get(&gltf::Semantic::Normals).is_some();
            baked.transform_in_place(&pose);
            if !has_normals {
                baked.compute_smooth_normals();
            }
            meshes.push(baked);
        }
    }

    Ok(LoadedAsset {
        source: path.to_path_buf(),
        meshes,
        materials,
    })
}

/// World matrices for every node, plus the parent-before-child order they were computed in.
struct WorldTransforms {
    matrices: Vec<Mat4>,
    order: Vec<usize>,
}

/// Flatten the node tree through an explicit parent table.
///
/// Only nodes reachable from the default scene (or the first scene, or every
/// parentless node when the document declares no scene) are ordered.
fn world_transforms(document: &gltf::Document) -> Result<WorldTransforms, String> {
    let count = document.nodes().len();
    let mut parents: Vec<Option<usize>> = vec![None; count];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut locals = vec![Mat4::IDENTITY; count];

    for node in document.nodes() {
        locals[node.index()] = Mat4::from_cols_array_2d(&node.transform().matrix());
        for child in node.children() {
            let c = child.index();
            if let Some(existing) = parents[c] {
                return Err(format!(
                    "node {c} has two parents ({existing} and {})",
                    node.index()
                ));
            }
            parents[c] = Some(node.index());
            children[node.index()].push(c);
        }
    }

    let roots: Vec<usize> = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => (0..count).filter(|&i| parents[i].is_none()).collect(),
    };

    let mut matrices = vec![Mat4::IDENTITY; count];
    let mut visited = vec![false; count];
    let mut order = Vec::with_capacity(count);
    let mut queue: VecDeque<usize> = roots.into_iter().collect();
    while let Some(i) = queue.pop_front() {
        if visited[i] {
            return Err(format!("node {i} is reachable twice (cycle or shared root)"));
        }
        visited[i] = true;
        matrices[i] = match parents[i] {
            Some(p) if visited[p] => matrices[p] * locals[i],
            _ => locals[i],
        };
        order.push(i);
        queue.extend(children[i].iter().copied());
    }

    Ok(WorldTransforms { matrices, order })
}

/// Document materials in index order, followed by one default material.
fn collect_materials(document: &gltf::Document, images: &[gltf::image::Data]) -> Vec<Material> {
    let mut decoded: HashMap<usize, Option<Arc<TextureImage>>> = HashMap::new();
    let mut materials: Vec<Material> = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let base_color_texture = pbr.base_color_texture().and_then(|info| {
                let image_index = info.texture().source().index();
                decoded
                    .entry(image_index)
                    .or_insert_with(|| {
                        images
                            .get(image_index)
                            .and_then(texture_from_gltf)
                            .map(Arc::new)
                    })
                    .clone()
            });
            Material {
                name: material.name().map(str::to_string),
                base_color: Vec4::from(pbr.base_color_factor()),
                base_color_texture,
                metallic: pbr.metallic_factor(),
                roughness: pbr.roughness_factor(),
                double_sided: material.double_sided(),
            }
        })
        .collect();
    materials.push(Material::default());
    materials
}

fn read_primitive(
    path: &Path,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    material: MaterialId,
) -> TurntableResult<Option<Mesh>> {
    let mode = primitive.mode();
    if !matches!(
        mode,
        Mode::Triangles | Mode::TriangleStrip | Mode::TriangleFan
    ) {
        tracing::debug!(?mode, "skipping non-triangle primitive");
        return Ok(None);
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
    let Some(positions) = reader.read_positions() else {
        tracing::warn!(primitive = primitive.index(), "primitive has no POSITION; skipping");
        return Ok(None);
    };
    let mut vertices: Vec<Vertex> = positions
        .map(|p| Vertex {
            position: Vec3::from(p),
            ..Default::default()
        })
        .collect();

    if let Some(normals) = reader.read_normals() {
        for (v, n) in vertices.iter_mut().zip(normals) {
            v.normal = Vec3::from(n);
        }
    }
    if let Some(uvs) = reader.read_tex_coords(0) {
        for (v, uv) in vertices.iter_mut().zip(uvs.into_f32()) {
            v.uv = Vec2::from(uv);
        }
    }
    if let Some(colors) = reader.read_colors(0) {
        for (v, c) in vertices.iter_mut().zip(colors.into_rgba_f32()) {
            v.color = Vec4::from(c);
        }
    }

    let raw: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if let Some(bad) = raw.iter().find(|&&i| i as usize >= vertices.len()) {
        return Err(TurntableError::asset_load(
            path,
            format!(
                "primitive {} index {bad} exceeds vertex count {}",
                primitive.index(),
                vertices.len()
            ),
        ));
    }
    let indices = triangulate(mode, &raw);
    if indices.is_empty() {
        return Ok(None);
    }

    Ok(Some(Mesh {
        name: None,
        vertices,
        indices,
        material,
    }))
}

/// Expand strips and fans into a plain triangle list.
fn triangulate(mode: Mode, raw: &[u32]) -> Vec<u32> {
    match mode {
        Mode::TriangleStrip => (0..raw.len().saturating_sub(2))
            .flat_map(|i| {
                if i % 2 == 0 {
                    [raw[i], raw[i + 1], raw[i + 2]]
                } else {
                    [raw[i + 1], raw[i], raw[i + 2]]
                }
            })
            .collect(),
        Mode::TriangleFan => (1..raw.len().saturating_sub(1))
            .flat_map(|i| [raw[0], raw[i], raw[i + 1]])
            .collect(),
        _ => raw[..raw.len() - raw.len() % 3].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_alternate_winding() {
        assert_eq!(
            triangulate(Mode::TriangleStrip, &[0, 1, 2, 3]),
            vec![0, 1, 2, 2, 1, 3]
        );
    }

    #[test]
    fn fans_share_first_vertex() {
        assert_eq!(
            triangulate(Mode::TriangleFan, &[0, 1, 2, 3]),
            vec![0, 1, 2, 0, 2, 3]
        );
    }

    #[test]
    fn lists_drop_trailing_partial_triangle() {
        assert_eq!(triangulate(Mode::Triangles, &[0, 1, 2, 3]), vec![0, 1, 2]);
        assert!(triangulate(Mode::TriangleStrip, &[0, 1]).is_empty());
    }

    #[test]
    fn merged_folds_material_color_into_vertices() {
        let red = Material {
            base_color: Vec4::new(1.0, 0.0, 0.0, 1.0),
            ..Default::default()
        };
        let mesh = |m| Mesh {
            name: None,
            vertices: vec![Vertex::default(); 3],
            indices: vec![0, 1, 2],
            material: MaterialId(m),
        };
        let asset = LoadedAsset {
            source: PathBuf::from("x.gltf"),
            meshes: vec![mesh(0), mesh(1)],
            materials: vec![red, Material::default()],
        };
        let merged = asset.merged();
        assert_eq!(merged.meshes.len(), 1);
        assert_eq!(merged.materials.len(), 1);
        let m = &merged.meshes[0];
        assert_eq!(m.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(m.vertices[0].color, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(m.vertices[3].color, Vec4::ONE);
    }

    #[test]
    fn missing_file_is_an_asset_load_error() {
        let err = load_asset("target/definitely/missing.gltf", GeometryMode::Baked).unwrap_err();
        assert!(matches!(err, TurntableError::AssetLoad { .. }));
        assert!(err.to_string().contains("missing.gltf"));
    }
}
