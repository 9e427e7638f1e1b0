use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};

use crate::foundation::math::Pose;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    /// Linear RGBA; white when the source has no vertex colors.
    pub color: Vec4,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            uv: Vec2::ZERO,
            color: Vec4::ONE,
        }
    }
}

impl Vertex {
    pub fn posed(&self, pose: &Pose) -> Self {
        Self {
            position: pose.point(self.position),
            normal: pose.normal(self.normal),
            ..*self
        }
    }
}

/// Index into [`LoadedAsset::materials`](crate::LoadedAsset::materials).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// Baked triangle-list geometry. Positions are in world (or normalized) space.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub vertices: Vec<Vertex>,
    /// Triangle list; `indices.len()` is a multiple of 3.
    pub indices: Vec<u32>,
    pub material: MaterialId,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Copy of this mesh with `pose` applied to every vertex.
    pub fn posed(&self, pose: &Pose) -> Self {
        Self {
            name: self.name.clone(),
            vertices: self.vertices.iter().map(|v| v.posed(pose)).collect(),
            indices: self.indices.clone(),
            material: self.material,
        }
    }

    pub fn transform_in_place(&mut self, pose: &Pose) {
        for v in &mut self.vertices {
            *v = v.posed(pose);
        }
    }

    /// Replace every normal with the area-weighted average of its adjacent faces.
    pub fn compute_smooth_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = Vec3::ZERO;
        }
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(pa), Some(pb), Some(pc)) = (
                self.vertices.get(a).map(|v| v.position),
                self.vertices.get(b).map(|v| v.position),
                self.vertices.get(c).map(|v| v.position),
            ) else {
                continue;
            };
            let n = (pb - pa).cross(pc - pa);
            for i in [a, b, c] {
                self.vertices[i].normal += n;
            }
        }
        for v in &mut self.vertices {
            v.normal = v.normal.normalize_or_zero();
        }
    }
}

/// Decoded texture, straight-alpha RGBA8, row-major, tightly packed.
#[derive(Clone, Debug)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl TextureImage {
    /// Nearest-neighbour lookup with repeat wrapping, returned as linear `0..=1` floats.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return Vec4::ONE;
        }
        let u = uv.x - uv.x.floor();
        let v = uv.y - uv.y.floor();
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        let i = ((y * self.width + x) * 4) as usize;
        let px = &self.rgba8[i..i + 4];
        Vec4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32) / 255.0
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    pub name: Option<String>,
    pub base_color: Vec4,
    pub base_color_texture: Option<Arc<TextureImage>>,
    pub metallic: f32,
    pub roughness: f32,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color: Vec4::ONE,
            base_color_texture: None,
            metallic: 1.0,
            roughness: 1.0,
            double_sided: false,
        }
    }
}

impl Material {
    pub fn albedo(&self, uv: Vec2, vertex_color: Vec4) -> Vec4 {
        let tex = self
            .base_color_texture
            .as_ref()
            .map_or(Vec4::ONE, |t| t.sample(uv));
        self.base_color * tex * vertex_color
    }
}
