use std::f32::consts::PI;

use glam::{Vec2, Vec3, Vec4};

use crate::{
    assets::mesh::Material,
    foundation::error::{TurntableError, TurntableResult},
    render::{FrameTarget, RasterBackend},
    scene::model::Scene,
};

/// Deterministic z-buffer rasterizer.
///
/// Triangles are two-sided: the shading normal is flipped toward the viewer.
/// Triangles with any vertex in front of the near plane are dropped rather than clipped.
pub struct CpuBackend {
    projected: Vec<ProjectedVertex>,
}

#[derive(Clone, Copy, Debug)]
struct ProjectedVertex {
    screen: Vec2,
    inv_z: f32,
    world: Vec3,
    normal: Vec3,
    uv: Vec2,
    color: Vec4,
    visible: bool,
}

struct ShadeCtx<'a> {
    eye: Vec3,
    ambient: Vec3,
    /// (direction toward the light, intensity / pi)
    lights: [(Vec3, f32); 3],
    material: &'a Material,
    smooth: bool,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            projected: Vec::new(),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn render(&mut self, scene: &Scene, target: &mut FrameTarget) -> TurntableResult<()> {
        if target.width == 0 || target.height == 0 {
            return Err(TurntableError::render_context("render target has zero size"));
        }
        target.clear(scene.background);

        let cam = &scene.camera;
        let view = cam.view();
        if !view.is_finite() {
            return Err(TurntableError::render_context("camera pose is not invertible"));
        }
        let (w, h) = (target.width as f32, target.height as f32);
        let focal = 1.0 / (cam.yfov * 0.5).tan();
        let aspect = w / h;

        let lights = scene
            .lights
            .map(|l| (-l.direction, l.intensity / PI));

        for node in scene.views() {
            self.projected.clear();
            self.projected.extend(node.mesh.vertices.iter().map(|v| {
                let (world, normal) = if node.pose.is_identity() {
                    (v.position, v.normal)
                } else {
                    (node.pose.point(v.position), node.pose.normal(v.normal))
                };
                let p = view.transform_point3(world);
                let z = -p.z;
                let visible = z > cam.znear && p.is_finite();
                let ndc = Vec2::new(focal / aspect * p.x / z, focal * p.y / z);
                ProjectedVertex {
                    screen: Vec2::new((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h),
                    inv_z: 1.0 / z,
                    world,
                    normal,
                    uv: v.uv,
                    color: v.color,
                    visible,
                }
            }));

            let ctx = ShadeCtx {
                eye: cam.eye,
                ambient: scene.ambient,
                lights,
                material: node.material,
                smooth: scene.smooth,
            };
            for tri in node.mesh.indices.chunks_exact(3) {
                let (Some(a), Some(b), Some(c)) = (
                    self.projected.get(tri[0] as usize),
                    self.projected.get(tri[1] as usize),
                    self.projected.get(tri[2] as usize),
                ) else {
                    continue;
                };
                if a.visible && b.visible && c.visible {
                    rasterize(target, &ctx, a, b, c);
                }
            }
        }

        for d in &mut target.depth {
            if !d.is_finite() {
                *d = 0.0;
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        self.projected = Vec::new();
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn rasterize(
    target: &mut FrameTarget,
    ctx: &ShadeCtx<'_>,
    a: &ProjectedVertex,
    b: &ProjectedVertex,
    c: &ProjectedVertex,
) {
    let area = edge(a.screen, b.screen, c.screen);
    if area.abs() < 1e-12 || !area.is_finite() {
        return;
    }

    let lo = a.screen.min(b.screen).min(c.screen).floor().max(Vec2::ZERO);
    let hi = a
        .screen
        .max(b.screen)
        .max(c.screen)
        .ceil()
        .min(Vec2::new(target.width as f32 - 1.0, target.height as f32 - 1.0));
    if lo.x > hi.x || lo.y > hi.y {
        return;
    }

    let face_normal = (b.world - a.world)
        .cross(c.world - a.world)
        .normalize_or_zero();

    for py in lo.y as u32..=hi.y as u32 {
        for px in lo.x as u32..=hi.x as u32 {
            let s = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
            let w0 = edge(b.screen, c.screen, s) / area;
            let w1 = edge(c.screen, a.screen, s) / area;
            let w2 = edge(a.screen, b.screen, s) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let inv_z = w0 * a.inv_z + w1 * b.inv_z + w2 * c.inv_z;
            let depth = 1.0 / inv_z;
            let idx = (py * target.width + px) as usize;
            if !(depth < target.depth[idx]) {
                continue;
            }

            // Perspective-correct weights.
            let p0 = w0 * a.inv_z * depth;
            let p1 = w1 * b.inv_z * depth;
            let p2 = w2 * c.inv_z * depth;

            let world = a.world * p0 + b.world * p1 + c.world * p2;
            let normal = if ctx.smooth {
                let n = (a.normal * p0 + b.normal * p1 + c.normal * p2).normalize_or_zero();
                if n == Vec3::ZERO { face_normal } else { n }
            } else {
                face_normal
            };
            let uv = a.uv * p0 + b.uv * p1 + c.uv * p2;
            let color = a.color * p0 + b.color * p1 + c.color * p2;

            let rgb = shade(ctx, world, normal, uv, color);
            target.color[idx * 3..idx * 3 + 3].copy_from_slice(&rgb);
            target.depth[idx] = depth;
        }
    }
}

fn shade(ctx: &ShadeCtx<'_>, world: Vec3, normal: Vec3, uv: Vec2, color: Vec4) -> [u8; 3] {
    let mut n = normal;
    if n.dot(ctx.eye - world) < 0.0 {
        n = -n;
    }
    let radiance = ctx.lights.iter().fold(ctx.ambient, |acc, (to_light, scale)| {
        acc + Vec3::splat(scale * n.dot(*to_light).max(0.0))
    });
    let lit = ctx.material.albedo(uv, color).truncate() * radiance;
    // Exponential exposure: [0, inf) -> [0, 1).
    let to_u8 = |v: f32| ((1.0 - (-v).exp()).clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
    [to_u8(lit.x), to_u8(lit.y), to_u8(lit.z)]
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{
        assets::{
            loader::LoadedAsset,
            mesh::{MaterialId, Mesh, Vertex},
        },
        scene::{
            camera::place_front_camera,
            lights::{DEFAULT_RIG, build_raymond_rig},
        },
    };

    fn square_scene(z: f32) -> Scene {
        let v = |x: f32, y: f32| Vertex {
            position: Vec3::new(x, y, z),
            normal: Vec3::Z,
            ..Default::default()
        };
        let mesh = Mesh {
            name: None,
            vertices: vec![v(-0.5, -0.5), v(0.5, -0.5), v(0.5, 0.5), v(-0.5, 0.5)],
            indices: vec![0, 1, 2, 0, 2, 3],
            material: MaterialId(0),
        };
        Scene::new(
            LoadedAsset {
                source: PathBuf::from("square.gltf"),
                meshes: vec![mesh],
                materials: vec![Material::default()],
            },
            build_raymond_rig(Vec3::ZERO, 1.0, &DEFAULT_RIG).unwrap(),
            place_front_camera(Vec3::ZERO, 2.2, 45.0, 0.05).unwrap(),
        )
    }

    fn render(scene: &Scene) -> FrameTarget {
        let mut target = FrameTarget::new(64, 48);
        CpuBackend::new().render(scene, &mut target).unwrap();
        target
    }

    #[test]
    fn square_covers_center_and_leaves_corners_clear() {
        let t = render(&square_scene(0.0));
        let center = ((24 * 64 + 32) * 3) as usize;
        assert_ne!(&t.color[center..center + 3], &[255, 255, 255]);
        assert_eq!(&t.color[..3], &[255, 255, 255]);
        assert!((t.depth[24 * 64 + 32] - 2.2).abs() < 1e-3);
        assert_eq!(t.depth[0], 0.0);
    }

    #[test]
    fn nearer_surface_wins_depth_test() {
        let near = square_scene(0.5);
        let t = render(&near);
        assert!((t.depth[24 * 64 + 32] - 1.7).abs() < 1e-3);
    }

    #[test]
    fn flat_and_smooth_agree_on_planar_geometry() {
        let smooth = square_scene(0.0);
        let mut flat = smooth.clone();
        flat.smooth = false;
        let (a, b) = (render(&smooth).color, render(&flat).color);
        assert!(a.iter().zip(&b).all(|(x, y)| x.abs_diff(*y) <= 1));
    }

    #[test]
    fn geometry_behind_camera_is_skipped() {
        let t = render(&square_scene(5.0));
        assert!(t.color.iter().all(|&c| c == 255));
    }
}
