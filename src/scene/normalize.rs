use glam::{Mat4, Vec3};

use crate::{
    assets::mesh::Mesh,
    foundation::math::{Axis, Pose},
    scene::bounds::{SceneBounds, compute_bounds},
};

/// Fixed rotation applied after centering/scaling to fix up-axis mismatches.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrientationCorrection {
    pub axis: Axis,
    pub degrees: f32,
}

/// `scale(1 / max_extent) * translate(-centroid)`.
///
/// A zero max extent keeps the scale at 1.
pub fn normalization_transform(bounds: &SceneBounds) -> Mat4 {
    let m = bounds.max_extent();
    let scale = if m > 0.0 && m.is_finite() { 1.0 / m } else { 1.0 };
    Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_translation(-bounds.centroid())
}

/// Compose a fixed-axis rotation on top of an existing normalization.
pub fn apply_orientation_correction(transform: Mat4, axis: Axis, degrees: f32) -> Mat4 {
    axis.rotation(degrees) * transform
}

/// Result of normalizing a mesh set in place.
#[derive(Clone, Copy, Debug)]
pub struct Normalization {
    /// Bounds of the geometry as loaded.
    pub source_bounds: SceneBounds,
    /// The transform baked into every vertex.
    pub transform: Mat4,
    /// Bounds recomputed after the transform; lights and camera are placed from these.
    pub bounds: SceneBounds,
}

/// Center, scale and optionally re-orient `meshes`, exactly once.
///
/// Returns `None` when the meshes hold no vertices.
pub fn normalize_meshes(
    meshes: &mut [Mesh],
    correction: Option<OrientationCorrection>,
) -> Option<Normalization> {
    let source_bounds = compute_bounds(meshes)?;
    let mut transform = normalization_transform(&source_bounds);
    if let Some(c) = correction {
        transform = apply_orientation_correction(transform, c.axis, c.degrees);
    }

    let pose = Pose::new(transform);
    for mesh in meshes.iter_mut() {
        mesh.transform_in_place(&pose);
    }
    let bounds = compute_bounds(meshes)?;

    tracing::info!(
        source_min = ?source_bounds.min,
        source_max = ?source_bounds.max,
        min = ?bounds.min,
        max = ?bounds.max,
        radius = bounds.radius(),
        "normalized scene"
    );

    Some(Normalization {
        source_bounds,
        transform,
        bounds,
    })
}
