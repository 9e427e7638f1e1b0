use glam::Vec3;

use crate::assets::mesh::Mesh;

/// Radius used when the true bounding diagonal is numerically zero.
pub const FALLBACK_RADIUS: f32 = 1.0;

const DEGENERATE_RADIUS: f32 = 1e-9;

/// Axis-aligned bounds over every vertex of a mesh set.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct SceneBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl SceneBounds {
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn max_extent(&self) -> f32 {
        self.extents().max_element()
    }

    /// Length of the bounding diagonal, or [`FALLBACK_RADIUS`] for degenerate geometry.
    pub fn radius(&self) -> f32 {
        let r = self.extents().length();
        if r.is_finite() && r >= DEGENERATE_RADIUS {
            r
        } else {
            FALLBACK_RADIUS
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Bounds over all vertices; `None` when there are no vertices at all.
pub fn compute_bounds(meshes: &[Mesh]) -> Option<SceneBounds> {
    let mut positions = meshes
        .iter()
        .flat_map(|m| m.vertices.iter().map(|v| v.position));
    let first = positions.next()?;
    let (min, max) = positions.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
    Some(SceneBounds { min, max })
}
