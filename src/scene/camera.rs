use glam::{Mat4, Vec3};

use crate::foundation::{
    error::{TurntableError, TurntableResult},
    math::{EPSILON, look_at},
};

/// Where the camera sits relative to the normalized scene.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPlacement {
    /// Oblique vantage at `center + radius * offset`.
    Orbit { offset: [f32; 3] },
    /// Straight-on view from `+Z` at a fixed distance (normalized units).
    Front { distance: f32 },
}

impl Default for CameraPlacement {
    fn default() -> Self {
        Self::Orbit {
            offset: [1.5, 0.8, 2.5],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraDescriptor {
    /// Vertical field of view, radians.
    pub yfov: f32,
    pub znear: f32,
    pub eye: Vec3,
    pub target: Vec3,
    /// Camera-to-world; the camera looks down its local -Z.
    pub pose: Mat4,
}

impl CameraDescriptor {
    pub fn view(&self) -> Mat4 {
        self.pose.inverse()
    }
}

/// Oblique camera at `center + radius * offset` aimed at `center`.
///
/// The offset must be tuned so the bounding sphere fits the frustum at `yfov_deg`.
pub fn place_orbit_camera(
    center: Vec3,
    radius: f32,
    offset: [f32; 3],
    yfov_deg: f32,
    znear: f32,
) -> TurntableResult<CameraDescriptor> {
    let offset = Vec3::from(offset);
    if !offset.is_finite() || offset.length() <= EPSILON {
        return Err(TurntableError::validation(
            "orbit camera offset must be finite and non-zero",
        ));
    }
    let eye = center + offset * radius;
    Ok(camera(eye, center, yfov_deg, znear))
}

/// Front-on camera on the +Z axis through `center`.
pub fn place_front_camera(
    center: Vec3,
    distance: f32,
    yfov_deg: f32,
    znear: f32,
) -> TurntableResult<CameraDescriptor> {
    if !distance.is_finite() || distance <= znear {
        return Err(TurntableError::validation(format!(
            "front camera distance {distance} must exceed znear {znear}"
        )));
    }
    Ok(camera(center + Vec3::Z * distance, center, yfov_deg, znear))
}

pub fn place_camera(
    placement: CameraPlacement,
    center: Vec3,
    radius: f32,
    yfov_deg: f32,
    znear: f32,
) -> TurntableResult<CameraDescriptor> {
    let cam = match placement {
        CameraPlacement::Orbit { offset } => {
            place_orbit_camera(center, radius, offset, yfov_deg, znear)?
        }
        CameraPlacement::Front { distance } => {
            place_front_camera(center, distance, yfov_deg, znear)?
        }
    };
    tracing::debug!(eye = ?cam.eye, target = ?cam.target, yfov_deg, "placed camera");
    Ok(cam)
}

fn camera(eye: Vec3, target: Vec3, yfov_deg: f32, znear: f32) -> CameraDescriptor {
    CameraDescriptor {
        yfov: yfov_deg.to_radians(),
        znear,
        eye,
        target,
        pose: look_at(eye, target, Vec3::Y),
    }
}
