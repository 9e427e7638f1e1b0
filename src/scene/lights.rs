//! Procedural three-point ("raymond") lighting.
//!
//! Each light is directional: it travels along `direction`. For placement it
//! also gets a position upstream of the scene at `center - direction * radius * DIST_FACTOR`
//! and a look-at pose aimed back at the center. The rig does not move while
//! the subject turns.

use glam::{Mat4, Vec3};

use crate::{
    foundation::{
        error::{TurntableError, TurntableResult},
        math::{EPSILON, look_at},
    },
    scene::bounds::FALLBACK_RADIUS,
};

/// Light distance in multiples of the scene radius.
pub const DIST_FACTOR: f32 = 3.0;

/// User-facing light definition: travel direction (any length > 0) and intensity.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LightSpec {
    pub direction: [f32; 3],
    pub intensity: f32,
}

/// Classic raymond directions `(1,1,1)`, `(-1,1,1)`, `(0,-1,1)` with key, fill and rim intensities.
///
/// Lights are placed at `center - d * radius * DIST_FACTOR`, so this rig sits
/// behind the subject (negative Z) and rakes it from below and the sides.
pub const DEFAULT_RIG: [LightSpec; 3] = [
    LightSpec {
        direction: [1.0, 1.0, 1.0],
        intensity: 2.5,
    },
    LightSpec {
        direction: [-1.0, 1.0, 1.0],
        intensity: 2.0,
    },
    LightSpec {
        direction: [0.0, -1.0, 1.0],
        intensity: 1.8,
    },
];

/// [`DEFAULT_RIG`] with every direction negated: key from upper-front-right,
/// fill from upper-front-left, rim from lower-front. Lights the faces that
/// point toward the default cameras.
pub const FRONT_RIG: [LightSpec; 3] = [
    LightSpec {
        direction: [-1.0, -1.0, -1.0],
        intensity: 2.5,
    },
    LightSpec {
        direction: [1.0, -1.0, -1.0],
        intensity: 2.0,
    },
    LightSpec {
        direction: [0.0, 1.0, -1.0],
        intensity: 1.8,
    },
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightDescriptor {
    /// Unit travel direction.
    pub direction: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    /// Look-at pose from `position` toward the scene center (local -Z is `direction`).
    pub pose: Mat4,
}

impl LightSpec {
    pub fn validate(&self) -> TurntableResult<()> {
        let d = Vec3::from(self.direction);
        if !d.is_finite() || d.length() <= EPSILON {
            return Err(TurntableError::validation(format!(
                "light direction {:?} must be finite and non-zero",
                self.direction
            )));
        }
        if !self.intensity.is_finite() || self.intensity < 0.0 {
            return Err(TurntableError::validation(format!(
                "light intensity {} must be finite and >= 0",
                self.intensity
            )));
        }
        Ok(())
    }
}

/// Place the fixed three-light rig around `center`, sized by `radius`.
pub fn build_raymond_rig(
    center: Vec3,
    radius: f32,
    specs: &[LightSpec; 3],
) -> TurntableResult<[LightDescriptor; 3]> {
    let radius = if radius.is_finite() && radius > EPSILON {
        radius
    } else {
        tracing::debug!(radius, "light rig radius underflow; using fallback");
        FALLBACK_RADIUS
    };

    let mut out = [LightDescriptor {
        direction: Vec3::NEG_Z,
        intensity: 0.0,
        position: center,
        pose: Mat4::IDENTITY,
    }; 3];
    for (slot, spec) in out.iter_mut().zip(specs) {
        spec.validate()?;
        let d = Vec3::from(spec.direction);
        let direction = d / (d.length() + EPSILON);
        let position = center - direction * radius * DIST_FACTOR;
        *slot = LightDescriptor {
            direction,
            intensity: spec.intensity,
            position,
            pose: look_at(position, center, Vec3::Y),
        };
    }
    tracing::debug!(?center, radius, "built light rig");
    Ok(out)
}
