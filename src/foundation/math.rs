use glam::{Mat3, Mat4, Vec3};

/// Length below which a direction is treated as degenerate.
pub const EPSILON: f32 = 1e-9;

/// Principal rotation axis, as named in configuration files and on the CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vec3 {
        match self {
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::Z,
        }
    }

    /// Right-handed rotation of `degrees` about this axis through the origin.
    pub fn rotation(self, degrees: f32) -> Mat4 {
        let rad = degrees.to_radians();
        match self {
            Self::X => Mat4::from_rotation_x(rad),
            Self::Y => Mat4::from_rotation_y(rad),
            Self::Z => Mat4::from_rotation_z(rad),
        }
    }
}

/// Camera/light pose looking from `eye` toward `target`.
///
/// Forward is `z = normalize(target - eye)`, right is `x = normalize(z × up)`, and
/// the recomputed up is `y = x × z`. The returned matrix has columns
/// `[x, y, -z, eye]`, i.e. the pose looks down its local -Z axis.
///
/// Never yields NaN: a zero-length `target - eye` looks down -Z, and an `up`
/// hint that is collinear with the forward axis (or not finite) is swapped for
/// the world axis least aligned with it.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let to_target = target - eye;
    let z = if to_target.length() > EPSILON {
        to_target / (to_target.length() + EPSILON)
    } else {
        tracing::warn!(?eye, ?target, "look_at: eye coincides with target");
        Vec3::NEG_Z
    };

    let mut x = z.cross(up);
    if !x.is_finite() || x.length() < 1e-6 {
        let fallback = least_aligned_axis(z);
        tracing::debug!(?up, ?fallback, "look_at: up hint collinear with forward or not finite");
        x = z.cross(fallback);
    }
    let x = x / (x.length() + EPSILON);
    let y = x.cross(z);
    let y = y / (y.length() + EPSILON);

    Mat4::from_cols(
        x.extend(0.0),
        y.extend(0.0),
        (-z).extend(0.0),
        eye.extend(1.0),
    )
}

fn least_aligned_axis(v: Vec3) -> Vec3 {
    let a = v.abs();
    if a.x <= a.y && a.x <= a.z {
        Vec3::X
    } else if a.y <= a.z {
        Vec3::Y
    } else {
        Vec3::Z
    }
}

/// A model transform together with the matrix used to carry normals through it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub matrix: Mat4,
    pub normal_matrix: Mat3,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        matrix: Mat4::IDENTITY,
        normal_matrix: Mat3::IDENTITY,
    };

    pub fn new(matrix: Mat4) -> Self {
        let linear = Mat3::from_mat4(matrix);
        let normal_matrix = if linear.determinant().abs() > EPSILON {
            linear.inverse().transpose()
        } else {
            linear
        };
        Self {
            matrix,
            normal_matrix,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == Mat4::IDENTITY
    }

    pub fn point(&self, p: Vec3) -> Vec3 {
        self.matrix.transform_point3(p)
    }

    pub fn normal(&self, n: Vec3) -> Vec3 {
        (self.normal_matrix * n).normalize_or_zero()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}
