use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    assets::loader::GeometryMode,
    foundation::{
        error::{TurntableError, TurntableResult},
        math::Axis,
    },
    render::{BackendKind, MAX_DIMENSION},
    scene::{
        camera::CameraPlacement,
        lights::{DEFAULT_RIG, LightSpec},
        model::PoseStrategy,
        normalize::OrientationCorrection,
    },
    sequence::{AngleSweep, EndpointMode},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub yfov_deg: f32,
    pub placement: CameraPlacement,
    pub znear: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            yfov_deg: 45.0,
            placement: CameraPlacement::default(),
            znear: 0.05,
        }
    }
}

/// Every recognized option, loadable from JSON with any subset of fields present.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TurntableConfig {
    pub width: u32,
    pub height: u32,
    pub out_dir: PathBuf,
    pub frame_count: usize,
    pub start_deg: f32,
    pub end_deg: f32,
    pub axis: Axis,
    pub endpoint: EndpointMode,
    /// Minimum zero-padded digits in `frame_NNNN.png`.
    pub index_width: usize,
    pub correction: Option<OrientationCorrection>,
    pub geometry: GeometryMode,
    pub pose_strategy: PoseStrategy,
    pub camera: CameraConfig,
    pub lights: [LightSpec; 3],
    pub ambient: [f32; 3],
    pub background: [u8; 3],
    pub smooth: bool,
    pub write_depth: bool,
    pub backend: BackendKind,
    /// Render on this many worker threads, each with its own context. `None` renders inline.
    pub threads: Option<usize>,
}

impl Default for TurntableConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            out_dir: PathBuf::from("frames"),
            frame_count: 120,
            start_deg: 0.0,
            end_deg: 360.0,
            axis: Axis::Y,
            endpoint: EndpointMode::Exclusive,
            index_width: 4,
            correction: None,
            geometry: GeometryMode::Baked,
            pose_strategy: PoseStrategy::Node,
            camera: CameraConfig::default(),
            lights: DEFAULT_RIG,
            ambient: [0.4; 3],
            background: [255; 3],
            smooth: true,
            write_depth: false,
            backend: BackendKind::Cpu,
            threads: None,
        }
    }
}

impl TurntableConfig {
    pub fn from_json_file(path: &Path) -> TurntableResult<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| format!("parse config JSON '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn sweep(&self) -> TurntableResult<AngleSweep> {
        AngleSweep::new(
            self.start_deg,
            self.end_deg,
            self.frame_count,
            self.endpoint,
            self.axis,
        )
    }

    pub fn validate(&self) -> TurntableResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TurntableError::validation("width/height must be > 0"));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(TurntableError::validation(format!(
                "width/height must be <= {MAX_DIMENSION}"
            )));
        }
        self.sweep()?;
        if let Some(c) = self.correction
            && !c.degrees.is_finite()
        {
            return Err(TurntableError::validation(
                "orientation correction degrees must be finite",
            ));
        }

        let cam = &self.camera;
        if !(cam.yfov_deg > 0.0 && cam.yfov_deg < 180.0) {
            return Err(TurntableError::validation(
                "camera yfov_deg must be in (0, 180)",
            ));
        }
        if !(cam.znear > 0.0 && cam.znear.is_finite()) {
            return Err(TurntableError::validation("camera znear must be > 0"));
        }
        match cam.placement {
            CameraPlacement::Orbit { offset } => {
                if offset.iter().all(|v| *v == 0.0) || offset.iter().any(|v| !v.is_finite()) {
                    return Err(TurntableError::validation(
                        "orbit camera offset must be finite and non-zero",
                    ));
                }
            }
            CameraPlacement::Front { distance } => {
                if !(distance > cam.znear && distance.is_finite()) {
                    return Err(TurntableError::validation(
                        "front camera distance must exceed znear",
                    ));
                }
            }
        }

        for light in &self.lights {
            light.validate()?;
        }
        if self.ambient.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(TurntableError::validation("ambient must be finite and >= 0"));
        }
        if self.threads == Some(0) {
            return Err(TurntableError::validation(
                "threads must be >= 1 when set",
            ));
        }
        Ok(())
    }
}
