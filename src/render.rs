pub mod cpu;
pub mod session;

use crate::{
    foundation::error::{TurntableError, TurntableResult},
    scene::model::Scene,
};

/// One rendered frame: RGB8 color plus linear view depth (0 where nothing was drawn).
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Row-major, tightly packed RGB8.
    pub color: Vec<u8>,
    /// Row-major view-space depth, one value per pixel.
    pub depth: Vec<f32>,
}

impl Frame {
    /// Per-channel min/max over the color buffer.
    pub fn color_range(&self) -> (u8, u8) {
        let min = self.color.iter().copied().min().unwrap_or(0);
        let max = self.color.iter().copied().max().unwrap_or(0);
        (min, max)
    }

    /// Min/max depth over covered pixels; `None` when nothing was drawn.
    pub fn depth_range(&self) -> Option<(f32, f32)> {
        self.depth
            .iter()
            .copied()
            .filter(|d| *d > 0.0)
            .fold(None, |acc, d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.color[i], self.color[i + 1], self.color[i + 2]]
    }
}

/// Reusable color/depth storage owned by a render context.
#[derive(Debug)]
pub struct FrameTarget {
    pub width: u32,
    pub height: u32,
    pub color: Vec<u8>,
    pub depth: Vec<f32>,
}

impl FrameTarget {
    pub fn new(width: u32, height: u32) -> Self {
        let n = (width as usize) * (height as usize);
        Self {
            width,
            height,
            color: vec![0; n * 3],
            depth: vec![f32::INFINITY; n],
        }
    }

    /// Reset in place; never reallocates.
    pub fn clear(&mut self, background: [u8; 3]) {
        for px in self.color.chunks_exact_mut(3) {
            px.copy_from_slice(&background);
        }
        self.depth.fill(f32::INFINITY);
    }
}

/// A rasterization service: draws the scene's current pose into a target.
pub trait RasterBackend: Send {
    fn name(&self) -> &'static str;

    fn render(&mut self, scene: &Scene, target: &mut FrameTarget) -> TurntableResult<()>;

    /// Drop backend-held resources. Called exactly once per session.
    fn release(&mut self) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Cpu,
}

/// Upper bound on either output dimension.
pub const MAX_DIMENSION: u32 = 16_384;

pub fn create_backend(kind: BackendKind) -> TurntableResult<Box<dyn RasterBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(cpu::CpuBackend::new())),
        #[allow(unreachable_patterns)]
        _ => Err(TurntableError::render_context(
            "requested backend is not available",
        )),
    }
}
