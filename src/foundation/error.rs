use std::path::PathBuf;

/// Convenience result type used across the crate.
pub type TurntableResult<T> = Result<T, TurntableError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Degenerate bounds are not an error: the scene module substitutes a fallback
/// scale/radius instead of surfacing them.
#[derive(thiserror::Error, Debug)]
pub enum TurntableError {
    /// Missing or malformed scene document, or an unresolved buffer/texture reference.
    #[error("asset load error: '{}': {reason}", .path.display())]
    AssetLoad { path: PathBuf, reason: String },

    /// The document loaded fine but holds no triangle geometry.
    #[error("empty geometry: '{}' contains no triangle meshes", .path.display())]
    EmptyGeometry { path: PathBuf },

    /// The rendering backend is unavailable, misconfigured, or already released.
    #[error("render context error: {0}")]
    RenderContext(String),

    /// A single frame failed to render; the sequence halts at this index.
    #[error("frame {index} ({angle_deg} deg) failed: {reason}")]
    Frame {
        index: usize,
        angle_deg: f32,
        reason: String,
    },

    /// Writing an output image failed.
    #[error("encode error: '{}': {reason}", .path.display())]
    Encode { path: PathBuf, reason: String },

    /// Invalid user-provided configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TurntableError {
    pub fn asset_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn render_context(msg: impl Into<String>) -> Self {
        Self::RenderContext(msg.into())
    }

    pub fn frame(index: usize, angle_deg: f32, reason: impl Into<String>) -> Self {
        Self::Frame {
            index,
            angle_deg,
            reason: reason.into(),
        }
    }

    pub fn encode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Encode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
