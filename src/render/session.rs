use crate::{
    foundation::error::{TurntableError, TurntableResult},
    render::{BackendKind, Frame, FrameTarget, MAX_DIMENSION, RasterBackend, create_backend},
    scene::model::Scene,
};

/// Offscreen rendering session: a backend plus its reusable color/depth target.
///
/// Released exactly once, either by [`RenderContext::end_session`] or on drop.
/// Rendering on a released context fails with [`TurntableError::RenderContext`].
pub struct RenderContext {
    backend: Option<Box<dyn RasterBackend>>,
    target: FrameTarget,
    frames_rendered: u64,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("width", &self.target.width)
            .field("height", &self.target.height)
            .field("frames_rendered", &self.frames_rendered)
            .finish()
    }
}

/// Acquire a backend and a `width`×`height` target.
pub fn begin_session(kind: BackendKind, width: u32, height: u32) -> TurntableResult<RenderContext> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(TurntableError::render_context(format!(
            "viewport {width}x{height} is outside 1..={MAX_DIMENSION}"
        )));
    }
    let backend = create_backend(kind)?;
    tracing::debug!(backend = backend.name(), width, height, "render session started");
    Ok(RenderContext::with_backend(backend, width, height))
}

/// Run `f` inside a session that is released on every exit path.
pub fn with_session<T>(
    kind: BackendKind,
    width: u32,
    height: u32,
    f: impl FnOnce(&mut RenderContext) -> TurntableResult<T>,
) -> TurntableResult<T> {
    let mut ctx = begin_session(kind, width, height)?;
    let out = f(&mut ctx);
    ctx.end_session();
    out
}

impl RenderContext {
    pub(crate) fn with_backend(backend: Box<dyn RasterBackend>, width: u32, height: u32) -> Self {
        Self {
            backend: Some(backend),
            target: FrameTarget::new(width, height),
            frames_rendered: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.target.width
    }

    pub fn height(&self) -> u32 {
        self.target.height
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn is_active(&self) -> bool {
        self.backend.is_some()
    }

    /// Render the scene's current pose and copy the buffers out as frame `index`.
    pub fn render_frame(&mut self, scene: &Scene, index: usize) -> TurntableResult<Frame> {
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| TurntableError::render_context("render session already ended"))?;
        backend.render(scene, &mut self.target)?;
        self.frames_rendered += 1;
        Ok(Frame {
            index,
            width: self.target.width,
            height: self.target.height,
            color: self.target.color.clone(),
            depth: self.target.depth.clone(),
        })
    }

    /// Release backend resources. Returns `false` if the session had already ended.
    pub fn end_session(&mut self) -> bool {
        let Some(mut backend) = self.backend.take() else {
            return false;
        };
        backend.release();
        tracing::debug!(
            backend = backend.name(),
            frames = self.frames_rendered,
            "render session ended"
        );
        true
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.end_session();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use glam::Vec3;

    use super::*;
    use crate::{
        assets::{
            loader::LoadedAsset,
            mesh::{Material, MaterialId, Mesh, Vertex},
        },
        scene::{
            camera::place_front_camera,
            lights::{DEFAULT_RIG, build_raymond_rig},
        },
    };

    fn tiny_scene() -> Scene {
        let mesh = Mesh {
            name: None,
            vertices: [Vec3::ZERO, Vec3::X, Vec3::Y]
                .iter()
                .map(|&position| Vertex {
                    position: position - Vec3::splat(0.3),
                    normal: Vec3::Z,
                    ..Default::default()
                })
                .collect(),
            indices: vec![0, 1, 2],
            material: MaterialId(0),
        };
        Scene::new(
            LoadedAsset {
                source: PathBuf::from("tiny.gltf"),
                meshes: vec![mesh],
                materials: vec![Material::default()],
            },
            build_raymond_rig(Vec3::ZERO, 1.0, &DEFAULT_RIG).unwrap(),
            place_front_camera(Vec3::ZERO, 2.2, 45.0, 0.05).unwrap(),
        )
    }

    struct CountingBackend {
        releases: Arc<AtomicUsize>,
        fail: bool,
    }

    impl RasterBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn render(&mut self, _scene: &Scene, _target: &mut FrameTarget) -> TurntableResult<()> {
            if self.fail {
                return Err(TurntableError::render_context("injected failure"));
            }
            Ok(())
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_context(fail: bool) -> (RenderContext, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        let backend = Box::new(CountingBackend {
            releases: releases.clone(),
            fail,
        });
        (RenderContext::with_backend(backend, 8, 8), releases)
    }

    #[test]
    fn render_after_end_session_fails() {
        let scene = tiny_scene();
        let mut ctx = begin_session(BackendKind::Cpu, 32, 24).unwrap();
        assert!(ctx.render_frame(&scene, 0).is_ok());
        assert!(ctx.end_session());
        assert!(!ctx.end_session());
        let err = ctx.render_frame(&scene, 1).unwrap_err();
        assert!(matches!(err, TurntableError::RenderContext(_)));
    }

    #[test]
    fn repeated_frames_reuse_the_target() {
        let scene = tiny_scene();
        let mut ctx = begin_session(BackendKind::Cpu, 32, 24).unwrap();
        let cap = ctx.target.color.capacity();
        let a = ctx.render_frame(&scene, 0).unwrap();
        let b = ctx.render_frame(&scene, 1).unwrap();
        assert_eq!(a.color, b.color);
        assert_eq!(ctx.target.color.capacity(), cap);
        assert_eq!(ctx.frames_rendered(), 2);
        assert_eq!(b.index, 1);
    }

    #[test]
    fn zero_sized_viewport_is_a_context_error() {
        let err = begin_session(BackendKind::Cpu, 0, 720).unwrap_err();
        assert!(matches!(err, TurntableError::RenderContext(_)));
    }

    #[test]
    fn failed_frame_still_releases_once() {
        let (mut ctx, releases) = counting_context(true);
        let scene = tiny_scene();
        assert!(ctx.render_frame(&scene, 0).is_err());
        drop(ctx);
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        let (mut ctx, releases) = counting_context(false);
        ctx.end_session();
        drop(ctx);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn with_session_propagates_error_after_cleanup() {
        let scene = tiny_scene();
        let out: TurntableResult<()> = with_session(BackendKind::Cpu, 16, 16, |ctx| {
            ctx.render_frame(&scene, 0)?;
            Err(TurntableError::frame(0, 0.0, "encode failed"))
        });
        assert!(matches!(out, Err(TurntableError::Frame { index: 0, .. })));
    }
}
