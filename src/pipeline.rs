use std::path::{Path, PathBuf};

use glam::Vec3;
use rayon::prelude::*;

use crate::{
    assets::loader::{LoadedAsset, load_asset},
    config::TurntableConfig,
    encode_png::{PngSink, index_width, write_color_png, write_depth_png},
    foundation::error::{TurntableError, TurntableResult},
    render::{
        Frame,
        session::{RenderContext, begin_session, with_session},
    },
    scene::{
        bounds::SceneBounds,
        camera::place_camera,
        lights::build_raymond_rig,
        model::{PoseStrategy, Scene},
        normalize::normalize_meshes,
    },
    sequence::{AngleSweep, CancelFlag, FrameSequencer, SequenceState},
};

/// A normalized, lit and framed scene ready for the frame loop.
#[derive(Clone, Debug)]
pub struct PreparedScene {
    pub scene: Scene,
    /// Bounds of the normalized geometry.
    pub bounds: SceneBounds,
    pub source_bounds: SceneBounds,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    pub frames_written: u64,
    pub cancelled: bool,
}

/// Load → normalize (once) → place lights and camera → assemble the scene.
#[tracing::instrument(skip(cfg), fields(path = %path.display()))]
pub fn prepare_scene(path: &Path, cfg: &TurntableConfig) -> TurntableResult<PreparedScene> {
    cfg.validate()?;
    let asset = load_asset(path, cfg.geometry)?;
    prepare_loaded(asset, cfg)
}

/// Same as [`prepare_scene`] for geometry that is already in memory.
pub fn prepare_loaded(mut asset: LoadedAsset, cfg: &TurntableConfig) -> TurntableResult<PreparedScene> {
    let norm = normalize_meshes(&mut asset.meshes, cfg.correction).ok_or_else(|| {
        TurntableError::EmptyGeometry {
            path: asset.source.clone(),
        }
    })?;

    let center = norm.bounds.centroid();
    let radius = norm.bounds.radius();
    let lights = build_raymond_rig(center, radius, &cfg.lights)?;
    let camera = place_camera(
        cfg.camera.placement,
        center,
        radius,
        cfg.camera.yfov_deg,
        cfg.camera.znear,
    )?;
    tracing::info!(?center, radius, eye = ?camera.eye, "placed lights and camera");

    let mut scene = Scene::new(asset, lights, camera);
    scene.ambient = Vec3::from(cfg.ambient);
    scene.background = cfg.background;
    scene.smooth = cfg.smooth;

    Ok(PreparedScene {
        scene,
        bounds: norm.bounds,
        source_bounds: norm.source_bounds,
    })
}

/// Render one frame at the rest pose and write it to `out`.
#[tracing::instrument(skip(cfg), fields(path = %path.display(), out = %out.display()))]
pub fn render_still(path: &Path, out: &Path, cfg: &TurntableConfig) -> TurntableResult<Frame> {
    let prepared = prepare_scene(path, cfg)?;
    let frame = with_session(cfg.backend, cfg.width, cfg.height, |ctx| {
        ctx.render_frame(&prepared.scene, 0)
            .map_err(|e| TurntableError::frame(0, 0.0, e.to_string()))
    })?;
    tracing::debug!(
        color = ?frame.color_range(),
        depth = ?frame.depth_range(),
        "still frame buffers"
    );

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| TurntableError::encode(parent, format!("create output dir: {e}")))?;
    }
    write_color_png(&frame, out)?;
    if cfg.write_depth {
        write_depth_png(&frame, &depth_sibling(out))?;
    }
    tracing::info!(out = %out.display(), "wrote still");
    Ok(frame)
}

fn depth_sibling(out: &Path) -> PathBuf {
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    out.with_file_name(format!("{stem}_depth.png"))
}

/// Load, prepare and render the configured turntable into `cfg.out_dir`.
#[tracing::instrument(skip(cfg, cancel), fields(path = %path.display()))]
pub fn render_sequence(
    path: &Path,
    cfg: &TurntableConfig,
    cancel: &CancelFlag,
) -> TurntableResult<RenderStats> {
    let prepared = prepare_scene(path, cfg)?;
    render_prepared_sequence(&prepared.scene, cfg, cancel)
}

/// Drive the frame loop over an already prepared scene.
pub fn render_prepared_sequence(
    scene: &Scene,
    cfg: &TurntableConfig,
    cancel: &CancelFlag,
) -> TurntableResult<RenderStats> {
    let sweep = cfg.sweep()?;
    let sink = PngSink::create(
        &cfg.out_dir,
        index_width(sweep.count, cfg.index_width),
        cfg.write_depth,
    )?;
    tracing::info!(
        frames = sweep.count,
        start = sweep.start_deg,
        end = sweep.end_deg,
        axis = ?sweep.axis,
        out_dir = %sink.dir.display(),
        "rendering sequence"
    );

    match cfg.threads {
        None => {
            let ctx = begin_session(cfg.backend, cfg.width, cfg.height)?;
            render_sequential(ctx, scene.clone(), sweep, cfg.pose_strategy, &sink, cancel)
        }
        Some(threads) => render_parallel(scene, sweep, cfg, threads, &sink, cancel),
    }
}

/// Render every frame on one context, which is released on every exit path.
fn render_sequential(
    mut ctx: RenderContext,
    scene: Scene,
    sweep: AngleSweep,
    strategy: PoseStrategy,
    sink: &PngSink,
    cancel: &CancelFlag,
) -> TurntableResult<RenderStats> {
    let out = sequential_frames(&mut ctx, scene, sweep, strategy, sink, cancel);
    ctx.end_session();
    out
}

fn sequential_frames(
    ctx: &mut RenderContext,
    mut scene: Scene,
    sweep: AngleSweep,
    strategy: PoseStrategy,
    sink: &PngSink,
    cancel: &CancelFlag,
) -> TurntableResult<RenderStats> {
    let mut stats = RenderStats {
        frames_total: sweep.count as u64,
        ..Default::default()
    };
    let mut seq = FrameSequencer::new(sweep, cancel.clone());
    while let Some((index, angle, rotation)) = seq.next_frame() {
        scene.apply_pose(rotation, strategy);
        let frame = ctx
            .render_frame(&scene, index)
            .map_err(|e| TurntableError::frame(index, angle, e.to_string()))?;
        let written = sink
            .write(&frame)
            .map_err(|e| TurntableError::frame(index, angle, e.to_string()))?;
        stats.frames_written += 1;
        log_progress(index, sweep.count, &written);

        if let SequenceState::Cancelled { next } = seq.complete(index)? {
            tracing::warn!(next, "sequence cancelled");
            stats.cancelled = true;
        }
    }
    Ok(stats)
}

/// Render chunks of frames on a worker pool, then write each chunk in index order.
///
/// Every worker owns its own render context and its own copy of the pose state.
fn render_parallel(
    scene: &Scene,
    sweep: AngleSweep,
    cfg: &TurntableConfig,
    threads: usize,
    sink: &PngSink,
    cancel: &CancelFlag,
) -> TurntableResult<RenderStats> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| TurntableError::render_context(format!("failed to build thread pool: {e}")))?;

    let mut stats = RenderStats {
        frames_total: sweep.count as u64,
        ..Default::default()
    };
    let mut seq = FrameSequencer::new(sweep, cancel.clone());
    let chunk = threads.max(1) * 2;
    let mut chunk_start = 0;
    while chunk_start < sweep.count {
        let chunk_end = (chunk_start + chunk).min(sweep.count);
        let rendered: Vec<TurntableResult<Frame>> = pool.install(|| {
            (chunk_start..chunk_end)
                .into_par_iter()
                .map_init(
                    || {
                        (
                            begin_session(cfg.backend, cfg.width, cfg.height),
                            scene.clone(),
                        )
                    },
                    |(ctx, local), index| {
                        let angle = sweep.angle(index);
                        let ctx = ctx
                            .as_mut()
                            .map_err(|e| TurntableError::render_context(e.to_string()))?;
                        local.apply_pose(sweep.rotation(index), cfg.pose_strategy);
                        ctx.render_frame(local, index)
                            .map_err(|e| TurntableError::frame(index, angle, e.to_string()))
                    },
                )
                .collect()
        });

        for item in rendered {
            let frame = item?;
            let (index, angle, _) = seq
                .next_frame()
                .ok_or_else(|| TurntableError::validation("sequencer finished early"))?;
            if frame.index != index {
                return Err(TurntableError::frame(index, angle, "frame arrived out of order"));
            }
            let written = sink
                .write(&frame)
                .map_err(|e| TurntableError::frame(index, angle, e.to_string()))?;
            stats.frames_written += 1;
            log_progress(index, sweep.count, &written);
            if let SequenceState::Cancelled { next } = seq.complete(index)? {
                tracing::warn!(next, "sequence cancelled");
                stats.cancelled = true;
                return Ok(stats);
            }
        }
        chunk_start = chunk_end;
    }
    Ok(stats)
}

fn log_progress(index: usize, total: usize, written: &Path) {
    if (index + 1) % 10 == 0 || index + 1 == total {
        tracing::info!("[{}/{}] {}", index + 1, total, written.display());
    } else {
        tracing::debug!(index, path = %written.display(), "wrote frame");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        foundation::math::Axis,
        render::{FrameTarget, RasterBackend},
        scene::bounds::tests::cloud,
        sequence::EndpointMode,
    };

    /// Fails its `fail_at`-th render call.
    struct FailAt {
        fail_at: u64,
        calls: u64,
        releases: Arc<AtomicUsize>,
    }

    impl RasterBackend for FailAt {
        fn name(&self) -> &'static str {
            "fail-at"
        }

        fn render(&mut self, scene: &Scene, target: &mut FrameTarget) -> TurntableResult<()> {
            let call = self.calls;
            self.calls += 1;
            if call == self.fail_at {
                return Err(TurntableError::render_context("injected failure"));
            }
            target.clear(scene.background);
            Ok(())
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn cloud_asset() -> LoadedAsset {
        LoadedAsset {
            source: PathBuf::from("cloud.gltf"),
            meshes: vec![cloud(&[Vec3::new(4.0, 2.0, 0.0), Vec3::new(8.0, 6.0, 2.0)])],
            materials: vec![Default::default()],
        }
    }

    #[test]
    fn depth_image_sits_next_to_color() {
        assert_eq!(
            depth_sibling(Path::new("out/still.png")),
            PathBuf::from("out/still_depth.png")
        );
    }

    #[test]
    fn prepared_scene_is_unit_sized_and_framed() {
        let prepared = prepare_loaded(cloud_asset(), &TurntableConfig::default()).unwrap();
        assert!((prepared.bounds.max_extent() - 1.0).abs() < 1e-5);
        assert!(prepared.bounds.centroid().length() < 1e-5);
        assert_eq!(prepared.source_bounds.max, Vec3::new(8.0, 6.0, 2.0));
        assert!(prepared.scene.camera.eye.z > 0.0);
    }

    #[test]
    fn vertexless_asset_is_empty_geometry() {
        let asset = LoadedAsset {
            source: PathBuf::from("hollow.gltf"),
            meshes: Vec::new(),
            materials: Vec::new(),
        };
        let err = prepare_loaded(asset, &TurntableConfig::default()).unwrap_err();
        assert!(matches!(err, TurntableError::EmptyGeometry { .. }));
    }

    #[test]
    fn failing_frame_halts_sequence_and_releases_context() {
        let dir = PathBuf::from("target").join("pipeline_fail_at");
        let _ = std::fs::remove_dir_all(&dir);
        let sink = PngSink::create(&dir, 4, false).unwrap();
        let prepared = prepare_loaded(cloud_asset(), &TurntableConfig::default()).unwrap();
        let releases = Arc::new(AtomicUsize::new(0));
        let backend = Box::new(FailAt {
            fail_at: 2,
            calls: 0,
            releases: releases.clone(),
        });
        let ctx = RenderContext::with_backend(backend, 16, 12);
        let sweep = AngleSweep::new(0.0, 360.0, 5, EndpointMode::Exclusive, Axis::Y).unwrap();

        let err = render_sequential(
            ctx,
            prepared.scene,
            sweep,
            PoseStrategy::Node,
            &sink,
            &CancelFlag::new(),
        )
        .unwrap_err();
        match err {
            TurntableError::Frame {
                index, angle_deg, ..
            } => {
                assert_eq!(index, 2);
                assert_eq!(angle_deg, 144.0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        let mut names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["frame_0000.png", "frame_0001.png"]);
    }
}
