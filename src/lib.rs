//! Turntable renders a glTF asset from a fixed, automatically framed viewpoint.
//!
//! Pipeline overview:
//! 1. Load: [`load_asset`] reads a `.gltf`/`.glb` into world-space [`Mesh`]es and [`Material`]s.
//! 2. Normalize: [`normalize_meshes`] recenters the geometry on the origin and scales its
//!    largest extent to 1, optionally applying an orientation correction. This happens once.
//! 3. Light and frame: [`build_raymond_rig`] places three directional lights around the
//!    normalized bounds, [`place_camera`] puts a look-at camera in front of them.
//! 4. Render: a [`RenderContext`] (see [`begin_session`]) rasterizes the [`Scene`] offscreen.
//! 5. Sequence: [`FrameSequencer`] walks an [`AngleSweep`] and each frame is written as a
//!    zero-padded PNG by [`PngSink`] before the next angle is computed.
//!
//! [`render_still`] and [`render_sequence`] drive the whole thing from a [`TurntableConfig`].

#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod encode_png;
pub mod foundation;
pub mod pipeline;
pub mod render;
pub mod scene;
pub mod sequence;

pub use assets::{
    loader::{GeometryMode, LoadedAsset, load_asset, load_asset_from_slice},
    mesh::{Material, MaterialId, Mesh, TextureImage, Vertex},
};
pub use config::{CameraConfig, TurntableConfig};
pub use encode_png::{PngSink, frame_file_name, index_width, write_color_png, write_depth_png};
pub use foundation::{
    error::{TurntableError, TurntableResult},
    math::{Axis, Pose, look_at},
};
pub use pipeline::{
    PreparedScene, RenderStats, prepare_loaded, prepare_scene, render_prepared_sequence,
    render_sequence, render_still,
};
pub use render::{
    BackendKind, Frame, FrameTarget, RasterBackend, create_backend,
    session::{RenderContext, begin_session, with_session},
};
pub use scene::{
    bounds::{SceneBounds, compute_bounds},
    camera::{CameraDescriptor, CameraPlacement, place_camera, place_front_camera, place_orbit_camera},
    lights::{DEFAULT_RIG, FRONT_RIG, LightDescriptor, LightSpec, build_raymond_rig},
    model::{NodeHandle, PoseStrategy, Scene},
    normalize::{
        Normalization, OrientationCorrection, apply_orientation_correction, normalization_transform,
        normalize_meshes,
    },
};
pub use sequence::{AngleSweep, CancelFlag, EndpointMode, FrameSequencer, SequenceState};
