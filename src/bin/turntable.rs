use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "turntable", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the asset once, at rest, as a single PNG.
    Still(StillArgs),
    /// Render a rotation sweep as numbered PNG frames.
    Sequence(SequenceArgs),
}

/// Options shared by both subcommands. Flags override the config file.
#[derive(Parser, Debug)]
struct CommonArgs {
    /// Input glTF (`.gltf` or `.glb`).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// JSON config; any subset of fields may be present.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Fixed rotation applied after normalization, e.g. to stand a Z-up model upright.
    #[arg(long, value_enum, requires = "correction_deg")]
    correction_axis: Option<AxisChoice>,

    #[arg(long, allow_negative_numbers = true, requires = "correction_axis")]
    correction_deg: Option<f32>,

    /// Frame the model straight-on from +Z at this distance instead of the orbit vantage.
    #[arg(long)]
    front: Option<f32>,

    /// Light from the camera side instead of the classic raymond rig.
    #[arg(long)]
    front_lights: bool,

    /// Also write a 16-bit depth PNG next to each color image.
    #[arg(long)]
    depth: bool,
}

#[derive(Parser, Debug)]
struct StillArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SequenceArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output directory for `frame_NNNN.png`.
    #[arg(long)]
    out_dir: PathBuf,

    #[arg(long)]
    frames: Option<usize>,

    #[arg(long, allow_negative_numbers = true)]
    start: Option<f32>,

    #[arg(long, allow_negative_numbers = true)]
    end: Option<f32>,

    #[arg(long, value_enum)]
    axis: Option<AxisChoice>,

    #[arg(long, value_enum)]
    endpoint: Option<EndpointChoice>,

    /// Render on this many worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Copy and re-transform geometry every frame instead of updating node poses.
    #[arg(long)]
    rebake: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AxisChoice {
    X,
    Y,
    Z,
}

impl From<AxisChoice> for turntable::Axis {
    fn from(a: AxisChoice) -> Self {
        match a {
            AxisChoice::X => Self::X,
            AxisChoice::Y => Self::Y,
            AxisChoice::Z => Self::Z,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EndpointChoice {
    Inclusive,
    Exclusive,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Still(args) => cmd_still(args),
        Command::Sequence(args) => cmd_sequence(args),
    }
}

fn load_config(common: &CommonArgs) -> anyhow::Result<turntable::TurntableConfig> {
    let mut cfg = match &common.config {
        Some(path) => turntable::TurntableConfig::from_json_file(path)?,
        None => turntable::TurntableConfig::default(),
    };
    if let Some(w) = common.width {
        cfg.width = w;
    }
    if let Some(h) = common.height {
        cfg.height = h;
    }
    if let (Some(axis), Some(degrees)) = (common.correction_axis, common.correction_deg) {
        cfg.correction = Some(turntable::OrientationCorrection {
            axis: axis.into(),
            degrees,
        });
    }
    if let Some(distance) = common.front {
        cfg.camera.placement = turntable::CameraPlacement::Front { distance };
    }
    if common.front_lights {
        cfg.lights = turntable::FRONT_RIG;
    }
    if common.depth {
        cfg.write_depth = true;
    }
    Ok(cfg)
}

fn cmd_still(args: StillArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.common)?;
    cfg.validate()?;
    turntable::render_still(&args.common.in_path, &args.out, &cfg)
        .with_context(|| format!("render still '{}'", args.common.in_path.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_sequence(args: SequenceArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(&args.common)?;
    cfg.out_dir = args.out_dir.clone();
    if let Some(n) = args.frames {
        cfg.frame_count = n;
    }
    if let Some(s) = args.start {
        cfg.start_deg = s;
    }
    if let Some(e) = args.end {
        cfg.end_deg = e;
    }
    if let Some(a) = args.axis {
        cfg.axis = a.into();
    }
    if let Some(m) = args.endpoint {
        cfg.endpoint = match m {
            EndpointChoice::Inclusive => turntable::EndpointMode::Inclusive,
            EndpointChoice::Exclusive => turntable::EndpointMode::Exclusive,
        };
    }
    if args.threads.is_some() {
        cfg.threads = args.threads;
    }
    if args.rebake {
        cfg.pose_strategy = turntable::PoseStrategy::Rebake;
    }
    cfg.validate()?;

    let stats = turntable::render_sequence(
        &args.common.in_path,
        &cfg,
        &turntable::CancelFlag::new(),
    )
    .with_context(|| format!("render sequence '{}'", args.common.in_path.display()))?;
    eprintln!(
        "wrote {}/{} frames to {}",
        stats.frames_written,
        stats.frames_total,
        display_dir(&cfg.out_dir)
    );
    Ok(())
}

fn display_dir(p: &Path) -> String {
    if p.as_os_str().is_empty() {
        ".".to_string()
    } else {
        p.display().to_string()
    }
}
