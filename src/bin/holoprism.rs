use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "holoprism", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite one image into a hologram PNG.
    Still(StillArgs),
    /// Write the four rotated faces of an image as PNGs.
    Faces(FacesArgs),
    /// Cross-fade two images and export the hologram animation.
    Fade(FadeArgs),
    /// Convert a video into a hologram video (needs the `media-ffmpeg` feature).
    Video(VideoArgs),
}

#[derive(Parser, Debug)]
struct StillArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Write the screen preview (fitted to --max-width) instead of the full frame.
    #[arg(long)]
    preview: bool,

    /// Preview size limit.
    #[arg(long, default_value_t = holoprism::DEFAULT_PREVIEW_MAX_WIDTH)]
    max_width: u32,

    /// Draw alignment guides on the preview.
    #[arg(long)]
    guides: bool,
}

#[derive(Parser, Debug)]
struct FacesArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory receiving top.png, right.png, bottom.png, left.png.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Gif,
    Video,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DirectionChoice {
    Forward,
    Reverse,
    Pingpong,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CapabilityChoice {
    Auto,
    Constrained,
    Normal,
}

#[derive(Parser, Debug)]
struct FadeArgs {
    /// First image (shown at the start).
    #[arg(long)]
    a: PathBuf,

    /// Second image.
    #[arg(long)]
    b: PathBuf,

    /// Output file.
    #[arg(long)]
    out: PathBuf,

    /// Export format.
    #[arg(long, value_enum, default_value_t = FormatChoice::Gif)]
    format: FormatChoice,

    /// JSON config; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Forward pass length in seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Playback order.
    #[arg(long, value_enum)]
    direction: Option<DirectionChoice>,

    /// Play once instead of looping (GIF).
    #[arg(long)]
    no_loop: bool,

    /// Capability class.
    #[arg(long, value_enum)]
    capability: Option<CapabilityChoice>,
}

#[derive(Parser, Debug)]
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
struct VideoArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output file; a still fallback is written as PNG next to it.
    #[arg(long)]
    out: PathBuf,

    /// Output frame rate (defaults to the source rate).
    #[arg(long)]
    fps: Option<u32>,

    /// Capability class.
    #[arg(long, value_enum, default_value_t = CapabilityChoice::Auto)]
    capability: CapabilityChoice,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Still(args) => cmd_still(args),
        Command::Faces(args) => cmd_faces(args),
        Command::Fade(args) => cmd_fade(args),
        Command::Video(args) => cmd_video(args),
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn write_media(requested: &Path, media: &holoprism::EncodedMedia) -> anyhow::Result<()> {
    let path = media.container.output_path(requested);
    if path != requested {
        eprintln!(
            "encoder produced {}; writing {} instead of {}",
            media.container.mime(),
            path.display(),
            requested.display()
        );
    }
    write_output(&path, &media.bytes)
}

fn save_png(path: &Path, raster: &holoprism::Raster) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    image::save_buffer_with_format(
        path,
        &raster.to_straight_rgba8(),
        raster.width,
        raster.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn load_image(path: &Path) -> anyhow::Result<holoprism::Raster> {
    holoprism::decode_image_file(path).map_err(|e| describe(e, path))
}

fn describe(e: holoprism::HoloError, path: &Path) -> anyhow::Error {
    let hint = e.hint();
    anyhow::Error::new(e).context(format!("{} ({hint})", path.display()))
}

fn class_override(choice: CapabilityChoice) -> holoprism::CapabilityOverride {
    match choice {
        CapabilityChoice::Auto => holoprism::CapabilityOverride::Auto,
        CapabilityChoice::Constrained => holoprism::CapabilityOverride::Constrained,
        CapabilityChoice::Normal => holoprism::CapabilityOverride::Normal,
    }
}

fn progress_printer() -> impl FnMut(u8) + Send + 'static {
    let mut last = None;
    move |p: u8| {
        if last != Some(p) {
            last = Some(p);
            eprint!("\rencoding {p:3}%");
            if p == 100 {
                eprintln!();
            }
        }
    }
}

fn cmd_still(args: StillArgs) -> anyhow::Result<()> {
    let source = load_image(&args.in_path)?;
    let layout = holoprism::PanelLayout::for_source(source.width, source.height)?;
    let frame = holoprism::composite(&source, &layout)?;
    let frame = if args.preview {
        holoprism::render_still_preview(&frame, args.max_width, args.guides)?
    } else {
        frame
    };
    save_png(&args.out, &frame)
}

fn cmd_faces(args: FacesArgs) -> anyhow::Result<()> {
    let source = load_image(&args.in_path)?;
    let faces = holoprism::extract_faces(&source)?;
    for (side, face) in holoprism::PanelSide::ALL.iter().zip(&faces) {
        let name = format!("{side:?}").to_lowercase();
        save_png(&args.out_dir.join(format!("{name}.png")), face)?;
    }
    Ok(())
}

fn cmd_fade(args: FadeArgs) -> anyhow::Result<()> {
    let mut cfg = match &args.config {
        Some(path) => holoprism::HologramConfig::from_path(path)?,
        None => holoprism::HologramConfig::default(),
    };
    if let Some(d) = args.duration {
        cfg.animation.duration_seconds = d;
    }
    if let Some(fps) = args.fps {
        cfg.animation.fps = fps;
    }
    if let Some(dir) = args.direction {
        cfg.animation.direction = match dir {
            DirectionChoice::Forward => holoprism::Direction::Forward,
            DirectionChoice::Reverse => holoprism::Direction::Reverse,
            DirectionChoice::Pingpong => holoprism::Direction::Pingpong,
        };
    }
    if args.no_loop {
        cfg.animation.loop_playback = false;
    }
    if let Some(c) = args.capability {
        cfg.capability = class_override(c);
    }
    cfg.validate()?;

    let a = load_image(&args.a)?;
    let b = load_image(&args.b)?;
    let sequencer = holoprism::FadeSequencer::new(cfg.budget(&holoprism::SystemProbe));
    let plan = sequencer.plan(&cfg.animation)?;
    let frames = sequencer.generate(&a, &b, &cfg.animation)?;
    eprintln!("generated {} frames at {} fps", frames.len(), plan.fps);

    let encoder = holoprism::Encoder::default().with_gif_loop(cfg.animation.loop_playback);
    let cancel = holoprism::CancelToken::new();
    let media = match args.format {
        FormatChoice::Gif => encoder.encode_to_gif(&frames, plan.fps, progress_printer(), &cancel),
        FormatChoice::Video => {
            encoder.encode_to_video(&frames, plan.fps, progress_printer(), &cancel)
        }
    }
    .map_err(|e| describe(e, &args.out))?;
    write_media(&args.out, &media)
}

#[cfg(feature = "media-ffmpeg")]
fn cmd_video(args: VideoArgs) -> anyhow::Result<()> {
    let mut source =
        holoprism::FfmpegVideoSource::open(&args.in_path).map_err(|e| describe(e, &args.in_path))?;
    let cfg = holoprism::HologramConfig {
        capability: class_override(args.capability),
        ..holoprism::HologramConfig::default()
    };
    let opts = holoprism::HologramVideoOptions {
        fps: args.fps,
        budget: cfg.budget(&holoprism::SystemProbe),
    };
    let encoder = holoprism::Encoder::default();
    let result = encoder
        .process_source_video_to_hologram(
            &mut source,
            &opts,
            progress_printer(),
            &holoprism::CancelToken::new(),
        )
        .map_err(|e| describe(e, &args.in_path))?;
    match result {
        holoprism::HologramVideo::Video(media) => write_media(&args.out, &media),
        holoprism::HologramVideo::StillFallback { png, reason, .. } => {
            eprintln!("video export unavailable ({reason}); {}", reason.hint());
            write_output(&args.out.with_extension("png"), &png)
        }
    }
}

#[cfg(not(feature = "media-ffmpeg"))]
fn cmd_video(_args: VideoArgs) -> anyhow::Result<()> {
    anyhow::bail!("video input requires building holoprism with the 'media-ffmpeg' feature")
}
