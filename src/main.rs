use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use device_framer::{
    assets::{decode_raster, encode_png, DirectoryAssets},
    catalog::{Frame, FrameCatalog, FrameMatcher, Selection},
    compose::ImageCompositor,
    config::Config,
    export::{framed_name, BatchExporter, MediaItem, ZipPackager},
    video::{CancellationToken, EngineEvent, VideoFramer},
    FramerError,
};

#[derive(Parser)]
#[command(
    name = "device-framer",
    version,
    about = "Place screenshots and screen recordings inside device frames",
    long_about = "Device-Framer detects the device a screenshot was taken on from its pixel size and composites it into realistic device frame artwork. Screen recordings are framed through ffmpeg."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Frame assets directory, overrides the configuration
    #[arg(short, long, global = true)]
    assets: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every frame in the catalog
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Report the frame matching a screenshot's size
    Detect {
        /// Screenshot file
        image: PathBuf,
    },

    /// Frame one or more screenshots
    Frame {
        /// Screenshot files; videos are skipped
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Frame id; detected from the first screenshot when omitted
        #[arg(short, long)]
        frame: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Write a single zip archive instead of separate files
        #[arg(long)]
        zip: bool,
    },

    /// Render a scaled-down preview
    Preview {
        /// Screenshot file
        image: PathBuf,

        /// Frame id; detected when omitted
        #[arg(short, long)]
        frame: Option<String>,

        /// Available width in pixels
        #[arg(short, long, default_value_t = 800)]
        width: u32,

        /// Output PNG path
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
    },

    /// Frame a screen recording with ffmpeg
    Video {
        /// Video file
        input: PathBuf,

        /// Frame id; detected from the first video frame when omitted
        #[arg(short, long)]
        frame: Option<String>,

        /// Clip duration in seconds; probed when omitted
        #[arg(short, long)]
        duration: Option<f64>,

        /// Output path, `framed-{name}.mp4` by default
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Device-Framer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };
    if let Some(root) = cli.assets {
        config.assets.root = root;
    }
    config.validate()?;

    let catalog = FrameCatalog::load(config.descriptor_path())
        .await
        .with_context(|| format!("loading frames from {}", config.assets.root.display()))?;

    match cli.command {
        Command::List { json } => list(&catalog, json),
        Command::Detect { image } => detect(&catalog, &config, &image),
        Command::Frame {
            inputs,
            frame,
            output,
            zip,
        } => frame_images(&catalog, &config, &inputs, frame.as_deref(), &output, zip).await,
        Command::Preview {
            image,
            frame,
            width,
            output,
        } => preview(&catalog, &config, &image, frame.as_deref(), width, &output).await,
        Command::Video {
            input,
            frame,
            duration,
            output,
        } => frame_video(&catalog, &config, &input, frame.as_deref(), duration, output).await,
    }
}

fn list(catalog: &FrameCatalog, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog.frames())?);
        return Ok(());
    }

    for frame in catalog {
        let size = frame
            .coordinates
            .screenshot_size()
            .map(|(w, h)| format!("{}x{}", w, h))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<60} {:>11}  {}", frame.id, size, frame.label());
    }
    Ok(())
}

fn read_screenshot(path: &Path) -> Result<image::RgbaImage> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(decode_raster(&bytes, &path.display().to_string())?)
}

fn detect(catalog: &FrameCatalog, config: &Config, image: &Path) -> Result<()> {
    let screenshot = read_screenshot(image)?;
    let (width, height) = screenshot.dimensions();
    let matcher = FrameMatcher::new(config.matching.tolerance);

    match catalog.detect(&matcher, width, height) {
        Some(frame) => {
            println!("{}", frame.id);
            Ok(())
        }
        None => Err(FramerError::NoMatchingFrame { width, height }.into()),
    }
}

/// Explicit id, else the detected frame, else the first catalog entry
fn choose_frame<'a>(
    catalog: &'a FrameCatalog,
    config: &Config,
    id: Option<&str>,
    observed: Option<(u32, u32)>,
) -> Result<&'a Frame> {
    if let Some(id) = id {
        return catalog
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown frame: {}", id));
    }

    let matcher = FrameMatcher::new(config.matching.tolerance);
    if let Some((width, height)) = observed {
        if let Some(frame) = catalog.detect(&matcher, width, height) {
            info!("Detected {}", frame.label());
            return Ok(frame);
        }
        warn!("{}", FramerError::NoMatchingFrame { width, height }.user_message());
    }

    Selection::default()
        .resolve(catalog.frames())
        .ok_or_else(|| anyhow::anyhow!("The frame catalog is empty"))
}

async fn frame_images(
    catalog: &FrameCatalog,
    config: &Config,
    inputs: &[PathBuf],
    frame_id: Option<&str>,
    output: &Path,
    zip: bool,
) -> Result<()> {
    let mut items = Vec::with_capacity(inputs.len());
    for path in inputs {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        items.push(MediaItem::new(name, bytes));
    }

    let observed = items
        .iter()
        .filter(|item| item.kind == device_framer::export::MediaKind::Image)
        .find_map(|item| decode_raster(&item.bytes, &item.name).ok())
        .map(|image| image.dimensions());
    let frame = choose_frame(catalog, config, frame_id, observed)?;
    info!("Using frame {}", frame.id);

    let exporter = BatchExporter::new(ImageCompositor::new(DirectoryAssets::new(&config.assets.root)));
    std::fs::create_dir_all(output)?;

    let report = if zip {
        let (archive, report) = exporter.export_archive(&items, frame, &ZipPackager).await?;
        let path = output.join(&config.export.archive_name);
        std::fs::write(&path, archive)?;
        info!("Wrote {} ({} images)", path.display(), report.entries.len());
        report
    } else {
        let report = exporter.export_all(&items, frame).await;
        for entry in &report.entries {
            let path = output.join(&entry.name);
            std::fs::write(&path, &entry.bytes)?;
            info!("Wrote {}", path.display());
        }
        report
    };

    for failure in &report.failures {
        warn!("{}: {}", failure.item, failure.error.user_message());
    }
    if !report.is_complete() {
        anyhow::bail!("{} of {} items failed", report.failures.len(), items.len());
    }
    Ok(())
}

async fn preview(
    catalog: &FrameCatalog,
    config: &Config,
    image: &Path,
    frame_id: Option<&str>,
    width: u32,
    output: &Path,
) -> Result<()> {
    let screenshot = read_screenshot(image)?;
    let frame = choose_frame(catalog, config, frame_id, Some(screenshot.dimensions()))?;

    let compositor = ImageCompositor::new(DirectoryAssets::new(&config.assets.root));
    let rendered = compositor
        .preview(&screenshot, frame, width, config.preview.max_width)
        .await?;
    std::fs::write(output, encode_png(&rendered)?)?;

    info!(
        "Preview {}x{} written to {}",
        rendered.width(),
        rendered.height(),
        output.display()
    );
    Ok(())
}

async fn frame_video(
    catalog: &FrameCatalog,
    config: &Config,
    input: &Path,
    frame_id: Option<&str>,
    duration: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let video = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let mut framer = VideoFramer::new(&config.video, DirectoryAssets::new(&config.assets.root));
    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let extracted = framer.extract_first_frame(&video, &cancel).await?;
    let frame = choose_frame(catalog, config, frame_id, Some(extracted.image.dimensions()))?;
    let duration = duration
        .or(extracted.duration)
        .ok_or(device_framer::error::VideoError::UnknownDuration)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let reporter = tokio::spawn(async move {
        let mut last_percent = None;
        while let Some(event) = rx.recv().await {
            if let EngineEvent::Progress(fraction) = event {
                let percent = (fraction * 100.0).floor() as u32;
                if last_percent != Some(percent) && percent % 10 == 0 {
                    info!("Encoding: {}%", percent);
                    last_percent = Some(percent);
                }
            }
        }
    });

    let result = framer.frame_video(&video, frame, duration, Some(tx), &cancel).await;
    // the sender is gone once frame_video returns, so the reporter ends
    if let Err(e) = reporter.await {
        warn!("Progress reporter failed: {}", e);
    }

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Some(log) = e.engine_log() {
                warn!("ffmpeg log:\n{}", log);
            }
            return Err(anyhow::anyhow!(e.user_message()));
        }
    };

    let output = output.unwrap_or_else(|| {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video.mp4".to_string());
        PathBuf::from(framed_name(&name, "mp4"))
    });
    std::fs::write(&output, bytes)?;
    info!("Framed video saved to: {}", output.display());
    Ok(())
}
