//! jpeg-structure CLI application

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jpeg_structure::config::{Config, OutputFormat};
use jpeg_structure::marker;
use jpeg_structure::{
    split_async, FrameHeader, FrameVisitor, SegmentEvent, SegmentList, SegmentVisitor, Splitter,
    VisitError, Visitor,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_PATH: &str = "jpeg-structure.toml";

#[derive(Parser, Debug)]
#[command(name = "jpeg-structure")]
#[command(about = "Split JPEG files into marker segments and inspect, extract or strip them")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every segment
    List {
        file: PathBuf,

        /// Print JSON regardless of the configured format
        #[arg(long)]
        json: bool,
    },

    /// Check that the segment list matches the file
    Validate { file: PathBuf },

    /// Write one segment's payload to a file
    Extract {
        file: PathBuf,

        /// Marker name or hex id (e.g. APP1, 0xfe), or "exif"
        #[arg(short, long)]
        marker: String,

        /// Which occurrence of the marker
        #[arg(short, long, default_value_t = 0)]
        index: usize,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove APP1..APP15 and COM segments
    Strip {
        file: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Logs segments as they are split.
struct LogVisitor;

impl SegmentVisitor for LogVisitor {
    fn handle_segment(&mut self, event: &SegmentEvent) -> Result<(), VisitError> {
        debug!(
            marker = event.marker_id,
            name = event.marker_name,
            counter = event.counter,
            scan_data = event.is_scan_data,
            "Segment"
        );
        Ok(())
    }
}

impl FrameVisitor for LogVisitor {
    fn handle_frame(&mut self, frame: &FrameHeader) -> Result<(), VisitError> {
        info!(%frame, "Frame");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::List { file, json } => list(&file, &config, json).await,
        Command::Validate { file } => validate(&file, &config).await,
        Command::Extract {
            file,
            marker,
            index,
            output,
        } => extract(&file, &config, &marker, index, &output).await,
        Command::Strip { file, output } => strip(&file, &config, &output).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            Config::load(path).with_context(|| format!("loading {}", path.display()))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!(config_path = DEFAULT_CONFIG_PATH, "Loading configuration");
            Config::load(DEFAULT_CONFIG_PATH)
                .with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))
        }
        None => Ok(Config::default()),
    }
}

async fn split_file(path: &Path, config: &Config) -> Result<SegmentList> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;

    let mut visitor = LogVisitor;
    let mut splitter = Splitter::with_visitor(Visitor::Both(&mut visitor));
    let summary = split_async(file, &mut splitter, &config.drive_options())
        .await
        .with_context(|| format!("splitting {}", path.display()))?;

    debug!(?summary, "Drive summary");
    Ok(splitter.into_segments())
}

async fn list(path: &Path, config: &Config, json: bool) -> Result<()> {
    let segments = split_file(path, config).await?;
    let stats = segments.stats();
    let frame = segments.frame_header()?;

    if json || config.output.format == OutputFormat::Json {
        let report = serde_json::json!({
            "file": path.display().to_string(),
            "segments": segments.summaries(),
            "stats": stats,
            "frame": frame,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", segments.dump());
        if let Some(frame) = frame {
            println!("{}", frame);
        }
        println!(
            "{} segments ({} structural), {} scan-data bytes, {} metadata bytes ({:.1}%)",
            stats.segments,
            stats.structural,
            stats.scan_data_bytes,
            stats.metadata_bytes,
            stats.metadata_ratio() * 100.0
        );
    }

    if config.output.validate {
        let data = tokio::fs::read(path).await?;
        segments.validate(&data)?;
    }

    Ok(())
}

async fn validate(path: &Path, config: &Config) -> Result<()> {
    let segments = split_file(path, config).await?;
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    segments
        .validate(&data)
        .with_context(|| format!("{} failed validation", path.display()))?;

    info!(file = %path.display(), segments = segments.len(), "Structure is valid");
    Ok(())
}

async fn extract(
    path: &Path,
    config: &Config,
    name: &str,
    index: usize,
    output: &Path,
) -> Result<()> {
    let segments = split_file(path, config).await?;

    let payload = if name.eq_ignore_ascii_case("exif") {
        match segments.exif() {
            Some(exif) => exif,
            None => bail!("{} has no EXIF block", path.display()),
        }
    } else {
        let Some(marker_id) = marker::parse_marker(name) else {
            bail!("unknown marker '{}'", name);
        };
        match segments.find_all(marker_id).nth(index) {
            Some(segment) => segment.payload.clone(),
            None => bail!(
                "{} has no segment {:#04x} at index {}",
                path.display(),
                marker_id,
                index
            ),
        }
    };

    tokio::fs::write(output, &payload)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    info!(bytes = payload.len(), output = %output.display(), "Extracted");
    Ok(())
}

async fn strip(path: &Path, config: &Config, output: &Path) -> Result<()> {
    let segments = split_file(path, config).await?;
    let stripped = segments.without(|s| {
        (marker::is_app(s.marker_id) && s.marker_id != marker::APP0) || s.marker_id == marker::COM
    });

    let bytes = stripped.to_bytes()?;
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        removed = segments.len() - stripped.len(),
        bytes = bytes.len(),
        output = %output.display(),
        "Stripped metadata"
    );
    Ok(())
}
