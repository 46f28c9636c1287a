//! Line-oriented control console for the zone vision engine.
//!
//! Commands are read from stdin, one per line (`start`, `select Red`,
//! `query Red`, ...). Zone messages go to the configured transport; replies and
//! logs go to stderr so that stdout can serve as the transport.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{ConsoleConfig, Overrides};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use zone_vision::{
    BoundaryRule, CalibrationStore, ControlCommand, ControlSession, DetectionPipeline,
    ImageSequenceSource, Transport, VisionService, WriterTransport,
};

#[derive(Parser, Debug)]
#[command(name = "zone_console")]
#[command(about = "Report which zones of the frame each calibrated color occupies")]
#[command(version)]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calibration file to load and save.
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Directory of frames to replay as the capture source.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Play the frame directory once instead of looping.
    #[arg(long)]
    once: bool,

    /// Transport target: `stdout` or a device/file path.
    #[arg(long)]
    transport: Option<String>,

    /// Send messages without a trailing newline.
    #[arg(long)]
    raw: bool,

    /// Start processing immediately.
    #[arg(long)]
    start: bool,

    /// Number of horizontal zones.
    #[arg(long)]
    zones: Option<u32>,

    /// Minimum region area in pixels.
    #[arg(long)]
    min_area: Option<usize>,

    /// Zone edge tie-break: floor or ceil.
    #[arg(long)]
    boundary: Option<BoundaryRule>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            calibration_path: self.calibration.clone(),
            frame_dir: self.frames.clone(),
            once: self.once,
            transport: self.transport.clone(),
            raw: self.raw,
            autostart: self.start,
            zone_count: self.zones,
            min_region_area: self.min_area,
            boundary_rule: self.boundary,
        }
    }
}

fn open_transport(config: &ConsoleConfig) -> Result<Box<dyn Transport>> {
    if config.writes_to_stdout() {
        return Ok(Box::new(WriterTransport::new(std::io::stdout(), config.framing())));
    }
    let device = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.transport)
        .with_context(|| format!("opening transport {}", config.transport))?;
    Ok(Box::new(WriterTransport::new(device, config.framing())))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::from_file(path)?,
        None => ConsoleConfig::default(),
    };
    config.apply(cli.overrides());
    info!(?config, "console configured");

    let pipeline = Arc::new(DetectionPipeline::new(config.pipeline.clone())?);
    let source = ImageSequenceSource::new(&config.frame_dir, config.looping);
    let service = VisionService::new(pipeline, source);
    let store = CalibrationStore::new(&config.calibration_path);
    let mut session = ControlSession::new(service, store, open_transport(&config)?);

    let loaded = session.execute(ControlCommand::Load)?;
    eprintln!("{loaded}");
    if config.autostart {
        let reply = session.execute(ControlCommand::Start)?;
        eprintln!("{reply}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        // Stopping joins the worker thread; keep it off the runtime's core threads.
        match tokio::task::block_in_place(|| session.execute_line(line)) {
            Ok(reply) => eprintln!("{reply}"),
            Err(e) => {
                warn!(command = line, error = %e, "command failed");
                eprintln!("error: {e}");
            }
        }
    }

    tokio::task::block_in_place(|| session.execute(ControlCommand::Stop))?;
    info!("console exiting");
    Ok(())
}
