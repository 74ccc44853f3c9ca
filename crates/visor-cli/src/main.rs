use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod config;
mod hud;
mod session;
mod view;

use config::Config;
use session::{SessionOptions, SnapshotMode};
use visor_core::{DetectionAnnotator, DetectorOptions, LandmarkAnnotator, LandmarkerOptions};
use visor_hw::Camera;

#[derive(Parser)]
#[command(name = "visor", about = "Visor — annotated live camera viewer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Face detection view: bounding boxes with confidence scores
    Detect,
    /// Face landmark view: dense facial landmark points
    Landmark,
    /// List available capture devices
    Devices {
        /// Emit the device list as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect => {
            let config = Config::load();
            let detector = DetectorOptions::new(config.detector_model_path());
            let mut annotator = DetectionAnnotator::new(&detector)
                .context("failed to initialize the face detector")?;
            session::run(
                &config,
                &mut annotator,
                &SessionOptions {
                    title: "Visor — Face Detection",
                    snapshot_mode: SnapshotMode::Composed,
                },
            )
        }
        Commands::Landmark => {
            let config = Config::load();
            let detector = DetectorOptions::new(config.detector_model_path());
            let landmarker = LandmarkerOptions::new(config.landmark_model_path());
            let mut annotator = LandmarkAnnotator::new(&detector, &landmarker)
                .context("failed to initialize the face landmarker")?;
            session::run(
                &config,
                &mut annotator,
                &SessionOptions {
                    title: "Visor — Face Landmarks",
                    snapshot_mode: SnapshotMode::Reannotated,
                },
            )
        }
        Commands::Devices { json } => list_devices(json),
    }
}

fn list_devices(json: bool) -> Result<()> {
    let devices = Camera::list_devices();

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No capture devices found");
        return Ok(());
    }

    println!("{:<14} | {:<32} | {:<12}", "Path", "Name", "Driver");
    println!("{}", "-".repeat(64));
    for dev in devices {
        println!("{:<14} | {:<32} | {:<12}", dev.path, dev.name, dev.driver);
    }
    Ok(())
}
