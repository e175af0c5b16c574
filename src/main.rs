use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vservo::actuator::ActuatorKind;
use vservo::config::Config;
use vservo::detect::BlobDetector;
use vservo::error::VservoError;
use vservo::render::FrameSink;
use vservo::runner::{ControlLoop, DetectionTunables};
use vservo::source::{CameraSource, ImageSource, SourceKind};

#[derive(Parser)]
#[command(version, about = "Closed-loop visual servoing object tracker", long_about = None, name = "vservo")]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vservo=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_file(&args.config)?;
    info!(
        "Starting with detection profile '{}', tolerance {} px",
        config.cascade_name, config.offset
    );

    // Exactly one media source per run; conflicts are fatal, never resolved
    // silently.
    let source = match (config.camera.enabled, config.image.enabled) {
        (true, true) => return Err(VservoError::ConfigurationConflict.into()),
        (false, false) => return Err(VservoError::NoMediaSource.into()),
        (true, false) => SourceKind::from(CameraSource::open(
            config.camera.index,
            &config.camera.url,
            config.window.width,
            config.window.height,
        )?),
        (false, true) => SourceKind::from(ImageSource::new(&config.image.path)),
    };

    let actuator = ActuatorKind::from_config(&config);
    let detector = BlobDetector::new(config.detection.threshold);
    let sink = FrameSink::from_config(&config.output);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = stop.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping after the current cycle");
                stop_signal.store(true, Ordering::Relaxed);
            }
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
    });

    let tunables = DetectionTunables {
        scale_factor: config.detection.scale_factor,
        min_neighbors: config.detection.min_neighbors,
    };
    let mut control = ControlLoop::new(source, detector, actuator, config.offset, tunables, stop)
        .with_sink(sink);

    // The loop blocks on device reads; keep it off the async workers.
    tokio::task::spawn_blocking(move || control.run())
        .await
        .into_diagnostic()??;

    info!("Shutdown complete");
    Ok(())
}
