//! # Photobooth
//!
//! Runs one self-service photo kiosk session from the command line.
//!
//! ## Overview
//!
//! The binary replays a directory of captured photos through the session core:
//! - Session start, capture sequencing and completion
//! - Optional photo filter and looping animation (MP4, falling back to GIF)
//! - Composed display/print image tracking
//! - Auto-clear after completion
//!
//! Every lifecycle event is logged as JSON.
//!
//! ## Architecture
//!
//! This is Layer 3 - the binary that ties together:
//! - photobooth-core: Core types and collaborator contracts
//! - photobooth-media: Animation generation and filtering
//! - photobooth-session: Session lifecycle

use clap::Parser;
use photobooth::{
    build_controller, collect_photos, operator_message, replay, Args, Ffmpeg, ReplayPlan,
};
use photobooth_core::BoothConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BoothConfig::from_file(path)?,
        None => BoothConfig::default(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    tracing::info!("Photobooth v{} starting...", env!("CARGO_PKG_VERSION"));

    let photos = collect_photos(&args.photos)?;
    if photos.is_empty() {
        anyhow::bail!("no photos found in {}", args.photos.display());
    }
    let total_photos = args.count.unwrap_or(config.session.default_photo_count);
    tracing::info!(
        "Replaying {} photos from {} ({} required)",
        photos.len(),
        args.photos.display(),
        total_photos
    );

    let (controller, store) = build_controller(config, Ffmpeg::new(&args.ffmpeg));
    let plan = ReplayPlan {
        photos,
        event: args.event_ref(),
        template: args.template,
        total_photos,
        filter: args.filter,
        composed: args.composed,
        print: args.print,
        wait_auto_clear: args.wait_auto_clear,
    };

    let report = replay(controller, plan).await.map_err(|e| {
        tracing::error!("{}", operator_message(&e));
        e
    })?;

    if let Some(snapshot) = &report.snapshot {
        tracing::info!(
            "Session {} finished: {}/{} photos, animation: {}",
            snapshot.session_id,
            snapshot.photos_captured,
            snapshot.total_photos,
            report
                .animation
                .as_ref()
                .map(|a| a.animation_path.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }
    tracing::info!("Journal written to {}", store.path().display());
    tracing::info!("Photobooth shutting down");

    Ok(())
}
