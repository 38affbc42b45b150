//! Depot server binary.
//!
//! Resolves configuration from the environment, prepares the storage root,
//! then serves the REST adapter over the storage engine.

use depot_engine::{EngineConfig, StorageEngine};
use depot_rest::{router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default JSON body limit. Base64 payload uploads arrive inline, so this is
/// far above axum's 2 MiB default.
const DEFAULT_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Main entry point for the depot server
///
/// Serves the file storage REST API on the configured address
/// (default: 0.0.0.0:3000).
///
/// # Environment Variables
/// - `DEPOT_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `DEPOT_STORAGE_ROOT`: Directory holding stored files (default: "/depot_data")
/// - `DEPOT_PREVIEW_DIR`: Reserved preview folder name (default: ".previews")
/// - `DEPOT_PREVIEW_WIDTH`: Preview width in pixels (default: 320)
/// - `DEPOT_API_KEY`: When set, every request must present it in the `apikey` header
/// - `DEPOT_BODY_LIMIT_BYTES`: JSON body limit (default: 52428800)
/// - `DEPOT_MAGICK_BIN`: ImageMagick convert binary (default: "convert")
/// - `DEPOT_FFMPEG_BIN`: ffmpeg binary (default: "ffmpeg")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the resolved configuration is invalid,
/// - the storage root cannot be created, or
/// - the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("depot_engine=info".parse()?)
                .add_directive("depot_rest=info".parse()?)
                .add_directive("depot_run=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("DEPOT_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let storage_root = PathBuf::from(
        std::env::var("DEPOT_STORAGE_ROOT")
            .unwrap_or_else(|_| depot_engine::DEFAULT_STORAGE_ROOT.into()),
    );
    let preview_dir = std::env::var("DEPOT_PREVIEW_DIR")
        .unwrap_or_else(|_| depot_engine::DEFAULT_PREVIEW_DIR.into());
    let preview_width = match std::env::var("DEPOT_PREVIEW_WIDTH") {
        Ok(raw) => raw.parse()?,
        Err(_) => depot_engine::DEFAULT_PREVIEW_WIDTH,
    };
    let api_key = std::env::var("DEPOT_API_KEY")
        .ok()
        .filter(|key| !key.is_empty());
    let body_limit_bytes = match std::env::var("DEPOT_BODY_LIMIT_BYTES") {
        Ok(raw) => raw.parse()?,
        Err(_) => DEFAULT_BODY_LIMIT_BYTES,
    };
    let magick_bin = std::env::var("DEPOT_MAGICK_BIN").unwrap_or_else(|_| "convert".into());
    let ffmpeg_bin = std::env::var("DEPOT_FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".into());

    std::fs::create_dir_all(&storage_root)?;

    let config = EngineConfig::new(
        storage_root,
        preview_dir,
        preview_width,
        magick_bin,
        ffmpeg_bin,
    )?;

    tracing::info!("++ Starting depot on {}", addr);
    tracing::info!("++ Storage root: {}", config.storage_root().display());
    if api_key.is_some() {
        tracing::info!("++ API key gate enabled");
    }

    let engine = Arc::new(StorageEngine::new(Arc::new(config))?);
    let app = router(AppState::new(engine, api_key), body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
