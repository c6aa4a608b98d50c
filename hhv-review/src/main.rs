//! hhv-review - dataset validation service
//!
//! Serves machine-annotated rows to human reviewers and stores their
//! validated results. Single process; file-backed state under the root
//! folder.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hhv_common::config::{ServiceConfig, TomlConfig};
use hhv_common::ReviewerCategory;
use hhv_review::{build_router, AppState};
use tracing::{info, warn};

/// Command-line arguments for hhv-review
#[derive(Parser, Debug)]
#[command(name = "hhv-review")]
#[command(about = "Validation service for NVC-annotated dataset rows")]
#[command(version)]
struct Args {
    /// Root folder holding Data_refined/ and data_refined_validated/
    #[arg(short, long, env = "HHV_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "HHV_PORT")]
    port: Option<u16>,

    /// TOML config file (default: <config dir>/hhv/hhv-review.toml)
    #[arg(short, long, env = "HHV_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before logging so the TOML log level can apply
    let toml_config = TomlConfig::load_or_default(args.config.as_deref(), "hhv-review")
        .context("Failed to load config file")?;
    let config = ServiceConfig::resolve(args.root_folder, args.port, toml_config)
        .context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=info", config.log_level).into()),
        )
        .init();

    info!(
        "Starting hhv-review v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let paths = config.paths();
    info!("Root folder: {}", paths.root().display());
    for category in ReviewerCategory::ALL {
        for folder in config.folders.folders(category) {
            let source = paths.source_file(folder);
            if source.exists() {
                info!(category = %category, folder = %folder, "Source partition found");
            } else {
                warn!(
                    category = %category,
                    folder = %folder,
                    path = %source.display(),
                    "Source partition missing, folder will be treated as empty"
                );
            }
        }
    }

    let state = AppState::new(paths, config.folders.clone());
    let app = build_router(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("hhv-review listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
