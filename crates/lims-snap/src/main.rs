//! lims-snap-inputs - build polygon-snapping inputs from LIMS
//!
//! Prints the assembled payload as JSON on stdout (or to `--output`).
//! Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use lims_rdbc::connection::ConnectionFactory;
use lims_rdbc::postgres::PgConnectionFactory;
use lims_snap::config::LimsConfig;
use lims_snap::LimsInputAssembler;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Assemble polygon-snapping inputs for one image series from LIMS
#[derive(Parser, Debug)]
#[command(name = "lims-snap-inputs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file with LIMS connection parameters
    #[arg(short, long, env = "LIMS_SNAP_CONFIG")]
    config: PathBuf,

    /// Override the focal plane image series id from the config
    #[arg(long)]
    series_id: Option<i64>,

    /// Override the image output root from the config
    #[arg(long)]
    image_output_root: Option<PathBuf>,

    /// Write the payload here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON payload
    #[arg(long)]
    pretty: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = LimsConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if let Some(series_id) = cli.series_id {
        config.focal_plane_image_series_id = series_id;
    }
    if let Some(root) = cli.image_output_root {
        config.image_output_root = Some(root);
    }

    let output_root = config
        .prepare_output_root()
        .context("Failed to prepare image output root")?;

    let conn_config = config.connection_config()?;
    info!(url = %conn_config.redacted_url(), "Connecting to LIMS");
    let conn = PgConnectionFactory
        .connect(&conn_config)
        .await
        .context("Failed to connect to LIMS")?;

    let assembler = LimsInputAssembler::from(conn);
    let series_id = config.focal_plane_image_series_id;
    let payload = assembler
        .assemble(series_id, output_root)
        .await
        .with_context(|| format!("Failed to assemble inputs for image series {}", series_id))?;

    let json = payload.to_json(cli.pretty)?;
    match cli.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote snapping inputs to {}", path.display());
        }
        None => println!("{}", json),
    }

    assembler.engine().close().await?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}
