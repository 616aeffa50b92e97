//! Market-making controller entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MM_CONFIG env var).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    mm_telemetry::init_logging()?;

    let args = Args::parse();
    info!("Starting mm-bot v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.config {
        Some(path) => mm_bot::AppConfig::from_file(&path)?,
        None => mm_bot::AppConfig::load()?,
    };

    let mut app = mm_bot::Application::new(config)?;

    info!("Running reconciliation...");
    app.run_preflight()?;

    app.run().await?;

    Ok(())
}
