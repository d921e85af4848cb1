use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lekiwi_holonomic_drive::config::DriveConfig;

/// Holonomic drive runtime for the LeKiwi base
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON drive configuration (gains, tolerances, geometry); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Echo commands as measured velocity instead of waiting for wheel feedback
    #[arg(long)]
    loopback: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match DriveConfig::load(path) {
            Ok(config) => {
                info!("Loaded drive config from {}", path.display());
                config
            }
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => DriveConfig::default(),
    };

    if let Err(e) = lekiwi_holonomic_drive::runtime::run(config, args.loopback).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
