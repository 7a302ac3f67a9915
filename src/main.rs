//! storsync - Azure Storage account reconciler
//!
//! Command-line entry point: parses arguments, sets up logging and
//! configuration, and dispatches to the selected command.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use storsync::cli::Cli;
use storsync::config::{self, Config};
use storsync::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Validation happens once flag overrides are applied
    let config = match config::load_config().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(cli.debug_enabled(&config));

    if let Err(e) = run(cli, config).await {
        error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    info!("Starting storsync");
    cli.execute(config).await
}

fn init_logging(debug: bool) {
    let default_level = if debug { "storsync=debug" } else { "storsync=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    let json = std::env::var("STORSYNC_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
