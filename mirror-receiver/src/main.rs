//! Mirror receiver entry point.
//!
//! ```text
//! mirror-receiver                  Run in the foreground
//! mirror-receiver --config <path>  Load a custom config TOML
//! mirror-receiver --gen-config     Write default config to stdout
//! mirror-receiver --name <name>    Override the advertised name
//! mirror-receiver --dump <path>    Append video payloads to a file
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mirror_receiver::config::ReceiverFileConfig;
use mirror_receiver::service::ReceiverService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mirror-receiver", about = "Screen-mirroring receiver")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "mirror-receiver.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Display name shown to senders.
    #[arg(short, long)]
    name: Option<String>,

    /// File to append decrypted video payloads to.
    #[arg(long)]
    dump: Option<PathBuf>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ReceiverFileConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let (mut config, fallback) = match ReceiverFileConfig::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (ReceiverFileConfig::default(), Some(e)),
    };
    if let Some(name) = cli.name {
        config.device.name = name;
    }
    if let Some(dump) = cli.dump {
        config.video.dump_path = dump.display().to_string();
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match fallback {
        Some(e) if e.is_missing() => info!("{e}; using defaults"),
        Some(e) => warn!("{e}; using defaults"),
        None => info!("loaded config from {}", cli.config.display()),
    }
    info!("mirror-receiver v{}", env!("CARGO_PKG_VERSION"));
    info!("device name: {}", config.device.name);
    info!("max sessions: {}", config.network.max_sessions);

    let service = ReceiverService::new(&config)?;
    service
        .run(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Ctrl-C received, shutting down");
        })
        .await?;

    Ok(())
}
