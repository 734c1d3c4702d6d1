//! relayd - a minimal TCP reverse proxy
//!
//! Usage:
//!     relayd --config <path>
//!
//! See --help for more options.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use relayd::backend::strategy::make_strategy;
use relayd::backend::{BackendRegistry, Selector};
use relayd::config::{Config, load_config};
use relayd::health::TcpProber;
use relayd::listener::Listener;
use relayd::util::{ShutdownSignal, init_logging, wait_for_signal};

/// A minimal TCP reverse proxy with per-connection liveness probing.
#[derive(Parser, Debug)]
#[command(name = "relayd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(&cli.config).with_context(|| {
        format!(
            "failed to load configuration from '{}'",
            cli.config.display()
        )
    })?;

    // Determine log level (CLI overrides config)
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.global.log_level);

    // Initialize logging
    init_logging(log_level, &config.global.log_format);

    // If --validate flag, just validate and exit
    if cli.validate {
        info!("Configuration is valid");
        println!("Configuration is valid.");
        println!("  Listen:   {}", config.proxy.listen);
        println!("  Strategy: {:?}", config.proxy.strategy);
        println!("  Backends: {}", config.backends.len());
        for backend in &config.backends {
            println!("    - {}:{}", backend.host, backend.port);
        }
        return Ok(());
    }

    // Log startup information
    info!(
        config_path = %cli.config.display(),
        listen = %config.proxy.listen,
        strategy = ?config.proxy.strategy,
        backends = config.backends.len(),
        "relayd starting"
    );

    for backend in &config.backends {
        info!(host = %backend.host, port = backend.port, "configured backend");
    }

    // Run the proxy
    run(config)
}

/// Run the proxy with the given configuration.
fn run(config: Config) -> Result<()> {
    // Create tokio runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(async { run_async(config).await })
}

/// Async entry point for the proxy.
async fn run_async(config: Config) -> Result<()> {
    let shutdown = ShutdownSignal::new();

    // Build the backend registry and selector
    let registry = Arc::new(BackendRegistry::from_config(&config.backends));
    let prober = TcpProber::new(config.proxy.probe_timeout);
    let strategy = make_strategy(config.proxy.strategy);
    let selector = Arc::new(Selector::new(registry, strategy, prober));

    // Bind the listener; a bind failure is fatal
    let listener = Listener::bind(&config.proxy, selector)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.proxy.listen))?;

    let handle = tokio::spawn(listener.run(shutdown.subscribe()));

    info!("relayd is running");
    info!("press Ctrl+C to stop");

    // Wait for SIGINT/SIGTERM
    wait_for_signal().await;

    // Stop accepting and let in-flight sessions drain
    shutdown.shutdown();
    let _ = handle.await;

    info!("relayd shut down complete");
    Ok(())
}
