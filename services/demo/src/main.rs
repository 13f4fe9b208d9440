//! Actor demo binary
//!
//! Usage:
//!   actor-demo
//!   actor-demo --config config/actors.toml --env dev
//!   actor-demo --max-actors 8 --log-level debug

mod pipeline;

use actor_config::RuntimeConfig;
use actor_runtime::{ActorError, ActorSystem};
use anyhow::Result;
use clap::Parser;
use pipeline::Pipeline;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "actor-demo")]
#[command(about = "Runs a small actor pipeline and shuts it down gracefully")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment override file under config/environments
    #[arg(short, long)]
    env: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Override the actor ceiling
    #[arg(long)]
    max_actors: Option<usize>,

    /// How long the encoder waits before forwarding
    #[arg(long, default_value_t = 200)]
    encode_delay_ms: u64,

    /// Text fed to the encoder and decoder
    #[arg(long, default_value = "Rajendra")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RuntimeConfig::load(args.config.as_deref(), args.env.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }
    if let Some(max_actors) = args.max_actors {
        config.system.max_actors = max_actors;
        config.validate()?;
    }

    init_logging(&config)?;
    info!("Starting actor demo");

    let system = ActorSystem::with_settings(config.system_settings());
    info!(system_id = %system.system_id(), max_actors = system.max_actors(), "Actor system ready");

    let pipeline = Pipeline::register(&system, Duration::from_millis(args.encode_delay_ms))
        .map_err(|e| {
            error!("Failed to register pipeline: {}", e);
            e
        })?;

    if let Err(e) = pipeline.seed(&system, &args.name) {
        warn!("Seeding stopped early: {}", e);
    }

    let status = system.shutdown();
    info!("Shutdown requested");

    // External traffic is refused from here on
    match system.send_message(&pipeline.printer, "This is the message after shutdown") {
        Err(ActorError::SystemOffline) => {
            info!("Post-shutdown send rejected: system is offline")
        }
        Err(e) => warn!("Post-shutdown send failed unexpectedly: {}", e),
        Ok(_) => warn!("Post-shutdown send was accepted"),
    }

    let clean = status.await;
    let stats = system.stats();
    info!(
        clean,
        processed = stats.messages_processed,
        failures = stats.handler_failures,
        journal_lines = pipeline.journal().len(),
        "Actor system stopped"
    );

    if !clean {
        error!("Shutdown was forced; some messages were dropped");
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(config: &RuntimeConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true);

    let result = if config.logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
