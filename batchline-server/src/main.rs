//! # batchline server
//!
//! Accepts bulk ingestion requests over HTTP, splits them into batches of at
//! most three records, and drains them in priority order through a single
//! rate-limited worker loop.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use batchline_config::{
    Config, ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigOverrides, ConfigWarnings,
    SchedulerConfigSource,
};
use batchline_core::IngestionService;
use batchline_server::{
    AppState, create_app,
    infra::{shutdown, telemetry},
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "batchline-server")]
#[command(about = "Priority batch ingestion service with a rate-limited drain loop")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Pause after each batch, in milliseconds (overrides config)
    #[arg(long, env = "RATE_LIMIT_INTERVAL_MS")]
    rate_limit_ms: Option<u64>,

    /// Configuration file (TOML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// `.env` file to load instead of the default lookup
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load and validate configuration, print the effective values as JSON
    /// and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::CheckConfig) => check_config(&cli.serve),
        None => run_server(cli.serve).await,
    }
}

fn load_config(args: &ServeArgs) -> anyhow::Result<ConfigLoad> {
    ConfigLoader::with_options(ConfigLoaderOptions {
        config_path: args.config.clone(),
        env_file: args.env_file.clone(),
        overrides: ConfigOverrides {
            host: args.host.clone(),
            port: args.port,
            rate_limit_interval_ms: args.rate_limit_ms,
        },
        ..ConfigLoaderOptions::default()
    })
    .load()
    .context("failed to load configuration")
}

#[derive(Serialize)]
struct CheckConfigReport<'a> {
    config: &'a Config,
    warnings: &'a ConfigWarnings,
}

fn check_config(args: &ServeArgs) -> anyhow::Result<()> {
    let ConfigLoad { config, warnings } = load_config(args)?;
    let report = CheckConfigReport {
        config: &config,
        warnings: &warnings,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to render configuration")?
    );
    Ok(())
}

fn log_config(config: &Config, warnings: &ConfigWarnings) {
    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }

    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }

    match &config.metadata.scheduler_source {
        SchedulerConfigSource::Default => {}
        SchedulerConfigSource::File(path) => {
            info!(path = %path.display(), "scheduler config loaded from file")
        }
        SchedulerConfigSource::EnvInline => {
            info!("scheduler config loaded from inline environment json")
        }
    }

    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    let processor = &config.scheduler.processor;
    info!(
        scheduler.rate_limit_ms = config.scheduler.rate_limit_interval_ms,
        processor.latency_ms = processor.simulated_latency_ms,
        processor.timeout_ms = ?processor.timeout_ms,
        processor.max_attempts = processor.max_attempts,
        "scheduler configuration in effect"
    );
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let ConfigLoad { config, warnings } = load_config(&args)?;

    telemetry::init_tracing();
    log_config(&config, &warnings);

    let shutdown_token = CancellationToken::new();
    shutdown::spawn_signal_listener(shutdown_token.clone());

    let service = IngestionService::with_simulated_processor(&config.scheduler);
    let drain_loop = service
        .start(shutdown_token.child_token())
        .context("failed to start drain loop")?;

    let address = config.bind_address();
    let state = AppState::new(service, Arc::new(config));
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, "batchline server listening");

    let serve_token = shutdown_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { serve_token.cancelled().await })
        .await
        .context("HTTP server failed")?;

    shutdown_token.cancel();
    if let Err(err) = drain_loop.await {
        warn!(error = %err, "drain loop ended abnormally");
    }

    info!("batchline server stopped");
    Ok(())
}
