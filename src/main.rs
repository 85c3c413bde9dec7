//! `hybrid-orchestrator` command-line front end.
//!
//! Routes single queries, reports node status and exports the config schema.
//! Results are printed to stdout as JSON; logs go to stderr.
//!
//! ## Environment Variables
//!
//! - `HYBRID_ORCHESTRATOR_CONFIG` - path to the TOML config
//! - `ANTHROPIC_API_KEY` - remote layer credentials (unless `--echo`)
//! - `LOG_FORMAT=json` - structured JSON logs, overrides the config file
//! - `RUST_LOG=info` - log level filter

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hybrid_layer_orchestrator::config::{self, loader};
use hybrid_layer_orchestrator::metrics::exporter;
use hybrid_layer_orchestrator::{
    init_tracing_with, metrics_server, Collaborators, LogFormat, Orchestrator,
    OrchestratorConfig, RouteOptions,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "hybrid-orchestrator")]
#[command(
    about = "Route inference requests between a local runtime and a remote API",
    long_about = None
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(long, global = true, env = "HYBRID_ORCHESTRATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Use in-process echo collaborators instead of ollama and the remote API
    #[arg(long, global = true)]
    echo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route one query and print the result
    Route {
        /// Query text
        query: String,
        /// Priority: high, medium (default), low
        #[arg(long)]
        priority: Option<String>,
        /// Sensitivity: public, private (default), critical
        #[arg(long)]
        sensitivity: Option<String>,
        /// Complexity: simple, moderate, complex (estimated when omitted)
        #[arg(long)]
        complexity: Option<String>,
        /// Caller context entry, repeatable
        #[arg(long = "context", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        context: Vec<(String, String)>,
    },

    /// Sample the local node and print status with metrics
    Status,

    /// Serve /metrics, /health and /status until Ctrl-C
    Serve {
        /// Listen address; defaults to 0.0.0.0 on observability.metrics_port (or 9090)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Print the JSON Schema of the configuration file
    Schema,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' in '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Schema = cli.command {
        println!("{}", config::export_schema()?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => loader::load_from_file(path)?,
        None => OrchestratorConfig::default(),
    };

    let log_format = std::env::var("LOG_FORMAT")
        .map(|v| LogFormat::from_label(&v))
        .unwrap_or(config.observability.log_format);
    let _ = init_tracing_with(log_format);

    exporter::init_metrics()?;

    let collaborators = if cli.echo {
        Collaborators::echo()
    } else {
        Collaborators::from_config(&config)?
    };
    let orchestrator = Arc::new(Orchestrator::new(&config, collaborators));

    match cli.command {
        Commands::Route {
            query,
            priority,
            sensitivity,
            complexity,
            context,
        } => {
            let mut options = RouteOptions::new();
            options.priority = priority;
            options.sensitivity = sensitivity;
            options.complexity = complexity;
            options.context = context.into_iter().collect();

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let result = orchestrator
                .route_with_cancel(&query, options, &cancel)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&orchestrator.status().await)?);
        }
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| {
                format!(
                    "0.0.0.0:{}",
                    config.observability.metrics_port.unwrap_or(9090)
                )
            });

            let shutdown = CancellationToken::new();
            let monitor = orchestrator.start_monitor(shutdown.clone());
            let server = {
                let addr = addr.clone();
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    if let Err(e) = metrics_server::start_server(&addr, orchestrator).await {
                        tracing::error!(error = %e, "metrics server stopped");
                    }
                })
            };
            info!(%addr, "serving; press Ctrl-C to stop");

            tokio::signal::ctrl_c().await?;
            info!("shutdown requested");
            shutdown.cancel();
            server.abort();
            let _ = monitor.await;
        }
        Commands::Schema => {}
    }

    Ok(())
}
