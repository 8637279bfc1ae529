pub mod classify;
pub mod config;
pub mod data;
pub mod nearest;
pub mod processing;
pub mod render;
pub mod scheduler;
pub mod server;
pub mod source;
pub mod store;
pub mod types;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the capacity feed and serve the live dashboard
    Serve {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Verbose logging
        #[arg(long)]
        debug: bool,
    },
    /// Fetch the feed once and print the snapshot as JSON
    Snapshot {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn projector_for(app_config: &config::AppConfig) -> anyhow::Result<processing::Projector> {
    Ok(processing::Projector::new(
        app_config.classifier.build()?,
        app_config.map.color_scale()?,
        app_config.map.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            debug,
        } => {
            init_tracing(debug);
            let mut app_config = config::AppConfig::load(config.as_deref())?;
            if let Some(host) = host {
                app_config.server.host = host;
            }
            if let Some(port) = port {
                app_config.server.port = port;
            }
            info!(url = %app_config.source.url, "Serving rally dashboard");

            let projector = projector_for(&app_config)?;
            let source = source::HttpCsvSource::new(&app_config.source)
                .context("Failed to build HTTP client")?;
            let store = Arc::new(store::SnapshotStore::new());
            let period = app_config.schedule.interval();

            let state = Arc::new(server::AppState {
                store: store.clone(),
                classifier: projector.classifier().clone(),
                scale: projector.scale().clone(),
                period,
            });

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let scheduler = scheduler::Scheduler::new(source, projector, store, period);
            let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

            let signal = async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for ctrl-c: {e}");
                    std::future::pending::<()>().await;
                }
                info!("Shutting down");
                let _ = shutdown_tx.send(true);
            };
            server::start_server(&app_config.server, state, signal).await?;
            scheduler_task.await.context("Scheduler task panicked")?;
        }
        Commands::Snapshot { config } => {
            init_tracing(false);
            let app_config = config::AppConfig::load(config.as_deref())?;
            let projector = projector_for(&app_config)?;
            let source = source::HttpCsvSource::new(&app_config.source)
                .context("Failed to build HTTP client")?;

            let snapshot = scheduler::build_snapshot(&source, &projector)
                .await
                .with_context(|| format!("Failed to build snapshot from {}", source.url()))?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}
