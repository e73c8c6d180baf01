//! lokvaani-pipeline - consultation comment pipeline service
//!
//! Runs the ingestion scheduler, analysis worker, health monitor and realtime
//! broadcaster as background tasks, and serves the HTTP API (statistics,
//! snapshots, manual submission, policy assistant, SSE).

use anyhow::{Context, Result};
use clap::Parser;
use lokvaani_common::config::load_bootstrap_config;
use lokvaani_common::db::init_database;
use lokvaani_pipeline::config::PipelineConfig;
use lokvaani_pipeline::services::Services;
use lokvaani_pipeline::workers::{AnalysisWorker, HealthMonitor, IngestionScheduler};
use lokvaani_pipeline::AppState;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for lokvaani-pipeline
#[derive(Parser, Debug)]
#[command(name = "lokvaani-pipeline")]
#[command(about = "Consultation comment ingestion, analysis and query service")]
#[command(version)]
struct Args {
    /// Bootstrap TOML config file
    #[arg(short, long, env = "LOKVAANI_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (host:port), overrides the config file
    #[arg(short, long, env = "LOKVAANI_BIND")]
    bind: Option<String>,

    /// Port to listen on, overrides the port of the bind address
    #[arg(short, long, env = "LOKVAANI_PORT")]
    port: Option<u16>,

    /// SQLite database file, overrides the config file
    #[arg(short, long, env = "LOKVAANI_DATABASE")]
    database: Option<PathBuf>,

    /// Do not run the synthetic comment generator
    #[arg(long, env = "LOKVAANI_DISABLE_INGESTION")]
    disable_ingestion: bool,
}

fn bind_address(configured: &str, bind: Option<String>, port: Option<u16>) -> String {
    let addr = bind.unwrap_or_else(|| configured.to_string());
    match port {
        Some(port) => {
            let host = addr.rsplit_once(':').map(|(host, _)| host).unwrap_or(&addr);
            format!("{}:{}", host, port)
        }
        None => addr,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_bootstrap_config(args.config.as_deref()).context("Failed to load configuration")?;

    let level = &toml_config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("lokvaani_pipeline={level},lokvaani_common={level},tower_http=info").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lokvaani-pipeline v{}", env!("CARGO_PKG_VERSION"));

    let db_path = args.database.clone().unwrap_or_else(|| toml_config.database_path.clone());
    info!("Database: {}", db_path.display());
    let db = init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let config = PipelineConfig::from_toml(&toml_config);
    let services = Services::http(&toml_config.services, &toml_config.agent)
        .context("Failed to build service clients")?;

    let state = AppState::new(db.clone(), &services, &config);
    let cancel = state.shutdown.clone();
    let mut tasks = Vec::new();

    if args.disable_ingestion {
        info!("Ingestion scheduler disabled");
    } else {
        let ingestion = IngestionScheduler::new(
            db.clone(),
            services.generator.clone(),
            config.generator_policy,
            config.comments_per_run,
            config.ingestion_interval,
        );
        tasks.push(tokio::spawn(ingestion.run(cancel.clone())));
    }

    let analysis = AnalysisWorker::new(
        db.clone(),
        services.analyzer.clone(),
        config.analyzer_policy,
        state.completion_registry(),
        config.analysis,
    );
    tasks.push(tokio::spawn(analysis.run(cancel.clone())));

    let health = HealthMonitor::new(db.clone(), config.analysis.max_attempts, config.health_interval);
    tasks.push(tokio::spawn(health.run(cancel.clone())));

    tasks.push(tokio::spawn(state.broadcast.clone().run(cancel.clone())));

    let app = lokvaani_pipeline::build_router(state);

    let addr = bind_address(&toml_config.bind_addr, args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("Server error");

    // Already cancelled unless the server itself failed
    cancel.cancel();
    info!("Waiting for background workers");
    for task in tasks {
        if let Err(e) = task.await {
            error!("Worker task ended abnormally: {}", e);
        }
    }
    db.close().await;

    server?;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
///
/// Cancels `cancel` once a signal arrives, so workers stop and SSE streams
/// end while the server drains connections. Also returns if `cancel` fires
/// from elsewhere.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
        _ = cancel.cancelled() => {},
    }
    cancel.cancel();
}
