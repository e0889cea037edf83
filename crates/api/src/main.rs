use std::net::SocketAddr;
use std::sync::Arc;

use remedy_core::catalog::DirectoryCatalog;
use remedy_core::checkpoint::{CheckpointStore, FileCheckpointStore};
use remedy_core::flow::FlowResolver;
use remedy_core::scripting::{RuntimeConfig, ScriptRunner};
use remedy_pipeline::FlowEngine;
use remedy_ticketing::{TableApiClient, TicketingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remedy_api::config::ServerConfig;
use remedy_api::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "remedy_api=debug,remedy_pipeline=debug,remedy_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let runtime = RuntimeConfig::from_env();
    tracing::info!(
        python = %runtime.python_bin,
        node = %runtime.node_bin,
        powershell = %runtime.powershell_bin,
        timeout_secs = runtime.script_timeout.map(|t| t.as_secs()),
        "Loaded script runtime configuration",
    );

    // --- Flow table ---
    let resolver = FlowResolver::from_path(&config.flow_mapping_path)?;
    tracing::info!(
        path = %config.flow_mapping_path.display(),
        flows = resolver.len(),
        "Flow mapping loaded",
    );

    // --- Ticketing ---
    let ticketing_config = TicketingConfig::from_env()?;
    tracing::info!(base_url = %ticketing_config.base_url, "Ticketing client configured");
    let tickets = Arc::new(TableApiClient::new(ticketing_config)?);

    // --- Checkpoints ---
    let (checkpoints, pool) = match &config.database_url {
        Some(database_url) => {
            let pool = remedy_db::create_pool(database_url).await?;
            tracing::info!("Database connection pool created");

            remedy_db::health_check(&pool).await?;
            tracing::info!("Database health check passed");

            remedy_db::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            let unfinished =
                remedy_db::repositories::FlowCheckpointRepo::list_unfinished(&pool).await?;
            if !unfinished.is_empty() {
                tracing::warn!(
                    count = unfinished.len(),
                    tickets = ?unfinished.iter().map(|r| r.ticket_id.as_str()).collect::<Vec<_>>(),
                    "Unfinished runs found; they resume on their next trigger",
                );
            }

            let store: Arc<dyn CheckpointStore> =
                Arc::new(remedy_db::PgCheckpointStore::new(pool.clone()));
            (store, Some(pool))
        }
        None => {
            tracing::info!(dir = %config.checkpoint_dir.display(), "Using file checkpoints");
            let store: Arc<dyn CheckpointStore> =
                Arc::new(FileCheckpointStore::new(config.checkpoint_dir.clone()));
            (store, None)
        }
    };

    // --- Engine ---
    let engine = FlowEngine::new(
        resolver,
        Arc::new(DirectoryCatalog::new(config.use_cases_dir.clone())),
        ScriptRunner::new(&runtime),
        tickets,
        checkpoints,
    );

    // --- App state ---
    let state = AppState {
        engine: Arc::new(engine),
        config: Arc::new(config.clone()),
        pool,
    };

    let app = remedy_api::build_app(state);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
