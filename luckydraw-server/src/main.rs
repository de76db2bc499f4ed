//! Lucky Draw Server
//!
//! Runs lucky draw events for a chat gateway: activation, joins, timed and
//! threshold draws, and signed notifications back to the gateway.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use luckydraw_core::config::ConfigStore;
use luckydraw_core::events::notification_channel;
use luckydraw_core::processors::{NotificationSender, ResolutionEngine, TriggerScheduler};
use luckydraw_core::store::{EventStore, MemoryEventStore, PgEventStore};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use time_tz::TimeZone;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Lucky Draw - event scheduling and prize draws for chat groups
#[derive(Parser, Debug)]
#[command(name = "luckydraw-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./luckydraw.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Keep everything in memory instead of PostgreSQL (state is lost on exit)
    #[arg(long, default_value = "false")]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting luckydraw-server v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    let draw_settings = loaded_config.draw;
    tracing::info!(
        timezone = draw_settings.timezone.name(),
        "Configuration loaded from {:?}",
        args.config
    );

    let (shared_config, notifier) = loaded_config.into_shared();
    let notifier_config = ConfigStore::new(notifier);

    let db_pool = if args.memory {
        tracing::warn!("Running with the in-memory store; events are lost on exit");
        None
    } else {
        Some(connect_database(args.migrate).await?)
    };
    let store: Arc<dyn EventStore> = match &db_pool {
        Some(pool) => Arc::new(PgEventStore::new(pool.clone())),
        None => Arc::new(MemoryEventStore::new()),
    };

    let (notification_tx, notification_rx) = notification_channel();
    let engine = Arc::new(ResolutionEngine::new(store.clone(), notification_tx));
    let scheduler = TriggerScheduler::new(store.clone(), engine.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Resolves whatever came due while the process was down.
    match scheduler.reconcile_all().await {
        Ok(report) => tracing::info!(?report, "Startup reconciliation finished"),
        Err(e) => tracing::error!(error = %e, "Startup reconciliation failed, retrying on resync"),
    }

    let scheduler_task = tokio::spawn(
        scheduler
            .clone()
            .run(shutdown_rx.clone(), draw_settings.resync_interval),
    );
    let sender_task = tokio::spawn(
        NotificationSender::new(notification_rx, shutdown_rx, notifier_config.clone()).run(),
    );

    let state = AppState::new(store, engine, scheduler, shared_config);

    let reload_notify = spawn_config_reload_handler(state.clone(), config_loader, notifier_config);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    reload_notify.notify_one();
    let _ = shutdown_tx.send(true);
    for (name, task) in [("scheduler", scheduler_task), ("notification sender", sender_task)] {
        if let Err(e) = task.await {
            tracing::error!(task = name, error = %e, "Background task ended abnormally");
        }
    }

    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

async fn connect_database(migrate: bool) -> anyhow::Result<PgPool> {
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    Ok(pool)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
