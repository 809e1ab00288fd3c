//! LibMaster Server - digital book lending
//!
//! REST API server for the borrow lifecycle and its notification jobs.

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use libmaster_server::{
    api,
    config::{AppConfig, StorageBackend},
    repository::{MemoryStore, Repository},
    services::{clock::SystemClock, email::EmailService, Scheduler, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("libmaster_server={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting LibMaster Server v{}", env!("CARGO_PKG_VERSION"));

    let repository = match config.database.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await?;

            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations").run(&pool).await?;

            tracing::info!("Database migrations completed");

            Repository::new(pool)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on shutdown");
            let store = match &config.database.seed_file {
                Some(path) => MemoryStore::from_seed_file(path)?,
                None => {
                    tracing::warn!("No seed file configured, memory store starts empty");
                    MemoryStore::new()
                }
            };
            Repository::in_memory(store)
        }
    };

    let notifier = Arc::new(EmailService::new(&config.email)?);
    let clock = Arc::new(SystemClock);

    let services = Services::new(repository, notifier, clock.clone(), &config.notifications);
    let scheduler = Scheduler::start(&services, clock, &config.notifications);

    tracing::info!(
        overdue_sweep_at = %config.notifications.overdue_sweep_at,
        daily_summary_at = %config.notifications.daily_summary_at,
        "Notification jobs scheduled"
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
