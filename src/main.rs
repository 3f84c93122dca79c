//! LocalLibrary Server - library catalog
//!
//! Serves the catalog views, the renewal workflow and the REST API.

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use locallibrary_server::{
    api,
    config::{AppConfig, LoggingConfig, SessionBackend, SessionsConfig},
    repository::Repository,
    services::{
        redis::RedisService,
        sessions::{MemorySessionStore, RedisSessionStore, SessionStore},
        Services, SystemClock,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting LocalLibrary Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let sessions = session_store(&config.sessions, &config.redis.url).await?;

    let site_token = config.site.load_token().map(Arc::from);
    if site_token.is_none() {
        tracing::warn!("No site token configured");
    }

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let services = Services::new(
        Repository::new(pool),
        config.auth.clone(),
        sessions,
        Arc::new(SystemClock),
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        site_token,
    };

    let app = api::create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the tracing subscriber: console output in the configured format,
/// plus a daily rolling JSON file when `logging.directory` is set.
fn init_tracing(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("locallibrary_server={},tower_http=debug", logging.level).into());

    let console = match logging.format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };

    let (file, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "locallibrary.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    guard
}

/// Build the visit counter store for the configured backend
async fn session_store(
    sessions: &SessionsConfig,
    redis_url: &str,
) -> anyhow::Result<Arc<dyn SessionStore>> {
    match sessions.backend {
        SessionBackend::Redis => {
            let redis = RedisService::new(redis_url).await?;
            tracing::info!("Connected to Redis");
            Ok(Arc::new(RedisSessionStore::new(redis, sessions.ttl_seconds)))
        }
        SessionBackend::Memory => {
            tracing::info!("Using in-memory session store");
            Ok(Arc::new(MemorySessionStore::new(Duration::from_secs(
                sessions.ttl_seconds,
            ))))
        }
    }
}
