//! mindspace-api - HTTP API server for mindspace

use std::net::SocketAddr;
use std::time::Duration;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mindspace_api::config::{LogConfig, LogFormat, DEFAULT_LOG_FILTER};
use mindspace_api::{create_router, AppState, ServerConfig};
use mindspace_db::{Database, PoolConfig};

/// Install the global tracing subscriber.
///
/// Returns the file writer guard when `LOG_FILE` is set; it must live as long
/// as the process so buffered lines are flushed.
fn init_logging(log: &LogConfig) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log.file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("mindspace-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        match log.format {
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init(),
            LogFormat::Text => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(log.ansi.unwrap_or(false)),
                )
                .init(),
        }
        Some(guard)
    } else {
        match log.format {
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json())
                .init(),
            LogFormat::Text => {
                let mut layer = tracing_subscriber::fmt::layer();
                if let Some(ansi) = log.ansi {
                    layer = layer.with_ansi(ansi);
                }
                registry.with(layer).init();
            }
        }
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    let _file_guard = init_logging(&config.log);

    info!(
        log_format = ?config.log.format,
        log_file = config.log.file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    info!(
        enabled = config.rate_limit.enabled,
        requests = config.rate_limit.requests,
        period_secs = config.rate_limit.period_secs,
        "Rate limiting configured"
    );

    info!("Connecting to database...");
    let db = Database::connect_with_config(
        &config.database_url,
        PoolConfig::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs)),
    )
    .await?
    .with_token_lifetimes(
        chrono::Duration::seconds(config.access_token_ttl_secs),
        chrono::Duration::seconds(config.refresh_token_ttl_secs),
    )
    .with_max_tree_depth(config.max_tree_depth);

    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    let state = AppState::new(db).with_rate_limit(&config.rate_limit);
    let app = create_router(state, &config.allowed_origins);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
