use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cineplex_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache},
    routes::{create_router, AppState},
    services::providers::{CatalogProvider, TmdbProvider},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,cineplex_api=debug")),
        )
        .init();

    info!("Starting cineplex-api v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        database = config.database_url.is_some(),
        redis = config.redis_url.is_some(),
        tmdb_api_url = %config.tmdb_api_url,
        tmdb_timeout_secs = config.tmdb_timeout_secs,
        "Loaded configuration"
    );

    // Optional catalog response cache
    let (cache, cache_writer) = match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url).context("Invalid REDIS_URL")?;
            let (cache, handle) = Cache::new(client);
            (Some(cache), Some(handle))
        }
        None => {
            info!("REDIS_URL not set, catalog responses are not cached");
            (None, None)
        }
    };

    let provider: Arc<dyn CatalogProvider> = Arc::new(TmdbProvider::from_config(&config, cache)?);
    info!(provider = provider.name(), "Catalog provider ready");

    let state = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url, config.db_max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            AppState::postgres(provider, pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            AppState::in_memory(provider)
        }
    };

    let cors_origin = config.cors_allowed_origin()?;
    if cors_origin.is_none() {
        tracing::warn!("CORS_ORIGIN not set, allowing any browser origin");
    }
    let app = create_router(state, cors_origin);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
