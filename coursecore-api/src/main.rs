//! Service binary: configuration, tracing, pool, migrations, listener.

use std::sync::Arc;

use anyhow::Context;
use coursecore_api::{router, ApiConfig, AppState};
use coursecore_postgres::PostgresStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ApiConfig::from_env().context("failed to load configuration")?;

    let store = PostgresStore::with_config(config.database_url.as_str(), config.postgres.clone())
        .await
        .context("failed to connect to postgres")?;
    store.migrate().await.context("failed to run migrations")?;

    let state = AppState::from_backend(Arc::new(store));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
