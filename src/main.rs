use tracing_subscriber::EnvFilter;

use recycle_bin_api::{config, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, RECYCLE_* etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting recycle bin API in {:?} mode", config.environment);

    let state = router::build_state(config).await?;
    let app = router::app_with_config(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Recycle bin API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
