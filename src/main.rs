use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classifieds_backend::{
    app_config, build_router, db::diesel_pool::mask_connection_string, initialize_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before the configuration is read
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classifieds_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = app_config::config().clone();
    info!(
        "Starting classifieds backend ({}) on {}",
        config.environment, config.server.bind_address
    );
    info!("Database URL: {}", mask_connection_string(&config.database.url));

    let bind_address = config.server.bind_address.clone();
    let state = initialize_app_state(config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    info!("Listening on {}", bind_address);
    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
