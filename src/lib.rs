// Library exports for the classifieds backend
// The binary and the integration tests both build the router from here.

pub mod app;
pub mod app_config;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use axum::{middleware::from_fn_with_state, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use config::{PlanCatalog, PlanDefinition};
pub use db::{DieselPool, MarketplaceStore, MemoryStore, PgStore};
pub use middleware::{auth_middleware, optional_auth_middleware, AuthenticatedUser};
pub use services::{
    AccountService, JwtConfig, JwtError, JwtService, ListingService, LocalMediaStore, MediaStore,
    SubscriptionService,
};

/// Builds the Postgres-backed state: pool, pending migrations, local media
pub async fn initialize_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    info!("Initializing database pool...");
    let pool = db::create_diesel_pool(db::DieselDatabaseConfig::from(&config.database))
        .await
        .context("Failed to create database pool")?;

    if migrations::should_run_migrations(&config) {
        info!("Running embedded migrations...");
        migrations::run_all_migrations(migrations::MigrationConfig::from(&config))
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    }

    let store: Arc<dyn MarketplaceStore> = Arc::new(PgStore::new(pool));
    let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::from_config(&config.media));

    Ok(AppState::new(
        config,
        store,
        media,
        utils::PasswordConfig::default(),
    ))
}

/// Assembles `/v1`, `/health` and `/media` with CORS and request tracing
pub fn build_router(state: AppState) -> Router {
    let mut api = handlers::public_routes()
        .merge(
            handlers::optional_auth_routes()
                .route_layer(from_fn_with_state(state.clone(), optional_auth_middleware)),
        )
        .merge(
            handlers::protected_routes(&state.config.listings)
                .route_layer(from_fn_with_state(state.clone(), auth_middleware)),
        );

    if state.config.features.enable_openapi {
        api = api.merge(handlers::docs_routes());
    }

    Router::new()
        .nest("/v1", api)
        .route("/health", axum::routing::get(handlers::health::health_check))
        .nest_service("/media", ServeDir::new(&state.config.media.storage_dir))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::dynamic_cors_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
