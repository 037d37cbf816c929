// HTTP handlers and route builders
// Route groups differ only in the authentication layer applied by `build_router`.

pub mod auth;
pub mod categories;
pub mod docs;
pub mod health;
pub mod listings;
pub mod subscriptions;

use crate::{app::AppState, app_config::ListingConfig};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

/// Slack for multipart boundaries and part headers on top of the image bytes
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// Routes that need no identity
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/categories", get(categories::list_categories))
        .route("/listings", get(listings::browse_listings))
}

// Routes whose response depends on who is asking
pub fn optional_auth_routes() -> Router<AppState> {
    Router::new().route("/listings/{id}", get(listings::show_listing))
}

// Routes that require a valid access token
pub fn protected_routes(listing_config: &ListingConfig) -> Router<AppState> {
    let upload_limit = listing_config
        .max_images
        .saturating_mul(listing_config.max_image_bytes)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/listings", post(listings::create_listing))
        .route("/listings/eligibility", get(listings::listing_eligibility))
        .route(
            "/listings/{id}",
            put(listings::update_listing)
                .patch(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route("/listings/{id}/edit", get(listings::edit_listing))
        .route(
            "/listings/{id}/images",
            post(listings::upload_listing_images).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/listings/{id}/images/{image_id}",
            delete(listings::delete_listing_image),
        )
        .route("/my-listings", get(listings::my_listings))
        .route("/subscriptions", get(subscriptions::subscription_overview))
        .route("/subscriptions/plans/{plan}", get(subscriptions::plan_details))
        .route(
            "/subscriptions/upgrade",
            post(subscriptions::upgrade_subscription),
        )
        .route("/subscriptions/cancel", post(subscriptions::cancel_subscription))
}

pub fn docs_routes() -> Router<AppState> {
    Router::new().route("/docs/openapi.json", get(docs::serve_openapi_spec))
}
