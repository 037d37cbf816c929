// OpenAPI document for the marketplace API, served as JSON when enabled

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    config::PlanDefinition,
    handlers::{auth, categories, health, listings, subscriptions},
    models::{
        AccountType, AuthResponse, Category, Condition, CreateListingRequest, Currency,
        CurrentUserResponse, Listing, ListingImageResponse, ListingStatus, LoginRequest, PlanKind,
        RegisterRequest, Subscription, UpdateListingRequest, UpgradeSubscriptionRequest,
        UserProfile,
    },
    services::{
        listing::{
            CreateEligibility, ListingDetail, ListingEditView, ListingPage, ListingWithImages,
            MyListingsPage,
        },
        listing_query::{ListingQueryParams, Pagination},
        subscription::{QuotaStatus, SubscriptionOverview, UpgradePreview},
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let mut bearer = Http::new(HttpAuthScheme::Bearer);
            bearer.bearer_format = Some("JWT".to_string());
            bearer.description = Some("Access token from /v1/auth/login".to_string());
            components.add_security_scheme("bearerAuth", SecurityScheme::Http(bearer));
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Classifieds Marketplace API",
        version = "1.0.0",
        description = "Listings for go-karts, parts and gear with plan-based listing quotas"
    ),
    paths(
        auth::register,
        auth::login,
        auth::get_current_user,
        categories::list_categories,
        listings::browse_listings,
        listings::show_listing,
        listings::listing_eligibility,
        listings::create_listing,
        listings::edit_listing,
        listings::update_listing,
        listings::delete_listing,
        listings::upload_listing_images,
        listings::delete_listing_image,
        listings::my_listings,
        subscriptions::subscription_overview,
        subscriptions::plan_details,
        subscriptions::upgrade_subscription,
        subscriptions::cancel_subscription,
        health::health_check,
    ),
    components(schemas(
        AccountType,
        AuthResponse,
        Category,
        Condition,
        CreateEligibility,
        CreateListingRequest,
        Currency,
        CurrentUserResponse,
        Listing,
        ListingDetail,
        ListingEditView,
        ListingImageResponse,
        ListingPage,
        ListingQueryParams,
        ListingStatus,
        ListingWithImages,
        LoginRequest,
        MyListingsPage,
        Pagination,
        PlanDefinition,
        PlanKind,
        QuotaStatus,
        RegisterRequest,
        Subscription,
        SubscriptionOverview,
        UpdateListingRequest,
        UpgradePreview,
        UpgradeSubscriptionRequest,
        UserProfile,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and sign-in"),
        (name = "Categories", description = "Listing categories"),
        (name = "Listings", description = "Browse and manage listings"),
        (name = "Subscriptions", description = "Plans and listing quotas"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// GET /docs/openapi.json
pub async fn serve_openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/v1/auth/register",
            "/v1/listings",
            "/v1/listings/{id}",
            "/v1/listings/{id}/images/{image_id}",
            "/v1/my-listings",
            "/v1/subscriptions/upgrade",
            "/health",
        ] {
            assert!(paths.contains(&expected), "missing path {}", expected);
        }
    }

    #[test]
    fn test_image_upload_takes_multipart_body() {
        let doc = ApiDoc::openapi();
        let upload = doc
            .paths
            .paths
            .get("/v1/listings/{id}/images")
            .and_then(|item| item.operations.get(&utoipa::openapi::PathItemType::Post))
            .expect("upload operation documented");

        let body = upload.request_body.as_ref().expect("request body documented");
        assert!(body.content.contains_key("multipart/form-data"));
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components present");
        assert!(components.security_schemes.contains_key("bearerAuth"));
    }
}
