// Listing handlers: public browse and detail, owner-only management and images

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::{AuthenticatedUser, MaybeUser},
    models::{CreateListingRequest, ListingImageResponse, UpdateListingRequest},
    services::listing::{
        CreateEligibility, ImageUpload, ListingDetail, ListingEditView, ListingPage,
        ListingWithImages, MyListingsPage,
    },
    services::listing_query::ListingQueryParams,
    utils::ServiceError,
};

const LISTINGS_PATH: &str = "/v1/listings";
const MY_LISTINGS_PATH: &str = "/v1/my-listings";

/// Multipart field carrying one image; repeat it to upload several
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based; anything unparsable falls back to the first page
    pub page: Option<String>,
}

impl PageQuery {
    fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
    }
}

// =============================================================================
// PUBLIC
// =============================================================================

/// GET /listings - Active listings with filters and pagination
#[utoipa::path(
    get,
    path = "/v1/listings",
    tag = "Listings",
    operation_id = "browseListings",
    params(ListingQueryParams),
    responses(
        (status = 200, description = "Page of active listings", body = ListingPage),
        (status = 422, description = "Invalid filter value")
    )
)]
pub async fn browse_listings(
    State(state): State<AppState>,
    Query(params): Query<ListingQueryParams>,
) -> Result<Json<ListingPage>, ServiceError> {
    Ok(Json(
        state
            .listing_service
            .browse(&params, LISTINGS_PATH)
            .await?,
    ))
}

/// GET /listings/{id} - Listing detail; drafts and sold listings only for the owner
#[utoipa::path(
    get,
    path = "/v1/listings/{id}",
    tag = "Listings",
    operation_id = "showListing",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing detail", body = ListingDetail),
        (status = 404, description = "Listing not found")
    )
)]
pub async fn show_listing(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingDetail>, ServiceError> {
    Ok(Json(
        state
            .listing_service
            .show(id, viewer.user_id())
            .await?,
    ))
}

// =============================================================================
// OWNER
// =============================================================================

/// GET /listings/eligibility - Whether the caller may create another listing
#[utoipa::path(
    get,
    path = "/v1/listings/eligibility",
    tag = "Listings",
    operation_id = "listingEligibility",
    responses(
        (status = 200, description = "Quota position and categories", body = CreateEligibility)
    ),
    security(("bearerAuth" = []))
)]
pub async fn listing_eligibility(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<CreateEligibility>, ServiceError> {
    Ok(Json(state.listing_service.eligibility(user.user_id).await?))
}

/// POST /listings - Create a listing within the plan quota
#[utoipa::path(
    post,
    path = "/v1/listings",
    tag = "Listings",
    operation_id = "createListing",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created", body = ListingWithImages),
        (status = 402, description = "Listing quota reached"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_listing(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(request): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let listing = state.listing_service.create(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// GET /listings/{id}/edit - Listing in any status plus categories, owner only
#[utoipa::path(
    get,
    path = "/v1/listings/{id}/edit",
    tag = "Listings",
    operation_id = "editListing",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Edit view", body = ListingEditView),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Listing not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn edit_listing(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingEditView>, ServiceError> {
    Ok(Json(state.listing_service.edit_view(id, user.user_id).await?))
}

/// PUT|PATCH /listings/{id} - Partial update, owner only
#[utoipa::path(
    put,
    path = "/v1/listings/{id}",
    tag = "Listings",
    operation_id = "updateListing",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Listing updated", body = ListingWithImages),
        (status = 402, description = "Activating would exceed the quota"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Listing not found"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_listing(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateListingRequest>,
) -> Result<Json<ListingWithImages>, ServiceError> {
    Ok(Json(
        state
            .listing_service
            .update(id, user.user_id, request)
            .await?,
    ))
}

/// DELETE /listings/{id} - Remove a listing and its images, owner only
#[utoipa::path(
    delete,
    path = "/v1/listings/{id}",
    tag = "Listings",
    operation_id = "deleteListing",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Listing not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_listing(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.listing_service.delete(id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== IMAGES =====

/// POST /listings/{id}/images - Multipart upload, one or more `image` fields
#[utoipa::path(
    post,
    path = "/v1/listings/{id}/images",
    tag = "Listings",
    operation_id = "uploadListingImages",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body(
        content = Vec<u8>,
        content_type = "multipart/form-data",
        description = "Repeated `image` file fields"
    ),
    responses(
        (status = 201, description = "Images stored", body = [ListingImageResponse]),
        (status = 400, description = "Missing, oversized or unsupported image"),
        (status = 403, description = "Not the owner")
    ),
    security(("bearerAuth" = []))
)]
pub async fn upload_listing_images(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart body for listing {}: {}", id, e);
        ServiceError::MediaError(format!("Invalid multipart body: {}", e))
    })? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::MediaError(format!("Failed to read image: {}", e)))?;

        uploads.push(ImageUpload {
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let images = state
        .listing_service
        .add_images(id, user.user_id, uploads)
        .await?;

    Ok((StatusCode::CREATED, Json(images)))
}

/// DELETE /listings/{id}/images/{image_id} - Remove one image, owner only
#[utoipa::path(
    delete,
    path = "/v1/listings/{id}/images/{image_id}",
    tag = "Listings",
    operation_id = "deleteListingImage",
    params(
        ("id" = Uuid, Path, description = "Listing ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image removed"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Listing or image not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_listing_image(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state
        .listing_service
        .remove_image(id, image_id, user.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /my-listings - The caller's listings in every status
#[utoipa::path(
    get,
    path = "/v1/my-listings",
    tag = "Listings",
    operation_id = "myListings",
    params(PageQuery),
    responses((status = 200, description = "Caller's listings", body = MyListingsPage)),
    security(("bearerAuth" = []))
)]
pub async fn my_listings(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<MyListingsPage>, ServiceError> {
    Ok(Json(
        state
            .listing_service
            .my_listings(user.user_id, query.page(), MY_LISTINGS_PATH)
            .await?,
    ))
}
