// Persistence seam for the marketplace
// Every query the services need goes through MarketplaceStore so the core can run
// against PostgreSQL in production and an in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Category, Listing, ListingChanges, ListingImage, NewListing, NewListingImage, NewSubscription,
    NewUser, Subscription, User,
};
use crate::services::listing_query::{ListingFilter, PageRequest};
use crate::services::quota::QuotaDecision;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Conflict(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match error {
            Error::NotFound => StoreError::NotFound,
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            },
            _ => StoreError::Database(error.to_string()),
        }
    }
}

/// Result of a write that is gated by the owner's listing quota
#[derive(Debug, Clone, PartialEq)]
pub enum QuotaOutcome {
    Stored(Listing),
    Denied(QuotaDecision),
}

/// Result of adding images to a listing that is capped at a fixed image count
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Stored(Vec<ListingImage>),
    LimitReached { limit: usize },
}

/// One page of rows plus the unpaginated total
#[derive(Debug, Clone)]
pub struct PageRows<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[async_trait]
pub trait MarketplaceStore: Send + Sync + 'static {
    /// Cheap liveness probe for the health endpoint
    async fn ping(&self) -> Result<(), StoreError>;

    // Users
    /// Inserts the user and `first_subscription`, then makes the subscription current, all in
    /// one transaction. Either both rows exist afterwards or neither does.
    async fn register_user(
        &self,
        user: NewUser,
        first_subscription: NewSubscription,
    ) -> Result<(User, Subscription), StoreError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// `email` must already be lowercased
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    // Subscriptions
    async fn current_subscription(&self, user_id: Uuid)
        -> Result<Option<Subscription>, StoreError>;
    async fn subscription_history(&self, user_id: Uuid) -> Result<Vec<Subscription>, StoreError>;
    /// Ends the current subscription at `now` (if any), inserts `next` and makes it current,
    /// all in one transaction.
    async fn start_subscription(
        &self,
        next: NewSubscription,
        now: DateTime<Utc>,
    ) -> Result<Subscription, StoreError>;

    // Listings
    async fn count_active_listings(&self, user_id: Uuid) -> Result<i64, StoreError>;
    /// Re-evaluates the owner's quota and inserts atomically; concurrent inserts for the
    /// same owner are serialized.
    async fn insert_listing_within_quota(
        &self,
        listing: NewListing,
    ) -> Result<QuotaOutcome, StoreError>;
    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;
    /// Applies `changes`; with `enforce_quota` the owner's quota is re-evaluated under the
    /// same lock as `insert_listing_within_quota`, not counting the listing itself.
    async fn update_listing(
        &self,
        id: Uuid,
        changes: ListingChanges,
        enforce_quota: bool,
    ) -> Result<QuotaOutcome, StoreError>;
    /// Deletes the listing and its images, returning the removed image rows
    async fn delete_listing(&self, id: Uuid) -> Result<Vec<ListingImage>, StoreError>;
    async fn search_listings(
        &self,
        filter: &ListingFilter,
        page: &PageRequest,
    ) -> Result<PageRows<Listing>, StoreError>;
    async fn related_listings(
        &self,
        listing: &Listing,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError>;
    /// All of a user's listings regardless of status, newest first
    async fn user_listings(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> Result<PageRows<Listing>, StoreError>;

    // Listing images
    /// Inserts all `images` after the listing's current ones, or none of them if the listing
    /// would end up with more than `max_images`. Concurrent calls for one listing are
    /// serialized, and positions are assigned here in the given order.
    async fn add_listing_images(
        &self,
        listing_id: Uuid,
        images: Vec<NewListingImage>,
        max_images: usize,
    ) -> Result<ImageOutcome, StoreError>;
    /// Ordered by position
    async fn listing_images(&self, listing_id: Uuid) -> Result<Vec<ListingImage>, StoreError>;
    async fn remove_listing_image(
        &self,
        listing_id: Uuid,
        image_id: Uuid,
    ) -> Result<Option<ListingImage>, StoreError>;

    // Categories
    /// Ordered by name
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;
}
