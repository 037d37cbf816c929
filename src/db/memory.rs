// In-memory MarketplaceStore
// Backs the integration tests and local runs without PostgreSQL. A single mutex guards all
// tables, which gives the same per-owner serialization the database gets from row locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::db::store::{ImageOutcome, MarketplaceStore, PageRows, QuotaOutcome, StoreError};
use crate::models::category::default_categories;
use crate::models::{
    Category, Listing, ListingChanges, ListingImage, ListingStatus, NewListing, NewListingImage,
    NewSubscription, NewUser, Subscription, User,
};
use crate::services::listing_query::{sort_newest_first, ListingFilter, PageRequest};
use crate::services::quota::{self, QuotaDecision};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    subscriptions: HashMap<Uuid, Subscription>,
    listings: HashMap<Uuid, Listing>,
    images: HashMap<Uuid, ListingImage>,
    categories: HashMap<Uuid, Category>,
}

impl MemoryState {
    fn current_subscription(&self, user_id: Uuid) -> Option<&Subscription> {
        self.users
            .get(&user_id)
            .and_then(|user| user.subscription_id)
            .and_then(|id| self.subscriptions.get(&id))
    }

    fn count_active(&self, user_id: Uuid, excluding: Option<Uuid>) -> i64 {
        self.listings
            .values()
            .filter(|l| l.user_id == user_id && l.status == ListingStatus::Active)
            .filter(|l| Some(l.id) != excluding)
            .count() as i64
    }

    fn quota_for(&self, user_id: Uuid, excluding: Option<Uuid>) -> QuotaDecision {
        quota::evaluate(
            self.current_subscription(user_id),
            self.count_active(user_id, excluding),
        )
    }
}

fn paginate(mut rows: Vec<Listing>, page: &PageRequest) -> PageRows<Listing> {
    sort_newest_first(&mut rows);
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit()).unwrap_or(0))
        .collect();

    PageRows { items, total }
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store seeded with the default categories
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        for category in default_categories() {
            let category = category.into_category();
            state.categories.insert(category.id, category);
        }

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.state().map(|_| ())
    }

    // ===== USERS =====

    async fn register_user(
        &self,
        user: NewUser,
        first_subscription: NewSubscription,
    ) -> Result<(User, Subscription), StoreError> {
        let mut state = self.state()?;

        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "duplicate key value violates unique constraint on email {}",
                user.email
            )));
        }

        let subscription = NewSubscription {
            user_id: user.id,
            ..first_subscription
        }
        .into_subscription();

        let user = User {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            account_type: user.account_type,
            country: user.country,
            state_province: user.state_province,
            city: user.city,
            subscription_id: Some(subscription.id),
            created_at: user.created_at,
            updated_at: user.updated_at,
        };

        state
            .subscriptions
            .insert(subscription.id, subscription.clone());
        state.users.insert(user.id, user.clone());

        Ok((user, subscription))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    // ===== SUBSCRIPTIONS =====

    async fn current_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self.state()?.current_subscription(user_id).cloned())
    }

    async fn subscription_history(&self, user_id: Uuid) -> Result<Vec<Subscription>, StoreError> {
        let state = self.state()?;
        let mut history: Vec<Subscription> = state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| {
            b.starts_at
                .cmp(&a.starts_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(history)
    }

    async fn start_subscription(
        &self,
        next: NewSubscription,
        now: DateTime<Utc>,
    ) -> Result<Subscription, StoreError> {
        let mut state = self.state()?;

        let previous_id = state
            .users
            .get(&next.user_id)
            .ok_or(StoreError::NotFound)?
            .subscription_id;

        if let Some(previous) = previous_id.and_then(|id| state.subscriptions.get_mut(&id)) {
            previous.ends_at = Some(now);
            previous.updated_at = now;
        }

        let subscription = next.into_subscription();
        state
            .subscriptions
            .insert(subscription.id, subscription.clone());

        if let Some(user) = state.users.get_mut(&subscription.user_id) {
            user.subscription_id = Some(subscription.id);
            user.updated_at = now;
        }

        Ok(subscription)
    }

    // ===== LISTINGS =====

    async fn count_active_listings(&self, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(self.state()?.count_active(user_id, None))
    }

    async fn insert_listing_within_quota(
        &self,
        listing: NewListing,
    ) -> Result<QuotaOutcome, StoreError> {
        let mut state = self.state()?;

        if !state.users.contains_key(&listing.user_id) {
            return Err(StoreError::NotFound);
        }

        if listing.status == ListingStatus::Active {
            let decision = state.quota_for(listing.user_id, None);
            if !decision.is_allowed() {
                return Ok(QuotaOutcome::Denied(decision));
            }
        }

        let listing = listing.into_listing();
        state.listings.insert(listing.id, listing.clone());

        Ok(QuotaOutcome::Stored(listing))
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        Ok(self.state()?.listings.get(&id).cloned())
    }

    async fn update_listing(
        &self,
        id: Uuid,
        changes: ListingChanges,
        enforce_quota: bool,
    ) -> Result<QuotaOutcome, StoreError> {
        let mut state = self.state()?;

        let owner = state.listings.get(&id).ok_or(StoreError::NotFound)?.user_id;

        if enforce_quota {
            let decision = state.quota_for(owner, Some(id));
            if !decision.is_allowed() {
                return Ok(QuotaOutcome::Denied(decision));
            }
        }

        let listing = state.listings.get_mut(&id).ok_or(StoreError::NotFound)?;
        changes.apply_to(listing);

        Ok(QuotaOutcome::Stored(listing.clone()))
    }

    async fn delete_listing(&self, id: Uuid) -> Result<Vec<ListingImage>, StoreError> {
        let mut state = self.state()?;

        state.listings.remove(&id).ok_or(StoreError::NotFound)?;

        let image_ids: Vec<Uuid> = state
            .images
            .values()
            .filter(|image| image.listing_id == id)
            .map(|image| image.id)
            .collect();

        let mut removed: Vec<ListingImage> = image_ids
            .into_iter()
            .filter_map(|image_id| state.images.remove(&image_id))
            .collect();
        removed.sort_by_key(|image| image.position);

        Ok(removed)
    }

    async fn search_listings(
        &self,
        filter: &ListingFilter,
        page: &PageRequest,
    ) -> Result<PageRows<Listing>, StoreError> {
        let state = self.state()?;
        let rows = state
            .listings
            .values()
            .filter(|listing| filter.matches(listing))
            .cloned()
            .collect();

        Ok(paginate(rows, page))
    }

    async fn related_listings(
        &self,
        listing: &Listing,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError> {
        let state = self.state()?;
        let mut related: Vec<Listing> = state
            .listings
            .values()
            .filter(|l| {
                l.category_id == listing.category_id
                    && l.status == ListingStatus::Active
                    && l.id != listing.id
            })
            .cloned()
            .collect();
        sort_newest_first(&mut related);
        related.truncate(limit.max(0) as usize);

        Ok(related)
    }

    async fn user_listings(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> Result<PageRows<Listing>, StoreError> {
        let state = self.state()?;
        let rows = state
            .listings
            .values()
            .filter(|listing| listing.user_id == user_id)
            .cloned()
            .collect();

        Ok(paginate(rows, page))
    }

    // ===== LISTING IMAGES =====

    async fn add_listing_images(
        &self,
        listing_id: Uuid,
        images: Vec<NewListingImage>,
        max_images: usize,
    ) -> Result<ImageOutcome, StoreError> {
        let mut state = self.state()?;

        if !state.listings.contains_key(&listing_id) {
            return Err(StoreError::NotFound);
        }

        let positions: Vec<i32> = state
            .images
            .values()
            .filter(|image| image.listing_id == listing_id)
            .map(|image| image.position)
            .collect();

        if positions.len() + images.len() > max_images {
            return Ok(ImageOutcome::LimitReached { limit: max_images });
        }

        let first = positions.iter().max().map_or(0, |p| p + 1);
        let stored: Vec<ListingImage> = images
            .into_iter()
            .zip(first..)
            .map(|(image, position)| {
                NewListingImage {
                    listing_id,
                    position,
                    ..image
                }
                .into_image()
            })
            .collect();

        for image in &stored {
            state.images.insert(image.id, image.clone());
        }

        Ok(ImageOutcome::Stored(stored))
    }

    async fn listing_images(&self, listing_id: Uuid) -> Result<Vec<ListingImage>, StoreError> {
        let state = self.state()?;
        let mut images: Vec<ListingImage> = state
            .images
            .values()
            .filter(|image| image.listing_id == listing_id)
            .cloned()
            .collect();
        images.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        Ok(images)
    }

    async fn remove_listing_image(
        &self,
        listing_id: Uuid,
        image_id: Uuid,
    ) -> Result<Option<ListingImage>, StoreError> {
        let mut state = self.state()?;

        let belongs = state
            .images
            .get(&image_id)
            .is_some_and(|image| image.listing_id == listing_id);

        Ok(if belongs {
            state.images.remove(&image_id)
        } else {
            None
        })
    }

    // ===== CATEGORIES =====

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let state = self.state()?;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(categories)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.state()?.categories.get(&id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        Ok(self
            .state()?
            .categories
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }
}
