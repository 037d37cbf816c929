// PostgreSQL MarketplaceStore on diesel-async
// Quota-gated writes lock the owner's users row so that the count, the decision and the
// write happen under one serialization point per user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::db::diesel_pool::DieselPool;
use crate::db::store::{ImageOutcome, MarketplaceStore, PageRows, QuotaOutcome, StoreError};
use crate::models::{
    Category, Listing, ListingChanges, ListingImage, ListingStatus, NewListing, NewListingImage,
    NewSubscription, NewUser, Subscription, User,
};
use crate::schema::{categories, listing_images, listings, subscriptions, users};
use crate::services::listing_query::{active_listings_query, ListingFilter, PageRequest};
use crate::services::quota::{self, QuotaDecision};

#[derive(Clone)]
pub struct PgStore {
    pool: DieselPool,
}

impl PgStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> Result<
        bb8::PooledConnection<
            '_,
            diesel_async::pooled_connection::AsyncDieselConnectionManager<AsyncPgConnection>,
        >,
        StoreError,
    > {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

/// Locks the owner row, then evaluates quota against the current subscription.
/// Must run inside a transaction.
async fn locked_quota(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    excluding: Option<Uuid>,
) -> Result<QuotaDecision, diesel::result::Error> {
    let subscription_id = users::table
        .find(user_id)
        .select(users::subscription_id)
        .for_update()
        .first::<Option<Uuid>>(conn)
        .await?;

    let subscription = match subscription_id {
        Some(id) => subscriptions::table
            .find(id)
            .first::<Subscription>(conn)
            .await
            .optional()?,
        None => None,
    };

    let mut active_query = listings::table
        .filter(listings::user_id.eq(user_id))
        .filter(listings::status.eq(ListingStatus::Active))
        .into_boxed();

    if let Some(excluded) = excluding {
        active_query = active_query.filter(listings::id.ne(excluded));
    }

    let active = active_query.count().get_result::<i64>(conn).await?;

    Ok(quota::evaluate(subscription.as_ref(), active))
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        diesel::sql_query("SELECT 1").execute(&mut conn).await?;
        Ok(())
    }

    // ===== USERS =====

    async fn register_user(
        &self,
        user: NewUser,
        first_subscription: NewSubscription,
    ) -> Result<(User, Subscription), StoreError> {
        let mut conn = self.conn().await?;

        conn.build_transaction()
            .run::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    // users.subscription_id references subscriptions, so the pointer is
                    // set once both rows exist
                    let inserted = diesel::insert_into(users::table)
                        .values(&user)
                        .get_result::<User>(conn)
                        .await?;

                    let subscription = diesel::insert_into(subscriptions::table)
                        .values(&NewSubscription {
                            user_id: inserted.id,
                            ..first_subscription
                        })
                        .get_result::<Subscription>(conn)
                        .await?;

                    let user = diesel::update(users::table.find(inserted.id))
                        .set(users::subscription_id.eq(Some(subscription.id)))
                        .get_result::<User>(conn)
                        .await?;

                    Ok((user, subscription))
                })
            })
            .await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let mut conn = self.conn().await?;

        let user = users::table
            .find(id)
            .first::<User>(&mut conn)
            .await
            .optional()?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.conn().await?;

        let user = users::table
            .filter(users::email.eq(email))
            .first::<User>(&mut conn)
            .await
            .optional()?;

        Ok(user)
    }

    // ===== SUBSCRIPTIONS =====

    async fn current_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        let mut conn = self.conn().await?;

        let subscription_id = users::table
            .find(user_id)
            .select(users::subscription_id)
            .first::<Option<Uuid>>(&mut conn)
            .await
            .optional()?
            .flatten();

        let Some(subscription_id) = subscription_id else {
            return Ok(None);
        };

        let subscription = subscriptions::table
            .find(subscription_id)
            .first::<Subscription>(&mut conn)
            .await
            .optional()?;

        Ok(subscription)
    }

    async fn subscription_history(&self, user_id: Uuid) -> Result<Vec<Subscription>, StoreError> {
        let mut conn = self.conn().await?;

        let history = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .order((subscriptions::starts_at.desc(), subscriptions::created_at.desc()))
            .load::<Subscription>(&mut conn)
            .await?;

        Ok(history)
    }

    async fn start_subscription(
        &self,
        next: NewSubscription,
        now: DateTime<Utc>,
    ) -> Result<Subscription, StoreError> {
        let mut conn = self.conn().await?;

        conn.build_transaction()
            .run::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let previous = users::table
                        .find(next.user_id)
                        .select(users::subscription_id)
                        .for_update()
                        .first::<Option<Uuid>>(conn)
                        .await?;

                    if let Some(previous_id) = previous {
                        diesel::update(subscriptions::table.find(previous_id))
                            .set((
                                subscriptions::ends_at.eq(Some(now)),
                                subscriptions::updated_at.eq(now),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    let subscription = diesel::insert_into(subscriptions::table)
                        .values(&next)
                        .get_result::<Subscription>(conn)
                        .await?;

                    diesel::update(users::table.find(subscription.user_id))
                        .set((
                            users::subscription_id.eq(Some(subscription.id)),
                            users::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .await?;

                    Ok(subscription)
                })
            })
            .await
    }

    // ===== LISTINGS =====

    async fn count_active_listings(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let mut conn = self.conn().await?;

        let count = listings::table
            .filter(listings::user_id.eq(user_id))
            .filter(listings::status.eq(ListingStatus::Active))
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        Ok(count)
    }

    async fn insert_listing_within_quota(
        &self,
        listing: NewListing,
    ) -> Result<QuotaOutcome, StoreError> {
        let mut conn = self.conn().await?;

        conn.build_transaction()
            .run::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    // Drafts and sold listings never consume quota, but the lock is still
                    // taken so the owner must exist
                    let decision = locked_quota(conn, listing.user_id, None).await?;
                    if listing.status == ListingStatus::Active && !decision.is_allowed() {
                        return Ok(QuotaOutcome::Denied(decision));
                    }

                    let stored = diesel::insert_into(listings::table)
                        .values(&listing)
                        .get_result::<Listing>(conn)
                        .await?;

                    Ok(QuotaOutcome::Stored(stored))
                })
            })
            .await
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let mut conn = self.conn().await?;

        let listing = listings::table
            .find(id)
            .first::<Listing>(&mut conn)
            .await
            .optional()?;

        Ok(listing)
    }

    async fn update_listing(
        &self,
        id: Uuid,
        changes: ListingChanges,
        enforce_quota: bool,
    ) -> Result<QuotaOutcome, StoreError> {
        let mut conn = self.conn().await?;

        conn.build_transaction()
            .run::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    if enforce_quota {
                        let owner = listings::table
                            .find(id)
                            .select(listings::user_id)
                            .first::<Uuid>(conn)
                            .await?;

                        let decision = locked_quota(conn, owner, Some(id)).await?;
                        if !decision.is_allowed() {
                            return Ok(QuotaOutcome::Denied(decision));
                        }
                    }

                    let updated = diesel::update(listings::table.find(id))
                        .set(&changes)
                        .get_result::<Listing>(conn)
                        .await?;

                    Ok(QuotaOutcome::Stored(updated))
                })
            })
            .await
    }

    async fn delete_listing(&self, id: Uuid) -> Result<Vec<ListingImage>, StoreError> {
        let mut conn = self.conn().await?;

        conn.build_transaction()
            .run::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    let images = listing_images::table
                        .filter(listing_images::listing_id.eq(id))
                        .order(listing_images::position.asc())
                        .load::<ListingImage>(conn)
                        .await?;

                    // Image rows go with the listing through ON DELETE CASCADE
                    let deleted = diesel::delete(listings::table.find(id))
                        .execute(conn)
                        .await?;

                    if deleted == 0 {
                        return Err(StoreError::NotFound);
                    }

                    Ok(images)
                })
            })
            .await
    }

    async fn search_listings(
        &self,
        filter: &ListingFilter,
        page: &PageRequest,
    ) -> Result<PageRows<Listing>, StoreError> {
        let mut conn = self.conn().await?;

        let total = active_listings_query(filter)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = active_listings_query(filter)
            .order((listings::created_at.desc(), listings::id.desc()))
            .limit(page.limit())
            .offset(page.offset())
            .load::<Listing>(&mut conn)
            .await?;

        Ok(PageRows { items, total })
    }

    async fn related_listings(
        &self,
        listing: &Listing,
        limit: i64,
    ) -> Result<Vec<Listing>, StoreError> {
        let mut conn = self.conn().await?;

        let related = listings::table
            .filter(listings::category_id.eq(listing.category_id))
            .filter(listings::status.eq(ListingStatus::Active))
            .filter(listings::id.ne(listing.id))
            .order((listings::created_at.desc(), listings::id.desc()))
            .limit(limit)
            .load::<Listing>(&mut conn)
            .await?;

        Ok(related)
    }

    async fn user_listings(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> Result<PageRows<Listing>, StoreError> {
        let mut conn = self.conn().await?;

        let total = listings::table
            .filter(listings::user_id.eq(user_id))
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        let items = listings::table
            .filter(listings::user_id.eq(user_id))
            .order((listings::created_at.desc(), listings::id.desc()))
            .limit(page.limit())
            .offset(page.offset())
            .load::<Listing>(&mut conn)
            .await?;

        Ok(PageRows { items, total })
    }

    // ===== LISTING IMAGES =====

    async fn add_listing_images(
        &self,
        listing_id: Uuid,
        images: Vec<NewListingImage>,
        max_images: usize,
    ) -> Result<ImageOutcome, StoreError> {
        let mut conn = self.conn().await?;

        conn.build_transaction()
            .run::<_, StoreError, _>(|conn| {
                Box::pin(async move {
                    // The listing row lock serializes uploads to the same listing
                    listings::table
                        .find(listing_id)
                        .select(listings::id)
                        .for_update()
                        .first::<Uuid>(conn)
                        .await?;

                    let positions = listing_images::table
                        .filter(listing_images::listing_id.eq(listing_id))
                        .select(listing_images::position)
                        .load::<i32>(conn)
                        .await?;

                    if positions.len() + images.len() > max_images {
                        return Ok(ImageOutcome::LimitReached { limit: max_images });
                    }

                    let first = positions.iter().max().map_or(0, |p| p + 1);
                    let rows: Vec<NewListingImage> = images
                        .into_iter()
                        .zip(first..)
                        .map(|(image, position)| NewListingImage {
                            listing_id,
                            position,
                            ..image
                        })
                        .collect();

                    let mut stored = diesel::insert_into(listing_images::table)
                        .values(&rows)
                        .get_results::<ListingImage>(conn)
                        .await?;
                    stored.sort_by_key(|image| image.position);

                    Ok(ImageOutcome::Stored(stored))
                })
            })
            .await
    }

    async fn listing_images(&self, listing_id: Uuid) -> Result<Vec<ListingImage>, StoreError> {
        let mut conn = self.conn().await?;

        let images = listing_images::table
            .filter(listing_images::listing_id.eq(listing_id))
            .order((listing_images::position.asc(), listing_images::created_at.asc()))
            .load::<ListingImage>(&mut conn)
            .await?;

        Ok(images)
    }

    async fn remove_listing_image(
        &self,
        listing_id: Uuid,
        image_id: Uuid,
    ) -> Result<Option<ListingImage>, StoreError> {
        let mut conn = self.conn().await?;

        let removed = diesel::delete(
            listing_images::table
                .filter(listing_images::id.eq(image_id))
                .filter(listing_images::listing_id.eq(listing_id)),
        )
        .get_result::<ListingImage>(&mut conn)
        .await
        .optional()?;

        Ok(removed)
    }

    // ===== CATEGORIES =====

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut conn = self.conn().await?;

        let all = categories::table
            .order(categories::name.asc())
            .load::<Category>(&mut conn)
            .await?;

        Ok(all)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let mut conn = self.conn().await?;

        let category = categories::table
            .find(id)
            .first::<Category>(&mut conn)
            .await
            .optional()?;

        Ok(category)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let mut conn = self.conn().await?;

        let category = categories::table
            .filter(categories::slug.eq(slug))
            .first::<Category>(&mut conn)
            .await
            .optional()?;

        Ok(category)
    }
}
