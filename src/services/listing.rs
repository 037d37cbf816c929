// Listing lifecycle: browse, detail, quota-gated create, owner-only edits and images

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::app_config::ListingConfig;
use crate::db::{ImageOutcome, MarketplaceStore, QuotaOutcome};
use crate::models::category::CategoryRef;
use crate::models::{
    Category, CreateListingRequest, Listing, ListingChanges, ListingImage, ListingImageResponse,
    ListingStatus, NewListing, NewListingImage, UpdateListingRequest,
};
use crate::services::listing_query::{ListingQueryParams, PageRequest, Pagination};
use crate::services::media::{image_extension, MediaStore, ACCEPTED_IMAGE_TYPES};
use crate::services::subscription::{QuotaStatus, SubscriptionService};
use crate::utils::{AuditAction, AuditLogger, ServiceError};

// =============================================================================
// RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListingWithImages {
    #[serde(flatten)]
    pub listing: Listing,
    pub images: Vec<ListingImageResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListingPage {
    pub data: Vec<ListingWithImages>,
    pub pagination: Pagination,
    pub categories: Vec<Category>,
    /// Filter values as received, blanks dropped
    pub filters: ListingQueryParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListingDetail {
    pub listing: ListingWithImages,
    pub category: Option<Category>,
    pub related: Vec<ListingWithImages>,
    pub can_edit: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListingEditView {
    pub listing: ListingWithImages,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateEligibility {
    #[serde(flatten)]
    pub quota: QuotaStatus,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MyListingsPage {
    pub data: Vec<ListingWithImages>,
    pub pagination: Pagination,
    pub remaining_listings: i64,
}

/// One uploaded file as received from the multipart body
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// =============================================================================
// SERVICE
// =============================================================================

pub struct ListingService {
    store: Arc<dyn MarketplaceStore>,
    media: Arc<dyn MediaStore>,
    subscriptions: Arc<SubscriptionService>,
    config: ListingConfig,
}

impl ListingService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        media: Arc<dyn MediaStore>,
        subscriptions: Arc<SubscriptionService>,
        config: ListingConfig,
    ) -> Self {
        Self {
            store,
            media,
            subscriptions,
            config,
        }
    }

    fn image_response(&self, image: &ListingImage) -> ListingImageResponse {
        ListingImageResponse {
            id: image.id,
            url: self.media.public_url(&image.path),
            content_type: image.content_type.clone(),
            size_bytes: image.size_bytes,
            position: image.position,
        }
    }

    async fn with_images(&self, listing: Listing) -> Result<ListingWithImages, ServiceError> {
        let images = self.store.listing_images(listing.id).await?;

        Ok(ListingWithImages {
            images: images.iter().map(|image| self.image_response(image)).collect(),
            listing,
        })
    }

    async fn with_images_all(
        &self,
        listings: Vec<Listing>,
    ) -> Result<Vec<ListingWithImages>, ServiceError> {
        let mut result = Vec::with_capacity(listings.len());
        for listing in listings {
            result.push(self.with_images(listing).await?);
        }
        Ok(result)
    }

    async fn find_listing(&self, id: Uuid) -> Result<Listing, ServiceError> {
        self.store
            .find_listing(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Loads the listing and checks that `user_id` owns it
    async fn owned_listing(&self, id: Uuid, user_id: Uuid) -> Result<Listing, ServiceError> {
        let listing = self.find_listing(id).await?;

        if listing.user_id != user_id {
            warn!("User {} denied access to listing {}", user_id, id);
            return Err(ServiceError::forbidden_listing());
        }

        Ok(listing)
    }

    async fn ensure_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        match self.store.find_category(category_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::ValidationError(
                "category_id: The selected category is invalid.".to_string(),
            )),
        }
    }

    // ===== BROWSE =====

    #[instrument(skip(self, params))]
    pub async fn browse(
        &self,
        params: &ListingQueryParams,
        base_path: &str,
    ) -> Result<ListingPage, ServiceError> {
        let parsed = params.parse().map_err(ServiceError::ValidationError)?;
        let mut filter = parsed.filter;

        filter.category_id = match parsed.category {
            None => None,
            Some(CategoryRef::Id(id)) => Some(id),
            Some(CategoryRef::Slug(slug)) => Some(
                self.store
                    .find_category_by_slug(&slug)
                    .await?
                    .map(|category| category.id)
                    .ok_or_else(|| {
                        ServiceError::ValidationError(format!(
                            "category: Unknown category '{}'",
                            slug
                        ))
                    })?,
            ),
        };

        let page = PageRequest::new(parsed.page, self.config.page_size);
        let rows = self.store.search_listings(&filter, &page).await?;
        debug!("Browse matched {} listings", rows.total);

        let query = params.query_pairs();
        Ok(ListingPage {
            data: self.with_images_all(rows.items).await?,
            pagination: Pagination::new(rows.total, &page, base_path, &query),
            categories: self.store.list_categories().await?,
            filters: params.applied_filters(),
        })
    }

    /// Active listings are public; other statuses are visible only to the owner.
    #[instrument(skip(self))]
    pub async fn show(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<ListingDetail, ServiceError> {
        let listing = self.find_listing(id).await?;
        let is_owner = viewer == Some(listing.user_id);

        if listing.status != ListingStatus::Active && !is_owner {
            return Err(ServiceError::NotFound);
        }

        let related = self
            .store
            .related_listings(&listing, self.config.related_limit)
            .await?;
        let category = self.store.find_category(listing.category_id).await?;

        Ok(ListingDetail {
            listing: self.with_images(listing).await?,
            category,
            related: self.with_images_all(related).await?,
            can_edit: is_owner,
        })
    }

    #[instrument(skip(self))]
    pub async fn edit_view(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<ListingEditView, ServiceError> {
        let listing = self.owned_listing(id, user_id).await?;

        Ok(ListingEditView {
            listing: self.with_images(listing).await?,
            categories: self.store.list_categories().await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn my_listings(
        &self,
        user_id: Uuid,
        page: i64,
        base_path: &str,
    ) -> Result<MyListingsPage, ServiceError> {
        let page = PageRequest::new(page, self.config.page_size);
        let rows = self.store.user_listings(user_id, &page).await?;
        let remaining_listings = self.subscriptions.remaining_listings(user_id).await?;

        Ok(MyListingsPage {
            data: self.with_images_all(rows.items).await?,
            pagination: Pagination::new(rows.total, &page, base_path, &[]),
            remaining_listings,
        })
    }

    #[instrument(skip(self))]
    pub async fn eligibility(&self, user_id: Uuid) -> Result<CreateEligibility, ServiceError> {
        Ok(CreateEligibility {
            quota: self.subscriptions.quota_status(user_id).await?,
            categories: self.store.list_categories().await?,
        })
    }

    // ===== MUTATIONS =====

    /// Creates a listing; an active listing must fit the owner's quota.
    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreateListingRequest,
    ) -> Result<ListingWithImages, ServiceError> {
        request.validate()?;
        self.ensure_category(request.category_id).await?;

        let now = Utc::now();
        let new_listing = NewListing {
            id: Uuid::new_v4(),
            user_id,
            category_id: request.category_id,
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            condition: request.condition,
            price: request.price.round_dp(2),
            currency: request.currency,
            country: request.country.trim().to_string(),
            state_province: request
                .state_province
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            city: request.city.trim().to_string(),
            status: request.status,
            created_at: now,
            updated_at: now,
        };

        let listing = match self.store.insert_listing_within_quota(new_listing).await? {
            QuotaOutcome::Stored(listing) => listing,
            QuotaOutcome::Denied(decision) => {
                info!("Listing quota reached for user {}: {:?}", user_id, decision);
                return Err(decision.into());
            },
        };

        AuditLogger::log(
            AuditAction::ListingCreated,
            user_id,
            Some(listing.id),
            Some(listing.title.clone()),
        );

        self.with_images(listing).await
    }

    /// Partial update by the owner; moving a listing to active is quota-gated.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        request: UpdateListingRequest,
    ) -> Result<ListingWithImages, ServiceError> {
        request.validate()?;
        let existing = self.owned_listing(id, user_id).await?;

        if let Some(category_id) = request.category_id {
            self.ensure_category(category_id).await?;
        }

        let reactivating = request.status == Some(ListingStatus::Active)
            && existing.status != ListingStatus::Active;

        let changes = ListingChanges {
            category_id: request.category_id,
            title: request.title.map(|s| s.trim().to_string()),
            description: request.description.map(|s| s.trim().to_string()),
            condition: request.condition,
            price: request.price.map(|p| p.round_dp(2)),
            currency: request.currency,
            country: request.country.map(|s| s.trim().to_string()),
            state_province: request.state_province.map(|s| {
                let trimmed = s.trim().to_string();
                (!trimmed.is_empty()).then_some(trimmed)
            }),
            city: request.city.map(|s| s.trim().to_string()),
            status: request.status,
            updated_at: Utc::now(),
        };

        let listing = match self.store.update_listing(id, changes, reactivating).await? {
            QuotaOutcome::Stored(listing) => listing,
            QuotaOutcome::Denied(decision) => return Err(decision.into()),
        };

        AuditLogger::log(AuditAction::ListingUpdated, user_id, Some(listing.id), None);

        self.with_images(listing).await
    }

    /// Deletes the listing, its image rows and the stored files
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        self.owned_listing(id, user_id).await?;

        let images = self.store.delete_listing(id).await?;
        for image in &images {
            // Rows are already gone; a leftover file is only logged
            if let Err(e) = self.media.remove(&image.path).await {
                warn!("Failed to remove media {} for listing {}: {}", image.path, id, e);
            }
        }

        AuditLogger::log(
            AuditAction::ListingDeleted,
            user_id,
            Some(id),
            Some(format!("{} images removed", images.len())),
        );

        Ok(())
    }

    // ===== IMAGES =====

    /// Validates every upload before storing any of them
    #[instrument(skip(self, uploads), fields(count = uploads.len()))]
    pub async fn add_images(
        &self,
        id: Uuid,
        user_id: Uuid,
        uploads: Vec<ImageUpload>,
    ) -> Result<Vec<ListingImageResponse>, ServiceError> {
        self.owned_listing(id, user_id).await?;

        if uploads.is_empty() {
            return Err(ServiceError::MediaError(
                "At least one image file is required".to_string(),
            ));
        }

        // Early rejection; the store re-checks under the listing lock
        let existing = self.store.listing_images(id).await?;
        if existing.len() + uploads.len() > self.config.max_images {
            return Err(too_many_images(self.config.max_images));
        }

        let mut prepared = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let extension = image_extension(&upload.content_type).ok_or_else(|| {
                let accepted: Vec<&str> =
                    ACCEPTED_IMAGE_TYPES.iter().map(|(mime, _)| *mime).collect();
                ServiceError::MediaError(format!(
                    "Unsupported image type '{}'; accepted: {}",
                    upload.content_type,
                    accepted.join(", ")
                ))
            })?;

            if upload.bytes.is_empty() || upload.bytes.len() > self.config.max_image_bytes {
                return Err(ServiceError::MediaError(format!(
                    "Each image must be between 1 byte and {} bytes",
                    self.config.max_image_bytes
                )));
            }

            prepared.push((extension, upload));
        }

        // Files first, rows second; whatever was written is removed if either step fails
        let mut rows = Vec::with_capacity(prepared.len());
        for (extension, upload) in prepared {
            let path = match self
                .media
                .store(&format!("listings/{}", id), extension, &upload.bytes)
                .await
            {
                Ok(path) => path,
                Err(e) => {
                    self.discard_files(&rows).await;
                    return Err(e.into());
                },
            };

            rows.push(NewListingImage {
                id: Uuid::new_v4(),
                listing_id: id,
                path,
                content_type: upload.content_type.trim().to_ascii_lowercase(),
                size_bytes: upload.bytes.len() as i64,
                position: 0,
                created_at: Utc::now(),
            });
        }

        let outcome = self
            .store
            .add_listing_images(id, rows.clone(), self.config.max_images)
            .await;

        let images = match outcome {
            Ok(ImageOutcome::Stored(images)) => images,
            Ok(ImageOutcome::LimitReached { limit }) => {
                self.discard_files(&rows).await;
                return Err(too_many_images(limit));
            },
            Err(e) => {
                self.discard_files(&rows).await;
                return Err(e.into());
            },
        };

        Ok(images
            .iter()
            .map(|image| {
                AuditLogger::log(
                    AuditAction::ListingImageAdded,
                    user_id,
                    Some(image.id),
                    Some(image.path.clone()),
                );
                self.image_response(image)
            })
            .collect())
    }

    async fn discard_files(&self, rows: &[NewListingImage]) {
        for row in rows {
            if let Err(e) = self.media.remove(&row.path).await {
                warn!("Failed to remove unstored image file {}: {}", row.path, e);
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_image(
        &self,
        id: Uuid,
        image_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.owned_listing(id, user_id).await?;

        let image = self
            .store
            .remove_listing_image(id, image_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        self.media.remove(&image.path).await?;

        AuditLogger::log(
            AuditAction::ListingImageRemoved,
            user_id,
            Some(image.id),
            Some(image.path),
        );

        Ok(())
    }
}

fn too_many_images(limit: usize) -> ServiceError {
    ServiceError::MediaError(format!("A listing can have at most {} images", limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfig;
    use crate::config::PlanCatalog;
    use crate::db::MemoryStore;
    use crate::models::{AccountType, Condition, Currency, NewUser, DEFAULT_CATEGORIES};
    use crate::services::media::MediaError;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    /// Keeps written paths in memory and fails once `capacity` files exist
    struct LimitedMedia {
        capacity: usize,
        files: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaStore for LimitedMedia {
        async fn store(
            &self,
            prefix: &str,
            extension: &str,
            _bytes: &[u8],
        ) -> Result<String, MediaError> {
            let mut files = self.files.lock().unwrap();
            if files.len() >= self.capacity {
                return Err(MediaError::Io(std::io::Error::other("disk full")));
            }
            let path = format!("{}/{}.{}", prefix, Uuid::new_v4(), extension);
            files.push(path.clone());
            Ok(path)
        }

        async fn remove(&self, path: &str) -> Result<(), MediaError> {
            self.files.lock().unwrap().retain(|file| file != path);
            Ok(())
        }

        fn public_url(&self, path: &str) -> String {
            format!("/media/{}", path)
        }
    }

    struct Fixture {
        service: ListingService,
        media: Arc<LimitedMedia>,
        store: Arc<dyn MarketplaceStore>,
        owner: Uuid,
        listing: Uuid,
    }

    async fn fixture(media_capacity: usize) -> Fixture {
        let store: Arc<dyn MarketplaceStore> = Arc::new(MemoryStore::new());
        let media = Arc::new(LimitedMedia {
            capacity: media_capacity,
            files: Mutex::new(Vec::new()),
        });
        let subscriptions = Arc::new(SubscriptionService::new(
            store.clone(),
            PlanCatalog::default(),
        ));

        let now = Utc::now();
        let (owner, _) = subscriptions
            .create_freemium_subscription(NewUser {
                id: Uuid::new_v4(),
                name: "Driver".to_string(),
                email: "driver@example.com".to_string(),
                password_hash: "hash".to_string(),
                account_type: AccountType::Individual,
                country: "Bulgaria".to_string(),
                state_province: None,
                city: "Sofia".to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let outcome = store
            .insert_listing_within_quota(NewListing {
                id: Uuid::new_v4(),
                user_id: owner.id,
                category_id: Uuid::parse_str(DEFAULT_CATEGORIES[0].0).unwrap(),
                title: "Rotax kart".to_string(),
                description: "Race ready".to_string(),
                condition: Condition::Used,
                price: Decimal::new(1500, 0),
                currency: Currency::Eur,
                country: "Bulgaria".to_string(),
                state_province: None,
                city: "Sofia".to_string(),
                status: ListingStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let QuotaOutcome::Stored(listing) = outcome else {
            panic!("listing should fit the Freemium quota");
        };

        let service = ListingService::new(
            store.clone(),
            media.clone(),
            subscriptions,
            AppConfig::for_test().listings,
        );

        Fixture {
            service,
            media,
            store,
            owner: owner.id,
            listing: listing.id,
        }
    }

    fn jpeg() -> ImageUpload {
        ImageUpload {
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xff, 0xd8, 0xff],
        }
    }

    #[tokio::test]
    async fn test_failed_media_write_removes_earlier_files() {
        let f = fixture(2).await;

        let result = f
            .service
            .add_images(f.listing, f.owner, vec![jpeg(), jpeg(), jpeg()])
            .await;

        assert!(matches!(result, Err(ServiceError::StorageError(_))));
        assert!(f.media.files.lock().unwrap().is_empty());
        assert!(f.store.listing_images(f.listing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_images_get_consecutive_positions() {
        let f = fixture(10).await;

        let first = f
            .service
            .add_images(f.listing, f.owner, vec![jpeg(), jpeg()])
            .await
            .unwrap();
        let second = f
            .service
            .add_images(f.listing, f.owner, vec![jpeg()])
            .await
            .unwrap();

        let positions: Vec<i32> = first.iter().chain(&second).map(|i| i.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(f.media.files.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_batch_leaves_no_files() {
        let f = fixture(10).await;
        let max = AppConfig::for_test().listings.max_images;

        let result = f
            .service
            .add_images(f.listing, f.owner, vec![jpeg(); max + 1])
            .await;

        assert!(matches!(result, Err(ServiceError::MediaError(_))));
        assert!(f.media.files.lock().unwrap().is_empty());
    }
}
