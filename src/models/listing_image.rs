use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::listing_images;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = listing_images)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ListingImage {
    pub id: Uuid,
    pub listing_id: Uuid,
    /// Storage key returned by the media store
    pub path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = listing_images)]
pub struct NewListingImage {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl NewListingImage {
    pub fn into_image(self) -> ListingImage {
        ListingImage {
            id: self.id,
            listing_id: self.listing_id,
            path: self.path,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            position: self.position,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListingImageResponse {
    pub id: Uuid,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub position: i32,
}
