// Enumerations are persisted as their lowercase text token (see each `as_str`).
macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl<DB> diesel::deserialize::FromSql<diesel::sql_types::Text, DB> for $ty
        where
            DB: diesel::backend::Backend,
            String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
        {
            fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
                let value = String::from_sql(bytes)?;
                <$ty as std::str::FromStr>::from_str(&value).map_err(|e| e.into())
            }
        }

        impl<DB> diesel::serialize::ToSql<diesel::sql_types::Text, DB> for $ty
        where
            DB: diesel::backend::Backend,
            str: diesel::serialize::ToSql<diesel::sql_types::Text, DB>,
        {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, DB>,
            ) -> diesel::serialize::Result {
                self.as_str().to_sql(out)
            }
        }
    };
}

pub mod auth;
pub mod category;
pub mod listing;
pub mod listing_image;
pub mod subscription;
pub mod user;

// Re-export common types
pub use auth::*;
pub use category::{Category, NewCategory, DEFAULT_CATEGORIES};
pub use listing::{
    Condition, CreateListingRequest, Currency, Listing, ListingChanges, ListingStatus, NewListing,
    UpdateListingRequest,
};
pub use listing_image::{ListingImage, ListingImageResponse, NewListingImage};
pub use subscription::{NewSubscription, PlanKind, Subscription, UpgradeSubscriptionRequest};
pub use user::*;
