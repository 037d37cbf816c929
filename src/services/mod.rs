// Business logic layer
// Services receive their collaborators and configuration explicitly from AppState.

pub mod account;
pub mod jwt;
pub mod listing;
pub mod listing_query;
pub mod media;
pub mod quota;
pub mod subscription;

pub use account::AccountService;
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use listing::{ImageUpload, ListingService};
pub use listing_query::{ListingFilter, ListingQueryParams, PageRequest, Pagination};
pub use media::{LocalMediaStore, MediaError, MediaStore};
pub use quota::QuotaDecision;
pub use subscription::{QuotaStatus, SubscriptionService};
