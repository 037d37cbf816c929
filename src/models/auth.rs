// Access token claims and auth responses

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{subscription::Subscription, user::UserProfile};

/// Access token claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// User ID (subject)
    pub sub: String,

    /// JWT ID (UUID format)
    pub jti: String,

    /// User email address
    pub email: String,

    pub aud: String,

    pub iss: String,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: u64,

    /// Expires at timestamp (Unix epoch seconds)
    pub exp: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserProfile,
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub user: UserProfile,
    pub subscription: Option<Subscription>,
}
