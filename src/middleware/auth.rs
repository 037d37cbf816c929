// Authenticated identity injected by the JWT middleware

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::auth::AccessTokenClaims;

/// Authenticated user information extracted from a validated access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub token_id: String,
    pub email: String,
    pub exp: u64,
}

impl TryFrom<AccessTokenClaims> for AuthenticatedUser {
    type Error = uuid::Error;

    fn try_from(claims: AccessTokenClaims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: Uuid::parse_str(&claims.sub)?,
            token_id: claims.jti,
            email: claims.email,
            exp: claims.exp,
        })
    }
}

/// Identity on routes where signing in is optional
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl MaybeUser {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.user_id)
    }
}
