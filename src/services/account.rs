// Account registration, login and profile lookup

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::MarketplaceStore;
use crate::models::{
    AuthResponse, CurrentUserResponse, LoginRequest, NewUser, RegisterRequest, UserProfile,
};
use crate::services::jwt::JwtService;
use crate::services::subscription::SubscriptionService;
use crate::utils::{hash_password, normalize_email, verify_password, PasswordConfig, ServiceError};

pub struct AccountService {
    store: Arc<dyn MarketplaceStore>,
    jwt: Arc<JwtService>,
    subscriptions: Arc<SubscriptionService>,
    password_config: PasswordConfig,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        jwt: Arc<JwtService>,
        subscriptions: Arc<SubscriptionService>,
        password_config: PasswordConfig,
    ) -> Self {
        Self {
            store,
            jwt,
            subscriptions,
            password_config,
        }
    }

    fn issue_token(&self, user_id: Uuid, email: &str) -> Result<String, ServiceError> {
        self.jwt.generate_access_token(user_id, email).map_err(|e| {
            warn!("Failed to issue access token: {}", e);
            ServiceError::InternalError
        })
    }

    /// Creates the account and its Freemium subscription, then signs the user in.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(
                "The email has already been taken.".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password, &self.password_config)
            .map_err(|e| {
                warn!("Password hashing failed: {}", e);
                ServiceError::InternalError
            })?;

        let now = Utc::now();
        let new_user = NewUser {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email: email.clone(),
            password_hash,
            account_type: request.account_type,
            country: request.country.trim().to_string(),
            state_province: request
                .state_province
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            city: request.city.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        // Account and Freemium subscription are stored together or not at all
        let (user, subscription) = self
            .subscriptions
            .create_freemium_subscription(new_user)
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                ServiceError::Conflict(_) => {
                    ServiceError::Conflict("The email has already been taken.".to_string())
                },
                other => other,
            })?;

        info!("Registered user {}", user.id);

        Ok(AuthResponse {
            access_token: self.issue_token(user.id, &user.email)?,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry(),
            user: UserProfile::from(&user),
            subscription: Some(subscription),
        })
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ServiceError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let valid = verify_password(&request.password, &user.password_hash).map_err(|e| {
            warn!("Password verification failed for user {}: {}", user.id, e);
            ServiceError::InvalidCredentials
        })?;

        if !valid {
            return Err(ServiceError::InvalidCredentials);
        }

        let subscription = self.store.current_subscription(user.id).await?;

        Ok(AuthResponse {
            access_token: self.issue_token(user.id, &user.email)?,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry(),
            user: UserProfile::from(&user),
            subscription,
        })
    }

    pub async fn me(&self, user_id: Uuid) -> Result<CurrentUserResponse, ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::Unauthorized)?;

        Ok(CurrentUserResponse {
            user: UserProfile::from(&user),
            subscription: self.store.current_subscription(user.id).await?,
        })
    }
}
