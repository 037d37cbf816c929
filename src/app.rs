// Application state shared across handlers
use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    config::PlanCatalog,
    db::MarketplaceStore,
    services::{
        AccountService, JwtConfig, JwtService, ListingService, MediaStore, SubscriptionService,
    },
    utils::PasswordConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn MarketplaceStore>,
    pub media: Arc<dyn MediaStore>,
    pub jwt_service: Arc<JwtService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub listing_service: Arc<ListingService>,
    pub account_service: Arc<AccountService>,
}

impl AppState {
    /// Wire every service from the configuration and the two storage backends
    pub fn new(
        config: AppConfig,
        store: Arc<dyn MarketplaceStore>,
        media: Arc<dyn MediaStore>,
        password_config: PasswordConfig,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::new(JwtConfig::from_app_config(&config)));

        let subscription_service = Arc::new(SubscriptionService::new(
            store.clone(),
            PlanCatalog::from_config(&config.plans),
        ));

        let listing_service = Arc::new(ListingService::new(
            store.clone(),
            media.clone(),
            subscription_service.clone(),
            config.listings.clone(),
        ));

        let account_service = Arc::new(AccountService::new(
            store.clone(),
            jwt_service.clone(),
            subscription_service.clone(),
            password_config,
        ));

        Self {
            config: Arc::new(config),
            store,
            media,
            jwt_service,
            subscription_service,
            listing_service,
            account_service,
        }
    }
}
