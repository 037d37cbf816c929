// Subscription lifecycle: freemium on signup, upgrades, cancellation and quota queries
// Quota arithmetic lives in `services::quota`; this service loads the inputs and
// applies plan transitions through the store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{PlanCatalog, PlanDefinition};
use crate::db::MarketplaceStore;
use crate::models::{NewSubscription, NewUser, PlanKind, Subscription, User};
use crate::services::quota;
use crate::utils::{AuditAction, AuditLogger, ServiceError};

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Current quota position of a user
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuotaStatus {
    pub can_create_listing: bool,
    pub remaining_listings: i64,
    pub active_listings_count: i64,
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionOverview {
    pub current_subscription: Option<Subscription>,
    pub plans: Vec<PlanDefinition>,
    pub can_create_listing: bool,
    pub remaining_listings: i64,
    pub active_listings_count: i64,
    /// Whole days until the current plan ends, `None` for Freemium
    pub days_remaining: Option<i64>,
    /// Expired plans still carry their quota until replaced
    pub is_expired: bool,
    /// Most recent first, including ended subscriptions
    pub history: Vec<Subscription>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpgradePreview {
    pub plan: PlanDefinition,
    pub current_subscription: Option<Subscription>,
}

// =============================================================================
// SERVICE
// =============================================================================

pub struct SubscriptionService {
    store: Arc<dyn MarketplaceStore>,
    plans: PlanCatalog,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn MarketplaceStore>, plans: PlanCatalog) -> Self {
        Self { store, plans }
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.plans
    }

    fn new_subscription(
        &self,
        user_id: Uuid,
        kind: PlanKind,
        now: DateTime<Utc>,
    ) -> NewSubscription {
        let plan = self.plans.get(kind);

        NewSubscription {
            id: Uuid::new_v4(),
            user_id,
            plan_name: kind,
            starts_at: now,
            ends_at: plan.ends_at(now),
            listings_limit: plan.listings_limit,
            created_at: now,
            updated_at: now,
        }
    }

    /// Subscription, active count and the derived quota in one read
    #[instrument(skip(self))]
    pub async fn quota_status(&self, user_id: Uuid) -> Result<QuotaStatus, ServiceError> {
        let subscription = self.store.current_subscription(user_id).await?;
        let active = self.store.count_active_listings(user_id).await?;
        let decision = quota::evaluate(subscription.as_ref(), active);

        Ok(QuotaStatus {
            can_create_listing: decision.is_allowed(),
            remaining_listings: decision.remaining(),
            active_listings_count: active,
            subscription,
        })
    }

    pub async fn can_create_listing(&self, user_id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.quota_status(user_id).await?.can_create_listing)
    }

    pub async fn remaining_listings(&self, user_id: Uuid) -> Result<i64, ServiceError> {
        Ok(self.quota_status(user_id).await?.remaining_listings)
    }

    /// Stores a new account together with its never-expiring Freemium plan.
    /// This is the only place a Freemium subscription is created for a fresh user.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_freemium_subscription(
        &self,
        user: NewUser,
    ) -> Result<(User, Subscription), ServiceError> {
        let now = Utc::now();
        let freemium = self.new_subscription(user.id, PlanKind::Freemium, now);
        let (user, subscription) = self.store.register_user(user, freemium).await?;

        AuditLogger::log(
            AuditAction::SubscriptionStarted,
            user.id,
            Some(subscription.id),
            Some(PlanKind::Freemium.to_string()),
        );

        Ok((user, subscription))
    }

    /// Moves the user to a higher plan; the current subscription is ended, not deleted.
    #[instrument(skip(self))]
    pub async fn upgrade(&self, user_id: Uuid, plan: &str) -> Result<Subscription, ServiceError> {
        let target = PlanKind::from_str(plan)
            .ok()
            .filter(PlanKind::is_purchasable)
            .ok_or_else(|| {
                ServiceError::ValidationError(
                    "plan: The selected plan is invalid. Choose basic or premium.".to_string(),
                )
            })?;

        let current = self.store.current_subscription(user_id).await?;

        if let Some(ref current) = current {
            let current_kind = current.plan_name;
            if current_kind.rank() > target.rank() {
                warn!(
                    "User {} attempted downgrade from {} to {}",
                    user_id, current_kind, target
                );
                return Err(ServiceError::InvalidPlanTransition(format!(
                    "You cannot downgrade from {} to {}. Please contact support.",
                    current_kind, target
                )));
            }
            if current_kind == target {
                return Err(ServiceError::InvalidPlanTransition(format!(
                    "You are already on the {} plan.",
                    target
                )));
            }
        }

        let now = Utc::now();
        let subscription = self
            .store
            .start_subscription(self.new_subscription(user_id, target, now), now)
            .await?;

        let from = current
            .map(|s| s.plan_name.to_string())
            .unwrap_or_else(|| "none".to_string());
        info!("User {} upgraded from {} to {}", user_id, from, target);
        AuditLogger::log(
            AuditAction::SubscriptionUpgraded,
            user_id,
            Some(subscription.id),
            Some(format!("{} -> {}", from, target)),
        );

        Ok(subscription)
    }

    /// Ends a paid plan and returns the user to Freemium
    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid) -> Result<Subscription, ServiceError> {
        let current = self.store.current_subscription(user_id).await?;

        if current
            .as_ref()
            .is_some_and(|s| s.plan_name == PlanKind::Freemium)
        {
            return Err(ServiceError::InvalidPlanTransition(
                "You are already on the Freemium plan.".to_string(),
            ));
        }

        let now = Utc::now();
        let subscription = self
            .store
            .start_subscription(self.new_subscription(user_id, PlanKind::Freemium, now), now)
            .await?;

        AuditLogger::log(
            AuditAction::SubscriptionCancelled,
            user_id,
            Some(subscription.id),
            current.map(|s| format!("{} -> {}", s.plan_name, PlanKind::Freemium)),
        );

        Ok(subscription)
    }

    #[instrument(skip(self))]
    pub async fn overview(&self, user_id: Uuid) -> Result<SubscriptionOverview, ServiceError> {
        let status = self.quota_status(user_id).await?;
        let history = self.store.subscription_history(user_id).await?;
        let now = Utc::now();

        Ok(SubscriptionOverview {
            days_remaining: status
                .subscription
                .as_ref()
                .and_then(|s| s.days_remaining_at(now)),
            is_expired: status
                .subscription
                .as_ref()
                .is_some_and(|s| s.is_expired_at(now)),
            current_subscription: status.subscription,
            plans: self.plans.all().into_iter().cloned().collect(),
            can_create_listing: status.can_create_listing,
            remaining_listings: status.remaining_listings,
            active_listings_count: status.active_listings_count,
            history,
        })
    }

    /// Details for confirming an upgrade; only purchasable plans exist here
    pub async fn plan_details(
        &self,
        user_id: Uuid,
        plan: &str,
    ) -> Result<UpgradePreview, ServiceError> {
        let kind = PlanKind::from_str(plan)
            .ok()
            .filter(PlanKind::is_purchasable)
            .ok_or(ServiceError::NotFound)?;

        Ok(UpgradePreview {
            plan: self.plans.get(kind).clone(),
            current_subscription: self.store.current_subscription(user_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::AccountType;

    fn new_user() -> NewUser {
        let now = Utc::now();
        NewUser {
            id: Uuid::new_v4(),
            name: "Driver".to_string(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "hash".to_string(),
            account_type: AccountType::Individual,
            country: "Bulgaria".to_string(),
            state_province: None,
            city: "Sofia".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn service() -> SubscriptionService {
        SubscriptionService::new(Arc::new(MemoryStore::new()), PlanCatalog::default())
    }

    /// Service plus a freshly registered Freemium user
    async fn setup() -> (SubscriptionService, Uuid) {
        let service = service();
        let (user, _) = service.create_freemium_subscription(new_user()).await.unwrap();
        (service, user.id)
    }

    #[tokio::test]
    async fn test_user_without_subscription_cannot_create() {
        let service = service();
        let user_id = Uuid::new_v4();

        assert!(!service.can_create_listing(user_id).await.unwrap());
        assert_eq!(service.remaining_listings(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_freemium_has_three_listings_and_no_end() {
        let service = service();
        let (user, subscription) = service.create_freemium_subscription(new_user()).await.unwrap();
        let user_id = user.id;

        assert_eq!(user.subscription_id, Some(subscription.id));
        assert_eq!(service.overview(user_id).await.unwrap().history.len(), 1);

        assert_eq!(subscription.plan_name, PlanKind::Freemium);
        assert_eq!(subscription.listings_limit, 3);
        assert_eq!(subscription.ends_at, None);
        assert_eq!(service.remaining_listings(user_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_upgrade_to_basic_sets_limit_and_month() {
        let (service, user_id) = setup().await;

        let basic = service.upgrade(user_id, "basic").await.unwrap();
        assert_eq!(basic.plan_name, PlanKind::Basic);
        assert_eq!(basic.listings_limit, 50);
        let ends_at = basic.ends_at.expect("paid plans expire");
        assert!(ends_at > basic.starts_at + chrono::Duration::days(27));
        assert!(ends_at <= basic.starts_at + chrono::Duration::days(31));
        assert_eq!(service.remaining_listings(user_id).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_premium_cannot_downgrade_to_basic() {
        let (service, user_id) = setup().await;
        let premium = service.upgrade(user_id, "premium").await.unwrap();

        let result = service.upgrade(user_id, "basic").await;
        assert!(matches!(result, Err(ServiceError::InvalidPlanTransition(_))));

        let current = service.quota_status(user_id).await.unwrap().subscription;
        assert_eq!(current, Some(premium));
    }

    #[tokio::test]
    async fn test_upgrade_rejects_unknown_plan() {
        let (service, user_id) = setup().await;

        assert!(matches!(
            service.upgrade(user_id, "gold").await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.upgrade(user_id, "freemium").await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_returns_to_freemium_and_keeps_history() {
        let (service, user_id) = setup().await;
        service.upgrade(user_id, "basic").await.unwrap();

        let freemium = service.cancel(user_id).await.unwrap();
        assert_eq!(freemium.plan_name, PlanKind::Freemium);

        let overview = service.overview(user_id).await.unwrap();
        assert!(overview.can_create_listing);
        assert_eq!(overview.days_remaining, None);
        assert!(!overview.is_expired);
        assert_eq!(overview.history.len(), 3);
        assert_eq!(overview.plans.len(), 3);
        assert_eq!(overview.current_subscription.map(|s| s.id), Some(freemium.id));
        assert!(overview
            .history
            .iter()
            .filter(|s| s.id != freemium.id)
            .all(|s| s.ends_at.is_some()));
    }

    #[tokio::test]
    async fn test_cancel_on_freemium_is_rejected() {
        let (service, user_id) = setup().await;

        assert!(matches!(
            service.cancel(user_id).await,
            Err(ServiceError::InvalidPlanTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_plan_details_only_for_paid_plans() {
        let (service, user_id) = setup().await;

        let preview = service.plan_details(user_id, "premium").await.unwrap();
        assert!(preview.plan.is_unlimited());
        assert!(matches!(
            service.plan_details(user_id, "freemium").await,
            Err(ServiceError::NotFound)
        ));
    }
}
