// Listing quota decisions
// Pure functions over (current subscription, active listing count); every caller that
// needs to know whether a listing may be created goes through `evaluate`.

use serde::Serialize;

use crate::models::subscription::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum QuotaDecision {
    /// A new active listing fits; `remaining` counts the slots before this one is used
    Allowed { remaining: i64 },
    /// Users without a subscription have zero quota
    NoSubscription,
    LimitReached { limit: i64, active: i64 },
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }

    pub fn remaining(&self) -> i64 {
        match self {
            QuotaDecision::Allowed { remaining } => *remaining,
            QuotaDecision::NoSubscription | QuotaDecision::LimitReached { .. } => 0,
        }
    }
}

/// Decide whether one more active listing is permitted.
pub fn evaluate(subscription: Option<&Subscription>, active_listings: i64) -> QuotaDecision {
    let Some(subscription) = subscription else {
        return QuotaDecision::NoSubscription;
    };

    let limit = i64::from(subscription.listings_limit);
    if active_listings < limit {
        QuotaDecision::Allowed {
            remaining: limit - active_listings,
        }
    } else {
        QuotaDecision::LimitReached {
            limit,
            active: active_listings,
        }
    }
}

pub fn can_create_listing(subscription: Option<&Subscription>, active_listings: i64) -> bool {
    evaluate(subscription, active_listings).is_allowed()
}

/// `max(0, limit - active)`, or 0 without a subscription
pub fn remaining_listings(subscription: Option<&Subscription>, active_listings: i64) -> i64 {
    evaluate(subscription, active_listings).remaining()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::PlanKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn subscription(limit: i32) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_name: PlanKind::Freemium,
            starts_at: now,
            ends_at: None,
            listings_limit: limit,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_no_subscription_fails_closed() {
        assert_eq!(evaluate(None, 0), QuotaDecision::NoSubscription);
        assert!(!can_create_listing(None, 0));
        assert_eq!(remaining_listings(None, 0), 0);
    }

    #[test]
    fn test_freemium_accepts_third_and_rejects_fourth() {
        let freemium = subscription(3);

        assert!(can_create_listing(Some(&freemium), 2));
        assert_eq!(remaining_listings(Some(&freemium), 2), 1);

        assert_eq!(
            evaluate(Some(&freemium), 3),
            QuotaDecision::LimitReached {
                limit: 3,
                active: 3
            }
        );
        assert_eq!(remaining_listings(Some(&freemium), 3), 0);
    }

    #[test]
    fn test_remaining_never_negative() {
        // A downgrade can leave more active listings than the new limit allows
        let basic = subscription(50);

        assert_eq!(remaining_listings(Some(&basic), 75), 0);
        assert!(!can_create_listing(Some(&basic), 75));
    }

    #[test]
    fn test_remaining_is_limit_minus_active() {
        let basic = subscription(50);

        for active in [0_i64, 1, 25, 49, 50] {
            assert_eq!(remaining_listings(Some(&basic), active), (50 - active).max(0));
        }
    }

    #[test]
    fn test_zero_limit_blocks_everything() {
        let locked = subscription(0);

        assert!(!can_create_listing(Some(&locked), 0));
        assert_eq!(remaining_listings(Some(&locked), 0), 0);
    }
}
