// Subscription database model and plan enumeration

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::subscriptions;

/// Subscription plan, ordered by rank (Freemium < Basic < Premium)
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
pub enum PlanKind {
    Freemium,
    Basic,
    Premium,
}

impl PlanKind {
    pub const ALL: [PlanKind; 3] = [PlanKind::Freemium, PlanKind::Basic, PlanKind::Premium];

    /// Stored plan name
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKind::Freemium => "Freemium",
            PlanKind::Basic => "Basic",
            PlanKind::Premium => "Premium",
        }
    }

    /// URL-facing plan identifier
    pub fn slug(&self) -> &'static str {
        match self {
            PlanKind::Freemium => "freemium",
            PlanKind::Basic => "basic",
            PlanKind::Premium => "premium",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            PlanKind::Freemium => 1,
            PlanKind::Basic => 2,
            PlanKind::Premium => 3,
        }
    }

    /// Plans a user may move to by upgrading
    pub fn is_purchasable(&self) -> bool {
        matches!(self, PlanKind::Basic | PlanKind::Premium)
    }
}

impl FromStr for PlanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "freemium" => Ok(PlanKind::Freemium),
            "basic" => Ok(PlanKind::Basic),
            "premium" => Ok(PlanKind::Premium),
            _ => Err(format!("Invalid plan: {}", s)),
        }
    }
}

impl std::fmt::Display for PlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

text_enum_sql!(PlanKind);

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_name: PlanKind,
    pub starts_at: DateTime<Utc>,
    /// `None` means the subscription never expires
    pub ends_at: Option<DateTime<Utc>>,
    pub listings_limit: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /subscriptions/upgrade`; the plan is parsed by the service
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpgradeSubscriptionRequest {
    #[schema(example = "basic")]
    pub plan: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_name: PlanKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub listings_limit: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewSubscription {
    pub fn into_subscription(self) -> Subscription {
        Subscription {
            id: self.id,
            user_id: self.user_id,
            plan_name: self.plan_name,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            listings_limit: self.listings_limit,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Subscription {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && self.ends_at.map_or(true, |ends_at| ends_at >= now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.is_some_and(|ends_at| ends_at < now)
    }

    /// Whole days left, `None` for subscriptions without an end date
    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> Option<i64> {
        self.ends_at
            .map(|ends_at| if ends_at <= now { 0 } else { (ends_at - now).num_days() })
    }
}
