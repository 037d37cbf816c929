// Subscription plan catalogue
// Plan limits, prices and durations come from configuration, never from call sites.

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::subscription::PlanKind;

/// Listing limit used to represent "unlimited"
pub const UNLIMITED_LISTINGS: i32 = 999_999;

/// Raw plan settings as loaded from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub freemium_listings_limit: i32,
    pub basic_listings_limit: i32,
    pub premium_listings_limit: i32,
    pub basic_price: Decimal,
    pub premium_price: Decimal,
    pub paid_duration_months: u32,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            freemium_listings_limit: 3,
            basic_listings_limit: 50,
            premium_listings_limit: UNLIMITED_LISTINGS,
            basic_price: Decimal::new(999, 2),
            premium_price: Decimal::new(2999, 2),
            paid_duration_months: 1,
        }
    }
}

/// A purchasable (or free) plan with its quota and marketing features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlanDefinition {
    pub kind: PlanKind,
    pub slug: String,
    pub listings_limit: i32,
    #[schema(value_type = String)]
    pub price: Decimal,
    /// `None` for plans that never expire
    pub duration_months: Option<u32>,
    pub features: Vec<String>,
}

impl PlanDefinition {
    pub fn is_unlimited(&self) -> bool {
        self.listings_limit >= UNLIMITED_LISTINGS
    }

    /// End of a subscription to this plan started at `starts_at`
    pub fn ends_at(&self, starts_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.duration_months
            .and_then(|months| starts_at.checked_add_months(Months::new(months)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCatalog {
    freemium: PlanDefinition,
    basic: PlanDefinition,
    premium: PlanDefinition,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::from_config(&PlanConfig::default())
    }
}

impl PlanCatalog {
    pub fn from_config(config: &PlanConfig) -> Self {
        let features = |items: &[&str]| -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        };

        Self {
            freemium: PlanDefinition {
                kind: PlanKind::Freemium,
                slug: PlanKind::Freemium.slug().to_string(),
                listings_limit: config.freemium_listings_limit,
                price: Decimal::ZERO,
                duration_months: None,
                features: [
                    vec![format!("{} free listings", config.freemium_listings_limit)],
                    features(&["Basic support", "Standard placement"]),
                ]
                .concat(),
            },
            basic: PlanDefinition {
                kind: PlanKind::Basic,
                slug: PlanKind::Basic.slug().to_string(),
                listings_limit: config.basic_listings_limit,
                price: config.basic_price,
                duration_months: Some(config.paid_duration_months),
                features: [
                    vec![format!("{} listings per month", config.basic_listings_limit)],
                    features(&["Priority support", "Enhanced placement", "Basic analytics"]),
                ]
                .concat(),
            },
            premium: PlanDefinition {
                kind: PlanKind::Premium,
                slug: PlanKind::Premium.slug().to_string(),
                listings_limit: config.premium_listings_limit,
                price: config.premium_price,
                duration_months: Some(config.paid_duration_months),
                features: features(&[
                    "Unlimited listings",
                    "VIP support",
                    "Featured placement",
                    "Advanced analytics",
                    "Priority customer support",
                ]),
            },
        }
    }

    pub fn get(&self, kind: PlanKind) -> &PlanDefinition {
        match kind {
            PlanKind::Freemium => &self.freemium,
            PlanKind::Basic => &self.basic,
            PlanKind::Premium => &self.premium,
        }
    }

    /// Every plan, cheapest first
    pub fn all(&self) -> Vec<&PlanDefinition> {
        PlanKind::ALL.iter().map(|kind| self.get(*kind)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_plan_limits() {
        let catalog = PlanCatalog::default();

        assert_eq!(catalog.get(PlanKind::Freemium).listings_limit, 3);
        assert_eq!(catalog.get(PlanKind::Basic).listings_limit, 50);
        assert_eq!(catalog.get(PlanKind::Premium).listings_limit, 999_999);
        assert!(catalog.get(PlanKind::Premium).is_unlimited());
        assert!(!catalog.get(PlanKind::Basic).is_unlimited());
        assert_eq!(catalog.get(PlanKind::Basic).price, Decimal::new(999, 2));
        assert_eq!(catalog.get(PlanKind::Premium).price, Decimal::new(2999, 2));
        assert_eq!(catalog.get(PlanKind::Freemium).features[0], "3 free listings");
    }

    #[test]
    fn test_plan_durations() {
        let catalog = PlanCatalog::default();
        let starts_at = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();

        assert_eq!(catalog.get(PlanKind::Freemium).ends_at(starts_at), None);
        assert_eq!(
            catalog.get(PlanKind::Basic).ends_at(starts_at),
            Some(Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_catalog_follows_config() {
        let config = PlanConfig {
            freemium_listings_limit: 5,
            basic_listings_limit: 20,
            ..PlanConfig::default()
        };
        let catalog = PlanCatalog::from_config(&config);

        assert_eq!(catalog.get(PlanKind::Freemium).listings_limit, 5);
        assert_eq!(catalog.get(PlanKind::Basic).features[0], "20 listings per month");
        assert_eq!(catalog.all().len(), 3);
    }
}
