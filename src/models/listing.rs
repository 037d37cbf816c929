// Listing model, its enumerations, and request DTOs

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::schema::listings;

// =============================================================================
// ENUMERATIONS
// =============================================================================

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
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Used,
    NeedsRepair,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::LikeNew => "like_new",
            Condition::Used => "used",
            Condition::NeedsRepair => "needs_repair",
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Condition::New),
            "like_new" => Ok(Condition::LikeNew),
            "used" => Ok(Condition::Used),
            "needs_repair" => Ok(Condition::NeedsRepair),
            _ => Err(format!("Invalid condition: {}", s)),
        }
    }
}

text_enum_sql!(Condition);

/// ISO 4217 code; the lowercase form is accepted on input
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
pub enum Currency {
    #[serde(rename = "EUR", alias = "eur")]
    Eur,
    #[serde(rename = "BGN", alias = "bgn")]
    Bgn,
    #[serde(rename = "USD", alias = "usd")]
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Bgn => "BGN",
            Currency::Usd => "USD",
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "BGN" => Ok(Currency::Bgn),
            "USD" => Ok(Currency::Usd),
            _ => Err(format!("Invalid currency: {}", s)),
        }
    }
}

text_enum_sql!(Currency);

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Active,
    Sold,
    Draft,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Sold => "sold",
            ListingStatus::Draft => "draft",
        }
    }
}

impl FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "sold" => Ok(ListingStatus::Sold),
            "draft" => Ok(ListingStatus::Draft),
            _ => Err(format!("Invalid listing status: {}", s)),
        }
    }
}

text_enum_sql!(ListingStatus);

// =============================================================================
// DATABASE MODELS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = listings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[schema(example = json!({
    "id": "6f1c2a7e-3b7d-4e0f-9a8b-2c1d0e9f8a7b",
    "user_id": "123e4567-e89b-12d3-a456-426614174000",
    "category_id": "0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a01",
    "title": "Racing Kart Tony Kart 2022",
    "description": "Well maintained chassis, two sets of tyres included.",
    "condition": "used",
    "price": "1500.00",
    "currency": "EUR",
    "country": "Bulgaria",
    "state_province": null,
    "city": "Sofia",
    "status": "active",
    "created_at": "2025-01-10T12:00:00Z",
    "updated_at": "2025-01-10T12:00:00Z"
}))]
pub struct Listing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub condition: Condition,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub currency: Currency,
    pub country: String,
    pub state_province: Option<String>,
    pub city: String,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = listings)]
pub struct NewListing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub condition: Condition,
    pub price: Decimal,
    pub currency: Currency,
    pub country: String,
    pub state_province: Option<String>,
    pub city: String,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewListing {
    pub fn into_listing(self) -> Listing {
        Listing {
            id: self.id,
            user_id: self.user_id,
            category_id: self.category_id,
            title: self.title,
            description: self.description,
            condition: self.condition,
            price: self.price,
            currency: self.currency,
            country: self.country,
            state_province: self.state_province,
            city: self.city,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = listings)]
pub struct ListingChanges {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub condition: Option<Condition>,
    pub price: Option<Decimal>,
    pub currency: Option<Currency>,
    pub country: Option<String>,
    pub state_province: Option<Option<String>>,
    pub city: Option<String>,
    pub status: Option<ListingStatus>,
    pub updated_at: DateTime<Utc>,
}

impl ListingChanges {
    pub fn apply_to(&self, listing: &mut Listing) {
        if let Some(category_id) = self.category_id {
            listing.category_id = category_id;
        }
        if let Some(ref title) = self.title {
            listing.title = title.clone();
        }
        if let Some(ref description) = self.description {
            listing.description = description.clone();
        }
        if let Some(condition) = self.condition {
            listing.condition = condition;
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(currency) = self.currency {
            listing.currency = currency;
        }
        if let Some(ref country) = self.country {
            listing.country = country.clone();
        }
        if let Some(ref state_province) = self.state_province {
            listing.state_province = state_province.clone();
        }
        if let Some(ref city) = self.city {
            listing.city = city.clone();
        }
        if let Some(status) = self.status {
            listing.status = status;
        }
        listing.updated_at = self.updated_at;
    }
}

// =============================================================================
// REQUEST DTOs
// =============================================================================

/// Largest accepted price, NUMERIC(10,2) leaves room for 999999.99
pub fn max_price() -> Decimal {
    Decimal::new(99_999_999, 2)
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() || *price > max_price() {
        let mut error = ValidationError::new("price_range");
        error.message = Some("Price must be between 0 and 999999.99".into());
        return Err(error);
    }
    if price.normalize().scale() > 2 {
        let mut error = ValidationError::new("price_scale");
        error.message = Some("Price can have at most 2 decimal places".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "title": "Racing Kart Tony Kart 2022",
    "description": "Well maintained chassis, two sets of tyres included.",
    "category_id": "0b6c8a52-6a4e-4a54-9d0c-1f0e3f6b2a01",
    "condition": "used",
    "price": "1500.00",
    "currency": "EUR",
    "country": "Bulgaria",
    "state_province": null,
    "city": "Sofia",
    "status": "active"
}))]
pub struct CreateListingRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required (max 255 characters)"))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 5000,
        message = "Description is required (max 5000 characters)"
    ))]
    pub description: String,

    pub category_id: Uuid,

    pub condition: Condition,

    #[validate(custom = "validate_price")]
    #[schema(value_type = String)]
    pub price: Decimal,

    pub currency: Currency,

    #[validate(length(min = 1, max = 100, message = "Country is required (max 100 characters)"))]
    pub country: String,

    #[validate(length(max = 100, message = "State/province must be at most 100 characters"))]
    pub state_province: Option<String>,

    #[validate(length(min = 1, max = 100, message = "City is required (max 100 characters)"))]
    pub city: String,

    #[serde(default)]
    pub status: ListingStatus,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateListingRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: Option<String>,

    pub category_id: Option<Uuid>,

    pub condition: Option<Condition>,

    #[validate(custom = "validate_price")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,

    pub currency: Option<Currency>,

    #[validate(length(min = 1, max = 100, message = "Country must be 1-100 characters"))]
    pub country: Option<String>,

    /// An empty string clears the field
    #[validate(length(max = 100, message = "State/province must be at most 100 characters"))]
    pub state_province: Option<String>,

    #[validate(length(min = 1, max = 100, message = "City must be 1-100 characters"))]
    pub city: Option<String>,

    pub status: Option<ListingStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(price: Decimal) -> CreateListingRequest {
        CreateListingRequest {
            title: "Racing Kart".to_string(),
            description: "Fast".to_string(),
            category_id: Uuid::new_v4(),
            condition: Condition::Used,
            price,
            currency: Currency::Eur,
            country: "Bulgaria".to_string(),
            state_province: None,
            city: "Sofia".to_string(),
            status: ListingStatus::Active,
        }
    }

    #[test]
    fn test_enum_tokens_round_trip_through_from_str() {
        for condition in [
            Condition::New,
            Condition::LikeNew,
            Condition::Used,
            Condition::NeedsRepair,
        ] {
            assert_eq!(condition.as_str().parse::<Condition>(), Ok(condition));
        }
        for status in [ListingStatus::Active, ListingStatus::Sold, ListingStatus::Draft] {
            assert_eq!(status.as_str().parse::<ListingStatus>(), Ok(status));
        }
        assert_eq!("bgn".parse::<Currency>(), Ok(Currency::Bgn));
        assert!("gbp".parse::<Currency>().is_err());
    }

    #[test]
    fn test_currency_accepts_lowercase_json() {
        let currency: Currency = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(currency, Currency::Usd);
        assert_eq!(serde_json::to_string(&Currency::Usd).unwrap(), "\"USD\"");
    }

    #[test]
    fn test_price_validation() {
        assert!(create_request(Decimal::new(150000, 2)).validate().is_ok());
        assert!(create_request(Decimal::ZERO).validate().is_ok());
        assert!(create_request(max_price()).validate().is_ok());
        assert!(create_request(Decimal::new(100000000, 2)).validate().is_err());
        assert!(create_request(Decimal::new(-1, 0)).validate().is_err());
        assert!(create_request(Decimal::new(1999, 3)).validate().is_err());
    }

    #[test]
    fn test_status_defaults_to_active() {
        let json = serde_json::json!({
            "title": "Kart",
            "description": "Kart",
            "category_id": Uuid::new_v4(),
            "condition": "like_new",
            "price": "10.50",
            "currency": "eur",
            "country": "Bulgaria",
            "city": "Plovdiv"
        });
        let request: CreateListingRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.status, ListingStatus::Active);
        assert_eq!(request.condition, Condition::LikeNew);
        assert_eq!(request.price, Decimal::new(1050, 2));
    }

    #[test]
    fn test_changes_apply_to_listing() {
        let now = Utc::now();
        let mut listing = NewListing {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            title: "Old".to_string(),
            description: "Old".to_string(),
            condition: Condition::Used,
            price: Decimal::new(100, 0),
            currency: Currency::Eur,
            country: "Bulgaria".to_string(),
            state_province: Some("Sofia City".to_string()),
            city: "Sofia".to_string(),
            status: ListingStatus::Draft,
            created_at: now,
            updated_at: now,
        }
        .into_listing();

        let changes = ListingChanges {
            category_id: None,
            title: Some("New".to_string()),
            description: None,
            condition: None,
            price: Some(Decimal::new(250, 0)),
            currency: None,
            country: None,
            state_province: Some(None),
            city: None,
            status: Some(ListingStatus::Active),
            updated_at: now,
        };
        changes.apply_to(&mut listing);

        assert_eq!(listing.title, "New");
        assert_eq!(listing.description, "Old");
        assert_eq!(listing.price, Decimal::new(250, 0));
        assert_eq!(listing.state_province, None);
        assert_eq!(listing.status, ListingStatus::Active);
    }
}
