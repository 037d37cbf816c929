// User database model and registration/login DTOs

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::schema::users;

/// Seller type chosen at registration
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    ToSchema,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Individual,
    Business,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Individual => "individual",
            AccountType::Business => "business",
        }
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(AccountType::Individual),
            "business" => Ok(AccountType::Business),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

text_enum_sql!(AccountType);

/// User database model - queryable from database
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub account_type: AccountType,
    pub country: String,
    pub state_province: Option<String>,
    pub city: String,
    pub subscription_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user for insertion
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub account_type: AccountType,
    pub country: String,
    pub state_province: Option<String>,
    pub city: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user; never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub account_type: AccountType,
    pub country: String,
    pub state_province: Option<String>,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            account_type: user.account_type,
            country: user.country.clone(),
            state_province: user.state_province.clone(),
            city: user.city.clone(),
            created_at: user.created_at,
        }
    }
}

// =============================================================================
// REQUEST DTOs
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Ivan Petrov",
    "email": "ivan@example.com",
    "password": "SecurePass123",
    "password_confirmation": "SecurePass123",
    "account_type": "individual",
    "country": "Bulgaria",
    "state_province": null,
    "city": "Sofia"
}))]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required (max 255 characters)"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Password confirmation does not match"))]
    pub password_confirmation: String,

    #[serde(default)]
    pub account_type: AccountType,

    #[validate(length(min = 1, max = 100, message = "Country is required (max 100 characters)"))]
    pub country: String,

    #[validate(length(max = 100, message = "State/province must be at most 100 characters"))]
    pub state_province: Option<String>,

    #[validate(length(min = 1, max = 100, message = "City is required (max 100 characters)"))]
    pub city: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_tokens() {
        assert_eq!(AccountType::Business.as_str(), "business");
        assert_eq!("individual".parse::<AccountType>(), Ok(AccountType::Individual));
        assert!("company".parse::<AccountType>().is_err());
        assert_eq!(AccountType::default(), AccountType::Individual);
    }

    #[test]
    fn test_register_request_password_confirmation() {
        let request = RegisterRequest {
            name: "Ivan".to_string(),
            email: "ivan@example.com".to_string(),
            password: "SecurePass123".to_string(),
            password_confirmation: "Different123".to_string(),
            account_type: AccountType::Individual,
            country: "Bulgaria".to_string(),
            state_province: None,
            city: "Sofia".to_string(),
        };

        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password_confirmation"));
    }
}
