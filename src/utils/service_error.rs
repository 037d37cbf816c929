// Service error type shared by every service and converted to JSON at the HTTP boundary
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;
use crate::services::quota::QuotaDecision;

pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "You have reached your listing limit. Please upgrade your subscription to create more listings.";
pub const FORBIDDEN_LISTING_MESSAGE: &str = "You do not have permission to modify this listing";
pub const UPGRADE_URL: &str = "/v1/subscriptions";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found")]
    NotFound,

    #[error("Listing quota exceeded ({active}/{limit})")]
    QuotaExceeded { limit: i64, active: i64 },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid plan transition: {0}")]
    InvalidPlanTransition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Media error: {0}")]
    MediaError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal server error")]
    InternalError,
}

impl ServiceError {
    pub fn forbidden_listing() -> Self {
        ServiceError::Forbidden(FORBIDDEN_LISTING_MESSAGE.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DatabaseError(_)
            | ServiceError::StorageError(_)
            | ServiceError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::InvalidPlanTransition(_) | ServiceError::Conflict(_) => {
                StatusCode::CONFLICT
            },
            ServiceError::InvalidCredentials | ServiceError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            },
            ServiceError::MediaError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ServiceError::QuotaExceeded { limit, active } => json!({
                "error": QUOTA_EXCEEDED_MESSAGE,
                "status": status.as_u16(),
                "limit": limit,
                "active": active,
                "upgrade_url": UPGRADE_URL,
            }),
            other => {
                let message = match other {
                    ServiceError::DatabaseError(msg) | ServiceError::StorageError(msg) => {
                        // Internals stay in the logs
                        error!("Request failed: {}", msg);
                        "Internal server error".to_string()
                    },
                    ServiceError::InternalError => "Internal server error".to_string(),
                    ServiceError::ValidationError(msg)
                    | ServiceError::Forbidden(msg)
                    | ServiceError::InvalidPlanTransition(msg)
                    | ServiceError::Conflict(msg)
                    | ServiceError::MediaError(msg) => msg,
                    ServiceError::NotFound => "Resource not found".to_string(),
                    ServiceError::InvalidCredentials => "Invalid email or password".to_string(),
                    ServiceError::Unauthorized => "Unauthorized".to_string(),
                    ServiceError::QuotaExceeded { .. } => QUOTA_EXCEEDED_MESSAGE.to_string(),
                };

                json!({
                    "error": message,
                    "status": status.as_u16()
                })
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<QuotaDecision> for ServiceError {
    fn from(decision: QuotaDecision) -> Self {
        match decision {
            QuotaDecision::LimitReached { limit, active } => {
                ServiceError::QuotaExceeded { limit, active }
            },
            QuotaDecision::NoSubscription => ServiceError::QuotaExceeded {
                limit: 0,
                active: 0,
            },
            // Callers only convert denials
            QuotaDecision::Allowed { .. } => ServiceError::InternalError,
        }
    }
}

// Conversion from various error types
impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Pool(msg) | StoreError::Database(msg) => ServiceError::DatabaseError(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(format_validation_errors(&errors))
    }
}

/// `field: message` pairs joined with `; `, sorted by field name
pub fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
        #[validate(length(min = 1))]
        city: String,
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::QuotaExceeded { limit: 3, active: 3 }.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ServiceError::forbidden_listing().status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::InvalidPlanTransition("no".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::ValidationError("bad".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_validation_errors_are_joined_per_field() {
        let sample = Sample {
            title: String::new(),
            city: String::new(),
        };
        let errors = sample.validate().unwrap_err();

        assert_eq!(
            format_validation_errors(&errors),
            "city: length; title: Title is required"
        );
    }

    #[test]
    fn test_quota_denial_conversion() {
        let error = ServiceError::from(QuotaDecision::LimitReached { limit: 3, active: 3 });
        assert!(matches!(
            error,
            ServiceError::QuotaExceeded { limit: 3, active: 3 }
        ));
    }
}
