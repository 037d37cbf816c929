// Audit trail for listing and subscription changes
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    ListingCreated,
    ListingUpdated,
    ListingDeleted,
    ListingImageAdded,
    ListingImageRemoved,
    SubscriptionStarted,
    SubscriptionUpgraded,
    SubscriptionCancelled,
}

impl AuditAction {
    fn resource_type(&self) -> &'static str {
        match self {
            AuditAction::ListingCreated
            | AuditAction::ListingUpdated
            | AuditAction::ListingDeleted => "listing",
            AuditAction::ListingImageAdded | AuditAction::ListingImageRemoved => "listing_image",
            AuditAction::SubscriptionStarted
            | AuditAction::SubscriptionUpgraded
            | AuditAction::SubscriptionCancelled => "subscription",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub action: AuditAction,
    pub user_id: Uuid,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        action: AuditAction,
        user_id: Uuid,
        resource_id: Option<Uuid>,
        details: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            user_id,
            resource_id: resource_id.map(|id| id.to_string()),
            resource_type: action.resource_type().to_string(),
            details,
            timestamp: Utc::now(),
        }
    }
}

pub struct AuditLogger;

impl AuditLogger {
    /// Emit an audit event on the `audit` tracing target
    pub fn log(
        action: AuditAction,
        user_id: Uuid,
        resource_id: Option<Uuid>,
        details: Option<String>,
    ) {
        let audit_log = AuditLog::new(action, user_id, resource_id, details);

        let json_log = serde_json::to_string(&audit_log).unwrap_or_else(|e| {
            warn!("Failed to serialize audit log: {}", e);
            format!("{:?}", audit_log)
        });

        info!(target: "audit", "{}", json_log);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_follows_action() {
        let log = AuditLog::new(
            AuditAction::SubscriptionUpgraded,
            Uuid::new_v4(),
            None,
            Some("Freemium -> Basic".to_string()),
        );
        assert_eq!(log.resource_type, "subscription");

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["action"], "SubscriptionUpgraded");
    }
}
