pub mod audit_logger;
pub mod password;
pub mod service_error;
pub mod validation;

pub use audit_logger::{AuditAction, AuditLogger};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service_error::ServiceError;
pub use validation::{normalize_email, trim_optional_field};
