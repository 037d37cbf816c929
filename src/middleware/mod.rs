// Request middleware: JWT authentication and CORS

pub mod auth;
pub mod auth_middleware;
pub mod cors;

pub use auth::{AuthenticatedUser, MaybeUser};
pub use auth_middleware::{auth_middleware, optional_auth_middleware};
pub use cors::dynamic_cors_middleware;
