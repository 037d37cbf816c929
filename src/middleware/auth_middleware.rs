// Authentication middleware for protected and optionally-authenticated routes
// Validates bearer tokens and injects AuthenticatedUser into request extensions

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use std::convert::Infallible;

use crate::{
    app::AppState,
    middleware::auth::{AuthenticatedUser, MaybeUser},
    utils::ServiceError,
};

/// Resolve the bearer token, if any, into an identity
fn authenticate(
    app_state: &AppState,
    request: &Request<Body>,
) -> Option<Result<AuthenticatedUser, ServiceError>> {
    let bearer = request.headers().typed_get::<Authorization<Bearer>>()?;

    let result = app_state
        .jwt_service
        .validate_access_token(bearer.token())
        .map_err(|e| {
            tracing::warn!("JWT validation failed: {}", e);
            ServiceError::Unauthorized
        })
        .and_then(|claims| {
            AuthenticatedUser::try_from(claims).map_err(|e| {
                tracing::warn!("Token subject is not a user id: {}", e);
                ServiceError::Unauthorized
            })
        });

    Some(result)
}

/// Rejects the request unless it carries a valid access token
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&app_state, &request) {
        Some(Ok(auth_user)) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        },
        Some(Err(e)) => e.into_response(),
        None => ServiceError::Unauthorized.into_response(),
    }
}

/// Injects the identity when a valid token is present; invalid tokens are rejected
pub async fn optional_auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&app_state, &request) {
        Some(Ok(auth_user)) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        },
        Some(Err(e)) => e.into_response(),
        None => next.run(request).await,
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(ServiceError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}
