// Account handlers: registration, login and the current user

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{AuthResponse, CurrentUserResponse, LoginRequest, RegisterRequest},
    utils::ServiceError,
};

/// POST /auth/register - Create an account on the Freemium plan
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    operation_id = "register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = AuthResponse),
        (status = 409, description = "Email already taken"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state.account_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - Exchange credentials for an access token
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    operation_id = "login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServiceError> {
    Ok(Json(state.account_service.login(request).await?))
}

/// GET /auth/me - Current user and subscription
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    operation_id = "currentUser",
    responses(
        (status = 200, description = "Current user", body = CurrentUserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_current_user(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<CurrentUserResponse>, ServiceError> {
    Ok(Json(state.account_service.me(user.user_id).await?))
}
