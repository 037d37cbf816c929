// Subscription handlers: overview, upgrade confirmation, upgrade and cancel

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{Subscription, UpgradeSubscriptionRequest},
    services::subscription::{SubscriptionOverview, UpgradePreview},
    utils::ServiceError,
};

/// GET /subscriptions - Current plan, quota, catalogue and history
#[utoipa::path(
    get,
    path = "/v1/subscriptions",
    tag = "Subscriptions",
    operation_id = "subscriptionOverview",
    responses(
        (status = 200, description = "Subscription overview", body = SubscriptionOverview),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn subscription_overview(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<SubscriptionOverview>, ServiceError> {
    Ok(Json(state.subscription_service.overview(user.user_id).await?))
}

/// GET /subscriptions/plans/{plan} - Details shown before confirming an upgrade
#[utoipa::path(
    get,
    path = "/v1/subscriptions/plans/{plan}",
    tag = "Subscriptions",
    operation_id = "planDetails",
    params(("plan" = String, Path, description = "basic or premium")),
    responses(
        (status = 200, description = "Plan details", body = UpgradePreview),
        (status = 404, description = "Plan cannot be purchased")
    ),
    security(("bearerAuth" = []))
)]
pub async fn plan_details(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(plan): Path<String>,
) -> Result<Json<UpgradePreview>, ServiceError> {
    Ok(Json(
        state
            .subscription_service
            .plan_details(user.user_id, &plan)
            .await?,
    ))
}

/// POST /subscriptions/upgrade - Move to a higher plan
#[utoipa::path(
    post,
    path = "/v1/subscriptions/upgrade",
    tag = "Subscriptions",
    operation_id = "upgradeSubscription",
    request_body = UpgradeSubscriptionRequest,
    responses(
        (status = 200, description = "New current subscription", body = Subscription),
        (status = 409, description = "Downgrade or same plan"),
        (status = 422, description = "Unknown plan")
    ),
    security(("bearerAuth" = []))
)]
pub async fn upgrade_subscription(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(request): Json<UpgradeSubscriptionRequest>,
) -> Result<Json<Subscription>, ServiceError> {
    Ok(Json(
        state
            .subscription_service
            .upgrade(user.user_id, &request.plan)
            .await?,
    ))
}

/// POST /subscriptions/cancel - Return to Freemium
#[utoipa::path(
    post,
    path = "/v1/subscriptions/cancel",
    tag = "Subscriptions",
    operation_id = "cancelSubscription",
    responses(
        (status = 200, description = "New Freemium subscription", body = Subscription),
        (status = 409, description = "Already on Freemium")
    ),
    security(("bearerAuth" = []))
)]
pub async fn cancel_subscription(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Subscription>, ServiceError> {
    Ok(Json(state.subscription_service.cancel(user.user_id).await?))
}
