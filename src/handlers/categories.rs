use axum::{extract::State, response::Json};

use crate::{app::AppState, models::Category, utils::ServiceError};

/// GET /categories - All categories ordered by name
#[utoipa::path(
    get,
    path = "/v1/categories",
    tag = "Categories",
    operation_id = "listCategories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ServiceError> {
    Ok(Json(state.store.list_categories().await?))
}
