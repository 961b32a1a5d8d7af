use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::categories::dto::CategoriesResponse;
use crate::categories::services::list_categories;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/categories", get(get_categories))
}

#[instrument(skip(state))]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let result = list_categories(state.categories.as_ref()).await?;
    Ok(Json(CategoriesResponse {
        categories: result.categories,
        total_count: result.total_count,
    }))
}
