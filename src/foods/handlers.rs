use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{error::AppError, state::AppState};

use super::dto::{FoodListResponse, FoodSearchQuery};
use super::services;

pub fn food_routes() -> Router<AppState> {
    Router::new().route("/foods", get(search_foods))
}

/// GET /foods?q=chicken&limit=20
#[instrument(skip(state))]
pub async fn search_foods(
    State(state): State<AppState>,
    Query(q): Query<FoodSearchQuery>,
) -> Result<Json<FoodListResponse>, AppError> {
    let foods =
        services::search_foods(state.store.as_ref(), q.q.as_deref(), q.limit.as_deref()).await?;
    Ok(Json(FoodListResponse { foods }))
}
