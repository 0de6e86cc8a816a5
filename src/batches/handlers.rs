use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::instrument;

use crate::{error::AppError, state::AppState};

use super::dto::{BatchListResponse, CreateBatchRequest, CreatedBatchResponse};
use super::services;

pub fn batch_routes() -> Router<AppState> {
    Router::new().route("/batches", get(list_batches).post(create_batch))
}

#[instrument(skip(state))]
pub async fn list_batches(
    State(state): State<AppState>,
) -> Result<Json<BatchListResponse>, AppError> {
    let batches = services::list_batches(state.store.as_ref()).await?;
    Ok(Json(BatchListResponse {
        batches: batches.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, body))]
pub async fn create_batch(
    State(state): State<AppState>,
    Json(body): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<CreatedBatchResponse>), AppError> {
    let batch = services::create_batch(state.store.as_ref(), body).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedBatchResponse {
            batch: batch.into(),
        }),
    ))
}
