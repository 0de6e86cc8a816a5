use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::AppError,
    nutrition::{date_key, range_totals},
    state::AppState,
};

use super::dto::{
    CreateEntryRequest, CreatedEntryResponse, DayEntriesResponse, DayQuery, DeletedEntryResponse,
    HistoryQuery, HistoryResponse, WeekQuery, WeekResponse,
};
use super::services;

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_day_entries).post(create_entry))
        .route("/meals/:entry_id", delete(delete_entry))
}

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/history", get(get_history))
        .route("/meals/history/week", get(get_week_history))
}

/// GET /meals?date=YYYY-MM-DD
#[instrument(skip(state))]
pub async fn list_day_entries(
    State(state): State<AppState>,
    Query(q): Query<DayQuery>,
) -> Result<Json<DayEntriesResponse>, AppError> {
    let (entries, aggregate) = services::day_entries(state.store.as_ref(), q.date.as_deref()).await?;
    Ok(Json(DayEntriesResponse { entries, aggregate }))
}

/// POST /meals
#[instrument(skip(state, body))]
pub async fn create_entry(
    State(state): State<AppState>,
    Json(body): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<CreatedEntryResponse>), AppError> {
    let entry = services::create_entry(state.store.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(CreatedEntryResponse { entry })))
}

/// DELETE /meals/:entry_id
#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<DeletedEntryResponse>, AppError> {
    let deleted_id = services::delete_entry(state.store.as_ref(), &entry_id).await?;
    Ok(Json(DeletedEntryResponse { deleted_id }))
}

/// GET /meals/history?start=YYYY-MM-DD&end=YYYY-MM-DD
#[instrument(skip(state))]
pub async fn get_history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let days = services::history(state.store.as_ref(), q.start.as_deref(), q.end.as_deref()).await?;
    let totals = range_totals(&days);
    Ok(Json(HistoryResponse { days, totals }))
}

/// GET /meals/history/week?date=YYYY-MM-DD&offset=N
#[instrument(skip(state))]
pub async fn get_week_history(
    State(state): State<AppState>,
    Query(q): Query<WeekQuery>,
) -> Result<Json<WeekResponse>, AppError> {
    let (first, last, days) =
        services::week_history(state.store.as_ref(), q.date.as_deref(), q.offset.as_deref())
            .await?;
    let totals = range_totals(&days);
    Ok(Json(WeekResponse {
        start: date_key(first),
        end: date_key(last),
        days,
        totals,
    }))
}
