use tracing::debug;

use crate::{
    error::AppError,
    store::{FoodItem, MealStore},
};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;

/// Page size from the raw `limit` query: defaults when missing or not a
/// number, otherwise clamped to `1..=MAX_LIMIT`.
fn clamp_limit(raw: Option<&str>) -> i64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => match s.parse::<f64>() {
            Ok(n) if n.is_finite() => (n.trunc() as i64).clamp(1, MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        },
        None => DEFAULT_LIMIT,
    }
}

pub async fn search_foods(
    store: &dyn MealStore,
    q: Option<&str>,
    limit: Option<&str>,
) -> Result<Vec<FoodItem>, AppError> {
    let query = q.map(str::trim).filter(|s| !s.is_empty());
    let limit = clamp_limit(limit);
    let foods = store.search_foods(query, limit).await?;
    debug!(?query, limit, found = foods.len(), "food search");
    Ok(foods)
}
