use std::collections::HashMap;

use serde_json::Value;
use time::{Date, Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::AppError,
    input,
    nutrition::{
        aggregate_day, aggregate_range, amortize_batch_portion, calculate_calories, day_range,
        day_range_of, normalize_name, parse_date_key, week_range, DayAggregate, DayRecord,
        MealCategory,
    },
    store::{EntrySource, MealEntry, MealStore, NewMealEntry},
};

use super::dto::CreateEntryRequest;

const HISTORY_RANGE_MSG: &str = "start and end queries must be YYYY-MM-DD and end >= start";

/// Longest span, in days, a single history request may cover.
pub const MAX_HISTORY_DAYS: i64 = 366;

/// Name, calories and origin worked out for a new entry before anything is
/// written.
struct ResolvedEntry {
    food_name: String,
    calories: Option<f64>,
    source: EntrySource,
}

pub async fn create_entry(
    store: &dyn MealStore,
    req: CreateEntryRequest,
) -> Result<MealEntry, AppError> {
    let is_batch = req.entry_type.as_ref().and_then(Value::as_str) == Some("batch");

    let weight_grams = input::positive_number(
        req.weight_grams.as_ref(),
        "weightGrams must be a positive number",
    )?;
    let category = req
        .category
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|c| c.parse::<MealCategory>().ok())
        .ok_or_else(|| AppError::invalid("invalid category"))?;
    let day = req
        .date
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|d| day_range(d).ok())
        .ok_or_else(|| AppError::InvalidDate("date is required in YYYY-MM-DD format".into()))?;

    let resolved = if is_batch {
        resolve_batch(store, req.batch_cook_id.as_ref(), weight_grams).await?
    } else {
        resolve_food(
            store,
            req.food_name.as_ref(),
            req.calories_override.as_ref(),
            weight_grams,
        )
        .await?
    };

    let entry = store
        .create_entry(NewMealEntry {
            logged_for: day.start,
            food_name: resolved.food_name,
            weight_grams,
            calories: resolved.calories,
            category,
            source: resolved.source,
        })
        .await?;

    info!(entry_id = %entry.id, meal_log_id = %entry.meal_log_id, %category, "meal entry created");
    Ok(entry)
}

async fn resolve_food(
    store: &dyn MealStore,
    food_name: Option<&Value>,
    calories_override: Option<&Value>,
    weight_grams: f64,
) -> Result<ResolvedEntry, AppError> {
    let food_name =
        input::trimmed_string(food_name).ok_or_else(|| AppError::invalid("foodName is required"))?;
    let calories_override = input::optional_non_negative(
        calories_override,
        "caloriesOverride must be a non-negative number",
    )?;

    let normalized = normalize_name(food_name);
    let food = store.find_food_by_normalized_name(&normalized).await?;

    let calories = match (calories_override, &food) {
        (Some(kcal), _) => Some(kcal),
        (None, Some(food)) => Some(calculate_calories(weight_grams, food.calories_per_100g)?),
        (None, None) => {
            debug!(%normalized, "food not in catalog; logging without calories");
            None
        }
    };

    Ok(ResolvedEntry {
        food_name: food_name.to_string(),
        calories,
        source: EntrySource::Food {
            food_item_id: food.map(|f| f.id),
        },
    })
}

async fn resolve_batch(
    store: &dyn MealStore,
    batch_cook_id: Option<&Value>,
    weight_grams: f64,
) -> Result<ResolvedEntry, AppError> {
    let raw_id = input::trimmed_string(batch_cook_id)
        .ok_or_else(|| AppError::invalid("batchCookId is required for batch entries"))?;
    let not_found = || AppError::NotFound("batch cook not found".into());

    let id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;
    let batch = store.find_batch(id).await?.ok_or_else(not_found)?;

    let calories = amortize_batch_portion(
        batch.total_calories,
        batch.total_weight_grams,
        weight_grams,
    )?;

    Ok(ResolvedEntry {
        food_name: format!("{} (Batch)", batch.name),
        calories: Some(calories),
        source: EntrySource::Batch {
            batch_cook_id: batch.id,
        },
    })
}

/// Entries logged for one day, in creation order, with their sums.
pub async fn day_entries(
    store: &dyn MealStore,
    date: Option<&str>,
) -> Result<(Vec<MealEntry>, DayAggregate), AppError> {
    let day = date
        .and_then(|d| day_range(d).ok())
        .ok_or_else(|| AppError::InvalidDate("date query must be YYYY-MM-DD".into()))?;

    let entries = store
        .find_day_log(day.start)
        .await?
        .map(|d| d.entries)
        .unwrap_or_default();
    let aggregate = aggregate_day(&entries);
    Ok((entries, aggregate))
}

/// Removes an entry and, if it was the last one, its day log.
pub async fn delete_entry(store: &dyn MealStore, entry_id: &str) -> Result<Uuid, AppError> {
    let not_found = || AppError::NotFound("meal entry not found".into());

    let id = Uuid::parse_str(entry_id.trim()).map_err(|_| not_found())?;
    let entry = store.find_entry(id).await?.ok_or_else(not_found)?;

    if !store.delete_entry(entry.id).await? {
        return Err(not_found());
    }
    if store.delete_meal_log_if_empty(entry.meal_log_id).await? {
        debug!(meal_log_id = %entry.meal_log_id, "empty meal log removed");
    }

    info!(entry_id = %entry.id, "meal entry deleted");
    Ok(entry.id)
}

pub async fn history(
    store: &dyn MealStore,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Vec<DayRecord<MealEntry>>, AppError> {
    let parse = |v: Option<&str>| {
        v.and_then(|d| parse_date_key(d).ok())
            .ok_or_else(|| AppError::InvalidDate(HISTORY_RANGE_MSG.into()))
    };
    let start = parse(start)?;
    let end = parse(end)?;
    if end < start {
        return Err(AppError::invalid(HISTORY_RANGE_MSG));
    }
    if (end - start).whole_days() >= MAX_HISTORY_DAYS {
        return Err(AppError::invalid(format!(
            "history range is limited to {MAX_HISTORY_DAYS} days"
        )));
    }
    history_between(store, start, end).await
}

/// Sunday-start week containing `date` (today when absent), moved back by
/// `offset` weeks. Returns the first and last day with the records.
pub async fn week_history(
    store: &dyn MealStore,
    date: Option<&str>,
    offset: Option<&str>,
) -> Result<(Date, Date, Vec<DayRecord<MealEntry>>), AppError> {
    let anchor = match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => parse_date_key(d)?,
        None => OffsetDateTime::now_utc().date(),
    };
    let offset = match offset.map(str::trim).filter(|o| !o.is_empty()) {
        Some(o) => o
            .parse::<u32>()
            .map_err(|_| AppError::invalid("offset must be a non-negative whole number"))?,
        None => 0,
    };

    let (first, _) = week_range(anchor)?;
    let first = first
        .checked_sub(Duration::weeks(i64::from(offset)))
        .ok_or_else(|| AppError::invalid("offset is out of range"))?;
    let last = first
        .checked_add(Duration::days(6))
        .ok_or_else(|| AppError::invalid("offset is out of range"))?;

    let days = history_between(store, first, last).await?;
    Ok((first, last, days))
}

async fn history_between(
    store: &dyn MealStore,
    start: Date,
    end: Date,
) -> Result<Vec<DayRecord<MealEntry>>, AppError> {
    let logs = store
        .list_day_logs(day_range_of(start)?.start, day_range_of(end)?.end_exclusive)
        .await?;
    let mut by_day: HashMap<Date, Vec<MealEntry>> = logs
        .into_iter()
        .map(|d| (d.log.logged_for.date(), d.entries))
        .collect();

    let days = aggregate_range(start, end, |day| by_day.remove(&day).unwrap_or_default())?;
    Ok(days)
}
