use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tracing::info;

use crate::{
    error::AppError,
    input,
    nutrition::{calculate_calories, normalize_name},
    store::{BatchCook, CaloriesSource, FoodItem, MealStore, NewBatchCook, NewBatchItem},
};

use super::dto::CreateBatchRequest;

const ITEM_MSG: &str = "each item requires foodName and positive weightGrams";
const OVERRIDE_MSG: &str = "caloriesOverride must be a non-negative number";
const SERVINGS_MSG: &str = "servings must be a positive number";

#[derive(Debug)]
struct ValidatedItem {
    food_name: String,
    normalized_name: String,
    weight_grams: f64,
    calories_override: Option<f64>,
}

fn validate_item(item: &Value) -> Result<ValidatedItem, AppError> {
    let food_name = input::trimmed_string(item.get("foodName"));
    let weight_grams = input::positive_number(item.get("weightGrams"), ITEM_MSG).ok();
    let (Some(food_name), Some(weight_grams)) = (food_name, weight_grams) else {
        return Err(AppError::invalid(ITEM_MSG));
    };
    let calories_override = input::optional_non_negative(item.get("caloriesOverride"), OVERRIDE_MSG)?;

    Ok(ValidatedItem {
        food_name: food_name.to_string(),
        normalized_name: normalize_name(food_name),
        weight_grams,
        calories_override,
    })
}

fn parse_servings(value: Option<&Value>) -> Result<Option<i32>, AppError> {
    let Some(servings) = input::optional_positive(value, SERVINGS_MSG)? else {
        return Ok(None);
    };
    let rounded = servings.round();
    if rounded < 1.0 || rounded > f64::from(i32::MAX) {
        return Err(AppError::invalid(SERVINGS_MSG));
    }
    Ok(Some(rounded as i32))
}

/// Calories for one ingredient: an override wins, then the catalog, else
/// unknown.
fn price_item(item: &ValidatedItem, food: Option<&FoodItem>) -> Result<NewBatchItem, AppError> {
    let (calories, calories_source) = match (item.calories_override, food) {
        (Some(kcal), _) => (Some(kcal), CaloriesSource::Override),
        (None, Some(food)) => (
            Some(calculate_calories(item.weight_grams, food.calories_per_100g)?),
            CaloriesSource::Dataset,
        ),
        (None, None) => (None, CaloriesSource::Unmatched),
    };
    Ok(NewBatchItem {
        food_name: item.food_name.clone(),
        weight_grams: item.weight_grams,
        calories,
        calories_source,
        food_item_id: food.map(|f| f.id),
    })
}

/// Validates every ingredient first, then prices them against the catalog
/// and stores the batch with its totals in one go.
pub async fn create_batch(
    store: &dyn MealStore,
    req: CreateBatchRequest,
) -> Result<BatchCook, AppError> {
    let name = input::trimmed_string(req.name.as_ref())
        .ok_or_else(|| AppError::invalid("name is required"))?
        .to_string();

    let raw_items = req
        .items
        .as_ref()
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| AppError::invalid("items must contain at least one ingredient"))?;

    let servings = parse_servings(req.servings.as_ref())?;

    let items = raw_items
        .iter()
        .map(validate_item)
        .collect::<Result<Vec<_>, _>>()?;

    let names: Vec<String> = items
        .iter()
        .map(|i| i.normalized_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let foods: HashMap<String, FoodItem> = store
        .find_foods_by_normalized_names(&names)
        .await?
        .into_iter()
        .map(|f| (f.normalized_name.clone(), f))
        .collect();

    let priced = items
        .iter()
        .map(|item| price_item(item, foods.get(&item.normalized_name)))
        .collect::<Result<Vec<_>, _>>()?;

    let total_weight_grams: f64 = priced.iter().map(|i| i.weight_grams).sum();
    let total_calories: f64 = priced.iter().map(|i| i.calories.unwrap_or(0.0)).sum();

    let batch = store
        .create_batch(NewBatchCook {
            name,
            servings,
            total_weight_grams,
            total_calories,
            items: priced,
        })
        .await?;

    info!(
        batch_id = %batch.id,
        items = batch.items.len(),
        total_weight_grams,
        total_calories,
        "batch cook created"
    );
    Ok(batch)
}

pub async fn list_batches(store: &dyn MealStore) -> Result<Vec<BatchCook>, AppError> {
    Ok(store.list_batches().await?)
}
