//! Derived nutrition values: name keys, calorie math, day buckets and
//! history aggregation. Everything here is pure; callers supply the data.

mod aggregate;
mod days;

pub use aggregate::{
    aggregate_day, aggregate_range, range_totals, CategoryTotals, DayAggregate, DayRecord,
    Portion, Totals,
};
pub use days::{date_key, day_range, day_range_of, parse_date_key, week_range, DayRange};

use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NutritionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("batch cook has invalid total weight")]
    InvalidBatch,
}

pub type Result<T> = std::result::Result<T, NutritionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealCategory {
    Lunch,
    Dinner,
    Snacks,
}

impl MealCategory {
    pub const ALL: [MealCategory; 3] = [Self::Lunch, Self::Dinner, Self::Snacks];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snacks => "snacks",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealCategory {
    type Err = NutritionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snacks" => Ok(Self::Snacks),
            _ => Err(NutritionError::InvalidInput("invalid category".into())),
        }
    }
}

/// Lookup key for a food name: trimmed, lowercased, inner whitespace runs
/// collapsed to one space.
pub fn normalize_name(raw: &str) -> String {
    lazy_static! {
        static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
    }
    WS_RE.replace_all(raw.trim(), " ").to_lowercase()
}

/// Rounds to 2 decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Calories in `weight_grams` of a food with the given per-100g density.
pub fn calculate_calories(weight_grams: f64, calories_per_100g: f64) -> Result<f64> {
    if !weight_grams.is_finite() || weight_grams <= 0.0 {
        return Err(NutritionError::InvalidInput(
            "weightGrams must be a positive number".into(),
        ));
    }
    if !calories_per_100g.is_finite() || calories_per_100g < 0.0 {
        return Err(NutritionError::InvalidInput(
            "caloriesPer100g must be a non-negative number".into(),
        ));
    }
    Ok(round2(weight_grams * calories_per_100g / 100.0))
}

/// Calories of a portion cut from a saved batch, at the batch's average
/// calories per gram.
///
/// Batch totals are computed once at creation and trusted afterwards, so the
/// weight is checked here rather than when the batch was saved.
pub fn amortize_batch_portion(
    total_calories: f64,
    total_weight_grams: f64,
    portion_weight_grams: f64,
) -> Result<f64> {
    if !total_weight_grams.is_finite() || total_weight_grams <= 0.0 {
        return Err(NutritionError::InvalidBatch);
    }
    if !portion_weight_grams.is_finite() || portion_weight_grams <= 0.0 {
        return Err(NutritionError::InvalidInput(
            "weightGrams must be a positive number".into(),
        ));
    }
    let calories_per_gram = total_calories / total_weight_grams;
    Ok(round2(portion_weight_grams * calories_per_gram))
}
