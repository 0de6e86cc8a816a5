use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::{MealCategory, Portion};

/// Catalog entry loaded from the food dataset.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing)]
    pub normalized_name: String,
    pub calories_per_100g: f64,
    pub protein_per_100g: Option<f64>,
    pub carbs_per_100g: Option<f64>,
    pub fat_per_100g: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFoodItem {
    pub name: String,
    pub normalized_name: String,
    pub calories_per_100g: f64,
    pub protein_per_100g: Option<f64>,
    pub carbs_per_100g: Option<f64>,
    pub fat_per_100g: Option<f64>,
}

/// Where a batch ingredient's calories came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaloriesSource {
    Override,
    Dataset,
    Unmatched,
}

impl CaloriesSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Dataset => "dataset",
            Self::Unmatched => "unmatched",
        }
    }
}

impl fmt::Display for CaloriesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaloriesSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "override" => Ok(Self::Override),
            "dataset" => Ok(Self::Dataset),
            "unmatched" => Ok(Self::Unmatched),
            other => anyhow::bail!("unknown calories source {other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub id: Uuid,
    pub batch_cook_id: Uuid,
    pub food_name: String,
    pub weight_grams: f64,
    pub calories: Option<f64>,
    pub calories_source: CaloriesSource,
    pub food_item_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct BatchItemRow {
    pub id: Uuid,
    pub batch_cook_id: Uuid,
    pub food_name: String,
    pub weight_grams: f64,
    pub calories: Option<f64>,
    pub calories_source: String,
    pub food_item_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<BatchItemRow> for BatchItem {
    type Error = anyhow::Error;

    fn try_from(r: BatchItemRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: r.id,
            batch_cook_id: r.batch_cook_id,
            food_name: r.food_name,
            weight_grams: r.weight_grams,
            calories: r.calories,
            calories_source: r.calories_source.parse()?,
            food_item_id: r.food_item_id,
            created_at: r.created_at,
        })
    }
}

/// A cooked batch with totals frozen at creation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCook {
    pub id: Uuid,
    pub name: String,
    pub servings: Option<i32>,
    pub total_weight_grams: f64,
    pub total_calories: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub items: Vec<BatchItem>,
}

impl BatchCook {
    pub fn calories_per_serving(&self) -> Option<f64> {
        self.servings
            .filter(|s| *s > 0)
            .map(|s| self.total_calories / f64::from(s))
    }
}

#[derive(Debug, FromRow)]
pub struct BatchCookRow {
    pub id: Uuid,
    pub name: String,
    pub servings: Option<i32>,
    pub total_weight_grams: f64,
    pub total_calories: f64,
    pub created_at: OffsetDateTime,
}

impl BatchCookRow {
    pub fn with_items(self, items: Vec<BatchItem>) -> BatchCook {
        BatchCook {
            id: self.id,
            name: self.name,
            servings: self.servings,
            total_weight_grams: self.total_weight_grams,
            total_calories: self.total_calories,
            created_at: self.created_at,
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBatchItem {
    pub food_name: String,
    pub weight_grams: f64,
    pub calories: Option<f64>,
    pub calories_source: CaloriesSource,
    pub food_item_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBatchCook {
    pub name: String,
    pub servings: Option<i32>,
    pub total_weight_grams: f64,
    pub total_calories: f64,
    pub items: Vec<NewBatchItem>,
}

/// The container for one UTC day of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MealLog {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_for: OffsetDateTime,
}

/// What an entry was logged from. A catalog food that was not found keeps
/// `food_item_id: None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "entryType", rename_all = "lowercase")]
pub enum EntrySource {
    Food {
        #[serde(rename = "foodItemId")]
        food_item_id: Option<Uuid>,
    },
    Batch {
        #[serde(rename = "batchCookId")]
        batch_cook_id: Uuid,
    },
}

impl EntrySource {
    pub fn food_item_id(&self) -> Option<Uuid> {
        match self {
            Self::Food { food_item_id } => *food_item_id,
            Self::Batch { .. } => None,
        }
    }

    pub fn batch_cook_id(&self) -> Option<Uuid> {
        match self {
            Self::Food { .. } => None,
            Self::Batch { batch_cook_id } => Some(*batch_cook_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealEntry {
    pub id: Uuid,
    pub meal_log_id: Uuid,
    pub food_name: String,
    pub weight_grams: f64,
    pub calories: Option<f64>,
    pub category: MealCategory,
    #[serde(flatten)]
    pub source: EntrySource,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Portion for MealEntry {
    fn category(&self) -> MealCategory {
        self.category
    }
    fn weight_grams(&self) -> f64 {
        self.weight_grams
    }
    fn calories(&self) -> Option<f64> {
        self.calories
    }
}

#[derive(Debug, FromRow)]
pub struct MealEntryRow {
    pub id: Uuid,
    pub meal_log_id: Uuid,
    pub food_item_id: Option<Uuid>,
    pub batch_cook_id: Option<Uuid>,
    pub food_name: String,
    pub weight_grams: f64,
    pub calories: Option<f64>,
    pub category: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<MealEntryRow> for MealEntry {
    type Error = anyhow::Error;

    fn try_from(r: MealEntryRow) -> anyhow::Result<Self> {
        let source = match (r.batch_cook_id, r.food_item_id) {
            (Some(batch_cook_id), None) => EntrySource::Batch { batch_cook_id },
            (None, food_item_id) => EntrySource::Food { food_item_id },
            (Some(_), Some(_)) => anyhow::bail!("meal entry {} references a food and a batch", r.id),
        };
        Ok(Self {
            id: r.id,
            meal_log_id: r.meal_log_id,
            food_name: r.food_name,
            weight_grams: r.weight_grams,
            calories: r.calories,
            category: r
                .category
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown meal category {:?}", r.category))?,
            source,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMealEntry {
    /// UTC midnight of the day the entry belongs to.
    pub logged_for: OffsetDateTime,
    pub food_name: String,
    pub weight_grams: f64,
    pub calories: Option<f64>,
    pub category: MealCategory,
    pub source: EntrySource,
}

/// A day log together with its entries in creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct DayLog {
    pub log: MealLog,
    pub entries: Vec<MealEntry>,
}
