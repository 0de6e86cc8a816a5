//! Loads the JSON-lines food dataset into the catalog.
//!
//! Each non-blank line is an object like
//! `{"name": "Chicken Breast", "caloriesPer100g": 165, "proteinPer100g": 31}`.
//! Lines with a blank name are skipped; the whole file is checked before
//! anything is written.

use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{
    input::{number_field, NumberField},
    nutrition::normalize_name,
    store::{MealStore, NewFoodItem},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodRecord {
    #[serde(default)]
    name: Option<String>,
    calories_per_100g: Option<Value>,
    protein_per_100g: Option<Value>,
    carbs_per_100g: Option<Value>,
    fat_per_100g: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub upserted: usize,
    pub skipped: usize,
}

fn density(value: Option<&Value>, field: &str, required: bool) -> anyhow::Result<Option<f64>> {
    match number_field(value) {
        NumberField::Number(n) if n >= 0.0 => Ok(Some(n)),
        NumberField::Absent if !required => Ok(None),
        NumberField::Absent => bail!("{field} is required"),
        _ => bail!("{field} must be a non-negative number"),
    }
}

/// `Ok(None)` for a record that should be skipped.
fn parse_line(line: &str) -> anyhow::Result<Option<NewFoodItem>> {
    let record: FoodRecord = serde_json::from_str(line).context("invalid JSON")?;
    let name = record.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Ok(None);
    }

    let calories_per_100g = density(record.calories_per_100g.as_ref(), "caloriesPer100g", true)?
        .unwrap_or_default();
    Ok(Some(NewFoodItem {
        name: name.to_string(),
        normalized_name: normalize_name(name),
        calories_per_100g,
        protein_per_100g: density(record.protein_per_100g.as_ref(), "proteinPer100g", false)?,
        carbs_per_100g: density(record.carbs_per_100g.as_ref(), "carbsPer100g", false)?,
        fat_per_100g: density(record.fat_per_100g.as_ref(), "fatPer100g", false)?,
    }))
}

/// Parses the whole dataset, returning the foods to upsert and the number
/// of skipped records.
pub fn parse_dataset(raw: &str) -> anyhow::Result<(Vec<NewFoodItem>, usize)> {
    let mut foods = Vec::new();
    let mut skipped = 0;
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line).with_context(|| format!("line {}", idx + 1))? {
            Some(food) => foods.push(food),
            None => skipped += 1,
        }
    }
    Ok((foods, skipped))
}

pub async fn sync_foods(store: &dyn MealStore, raw: &str) -> anyhow::Result<SyncReport> {
    let (foods, skipped) = parse_dataset(raw)?;
    let mut upserted = 0;
    for food in foods {
        store.upsert_food(food).await?;
        upserted += 1;
    }
    Ok(SyncReport { upserted, skipped })
}

pub async fn sync_foods_file(store: &dyn MealStore, path: &Path) -> anyhow::Result<SyncReport> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let report = sync_foods(store, &raw).await?;
    info!(
        path = %path.display(),
        upserted = report.upserted,
        skipped = report.skipped,
        "food dataset synced"
    );
    Ok(report)
}
