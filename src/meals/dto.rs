use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::nutrition::{DayAggregate, DayRecord, Totals};
use crate::store::MealEntry;

/// Body of `POST /meals`. Fields stay loosely typed so bad values get a
/// precise rejection message instead of a generic decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub entry_type: Option<Value>,
    pub food_name: Option<Value>,
    pub batch_cook_id: Option<Value>,
    pub weight_grams: Option<Value>,
    pub category: Option<Value>,
    pub date: Option<Value>,
    pub calories_override: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub date: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntriesResponse {
    pub entries: Vec<MealEntry>,
    #[serde(flatten)]
    pub aggregate: DayAggregate,
}

#[derive(Debug, Serialize)]
pub struct CreatedEntryResponse {
    pub entry: MealEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedEntryResponse {
    pub deleted_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub days: Vec<DayRecord<MealEntry>>,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekResponse {
    pub start: String,
    pub end: String,
    pub days: Vec<DayRecord<MealEntry>>,
    #[serde(flatten)]
    pub totals: Totals,
}
