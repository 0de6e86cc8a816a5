use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::BatchCook;

#[derive(Debug, Default, Deserialize)]
pub struct CreateBatchRequest {
    pub name: Option<Value>,
    pub servings: Option<Value>,
    pub items: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: BatchCook,
    pub calories_per_serving: Option<f64>,
}

impl From<BatchCook> for BatchView {
    fn from(batch: BatchCook) -> Self {
        Self {
            calories_per_serving: batch.calories_per_serving(),
            batch,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchListResponse {
    pub batches: Vec<BatchView>,
}

#[derive(Debug, Serialize)]
pub struct CreatedBatchResponse {
    pub batch: BatchView,
}
