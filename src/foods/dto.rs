use serde::{Deserialize, Serialize};

use crate::store::FoodItem;

#[derive(Debug, Deserialize)]
pub struct FoodSearchQuery {
    pub q: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FoodListResponse {
    pub foods: Vec<FoodItem>,
}
