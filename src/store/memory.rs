use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{
    BatchCook, BatchItem, DayLog, FoodItem, MealEntry, MealLog, NewBatchCook, NewFoodItem,
    NewMealEntry,
};
use super::MealStore;

/// Process-local store backing tests and `AppState::fake()`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    foods: Vec<FoodItem>,
    batches: Vec<BatchCook>,
    logs: Vec<MealLog>,
    entries: Vec<MealEntry>,
}

impl Inner {
    fn day_log(&self, log: MealLog) -> DayLog {
        DayLog {
            log,
            entries: self
                .entries
                .iter()
                .filter(|e| e.meal_log_id == log.id)
                .cloned()
                .collect(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl MealStore for MemoryStore {
    async fn find_food_by_normalized_name(
        &self,
        normalized_name: &str,
    ) -> anyhow::Result<Option<FoodItem>> {
        let inner = self.lock()?;
        Ok(inner
            .foods
            .iter()
            .find(|f| f.normalized_name == normalized_name)
            .cloned())
    }

    async fn find_foods_by_normalized_names(
        &self,
        names: &[String],
    ) -> anyhow::Result<Vec<FoodItem>> {
        let inner = self.lock()?;
        Ok(inner
            .foods
            .iter()
            .filter(|f| names.contains(&f.normalized_name))
            .cloned()
            .collect())
    }

    async fn search_foods(&self, query: Option<&str>, limit: i64) -> anyhow::Result<Vec<FoodItem>> {
        let inner = self.lock()?;
        let needle = query.map(str::to_lowercase);
        let mut found: Vec<FoodItem> = inner
            .foods
            .iter()
            .filter(|f| match &needle {
                Some(n) => f.name.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        // Case-insensitive, like the database collation orders `name`.
        found.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        found.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(found)
    }

    async fn upsert_food(&self, food: NewFoodItem) -> anyhow::Result<FoodItem> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner
            .foods
            .iter_mut()
            .find(|f| f.normalized_name == food.normalized_name)
        {
            existing.name = food.name;
            existing.calories_per_100g = food.calories_per_100g;
            existing.protein_per_100g = food.protein_per_100g;
            existing.carbs_per_100g = food.carbs_per_100g;
            existing.fat_per_100g = food.fat_per_100g;
            return Ok(existing.clone());
        }
        let created = FoodItem {
            id: Uuid::new_v4(),
            name: food.name,
            normalized_name: food.normalized_name,
            calories_per_100g: food.calories_per_100g,
            protein_per_100g: food.protein_per_100g,
            carbs_per_100g: food.carbs_per_100g,
            fat_per_100g: food.fat_per_100g,
        };
        inner.foods.push(created.clone());
        Ok(created)
    }

    async fn find_batch(&self, id: Uuid) -> anyhow::Result<Option<BatchCook>> {
        let inner = self.lock()?;
        Ok(inner.batches.iter().find(|b| b.id == id).cloned())
    }

    async fn list_batches(&self) -> anyhow::Result<Vec<BatchCook>> {
        let inner = self.lock()?;
        // Insertion order is creation order; newest first.
        Ok(inner.batches.iter().rev().cloned().collect())
    }

    async fn create_batch(&self, batch: NewBatchCook) -> anyhow::Result<BatchCook> {
        let mut inner = self.lock()?;
        let id = Uuid::new_v4();
        let created_at = OffsetDateTime::now_utc();
        let items = batch
            .items
            .into_iter()
            .map(|item| BatchItem {
                id: Uuid::new_v4(),
                batch_cook_id: id,
                food_name: item.food_name,
                weight_grams: item.weight_grams,
                calories: item.calories,
                calories_source: item.calories_source,
                food_item_id: item.food_item_id,
                created_at,
            })
            .collect();
        let created = BatchCook {
            id,
            name: batch.name,
            servings: batch.servings,
            total_weight_grams: batch.total_weight_grams,
            total_calories: batch.total_calories,
            created_at,
            items,
        };
        inner.batches.push(created.clone());
        Ok(created)
    }

    async fn find_day_log(&self, logged_for: OffsetDateTime) -> anyhow::Result<Option<DayLog>> {
        let inner = self.lock()?;
        Ok(inner
            .logs
            .iter()
            .find(|l| l.logged_for == logged_for)
            .map(|l| inner.day_log(*l)))
    }

    async fn list_day_logs(
        &self,
        start: OffsetDateTime,
        end_exclusive: OffsetDateTime,
    ) -> anyhow::Result<Vec<DayLog>> {
        let inner = self.lock()?;
        let mut logs: Vec<MealLog> = inner
            .logs
            .iter()
            .filter(|l| l.logged_for >= start && l.logged_for < end_exclusive)
            .copied()
            .collect();
        logs.sort_by_key(|l| l.logged_for);
        Ok(logs.into_iter().map(|l| inner.day_log(l)).collect())
    }

    async fn create_entry(&self, entry: NewMealEntry) -> anyhow::Result<MealEntry> {
        let mut inner = self.lock()?;
        let log = match inner.logs.iter().find(|l| l.logged_for == entry.logged_for) {
            Some(log) => *log,
            None => {
                let log = MealLog {
                    id: Uuid::new_v4(),
                    logged_for: entry.logged_for,
                };
                inner.logs.push(log);
                log
            }
        };
        let created = MealEntry {
            id: Uuid::new_v4(),
            meal_log_id: log.id,
            food_name: entry.food_name,
            weight_grams: entry.weight_grams,
            calories: entry.calories,
            category: entry.category,
            source: entry.source,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.entries.push(created.clone());
        Ok(created)
    }

    async fn find_entry(&self, id: Uuid) -> anyhow::Result<Option<MealEntry>> {
        let inner = self.lock()?;
        Ok(inner.entries.iter().find(|e| e.id == id).cloned())
    }

    async fn delete_entry(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.lock()?;
        let before = inner.entries.len();
        inner.entries.retain(|e| e.id != id);
        Ok(inner.entries.len() < before)
    }

    async fn delete_meal_log_if_empty(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.lock()?;
        if inner.entries.iter().any(|e| e.meal_log_id == id) {
            return Ok(false);
        }
        let before = inner.logs.len();
        inner.logs.retain(|l| l.id != id);
        Ok(inner.logs.len() < before)
    }
}
