mod memory;
mod pg;
pub mod repo_types;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use repo_types::{
    BatchCook, BatchItem, CaloriesSource, DayLog, EntrySource, FoodItem, MealEntry, MealLog,
    NewBatchCook, NewBatchItem, NewFoodItem, NewMealEntry,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Persistence the services need. Each call is atomic on its own; nothing
/// here spans calls.
#[async_trait]
pub trait MealStore: Send + Sync {
    async fn find_food_by_normalized_name(&self, normalized_name: &str)
        -> anyhow::Result<Option<FoodItem>>;

    async fn find_foods_by_normalized_names(&self, names: &[String])
        -> anyhow::Result<Vec<FoodItem>>;

    /// Case-insensitive substring match on the display name, ordered by
    /// name. `None` lists everything.
    async fn search_foods(&self, query: Option<&str>, limit: i64) -> anyhow::Result<Vec<FoodItem>>;

    /// Inserts or overwrites the catalog entry with the same normalized name.
    async fn upsert_food(&self, food: NewFoodItem) -> anyhow::Result<FoodItem>;

    async fn find_batch(&self, id: Uuid) -> anyhow::Result<Option<BatchCook>>;

    /// Newest first, items in insertion order.
    async fn list_batches(&self) -> anyhow::Result<Vec<BatchCook>>;

    /// Stores the batch and all of its items, or nothing.
    async fn create_batch(&self, batch: NewBatchCook) -> anyhow::Result<BatchCook>;

    async fn find_day_log(&self, logged_for: OffsetDateTime) -> anyhow::Result<Option<DayLog>>;

    /// Logs with `start <= logged_for < end_exclusive`, ascending.
    async fn list_day_logs(
        &self,
        start: OffsetDateTime,
        end_exclusive: OffsetDateTime,
    ) -> anyhow::Result<Vec<DayLog>>;

    /// Adds the entry to the log for `entry.logged_for`, creating the log
    /// if absent. Both happen together or not at all.
    async fn create_entry(&self, entry: NewMealEntry) -> anyhow::Result<MealEntry>;

    async fn find_entry(&self, id: Uuid) -> anyhow::Result<Option<MealEntry>>;

    /// Returns whether a row was removed.
    async fn delete_entry(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Deletes the log only if no entries point at it. Returns whether it
    /// was removed.
    async fn delete_meal_log_if_empty(&self, id: Uuid) -> anyhow::Result<bool>;
}
