use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{
    BatchCook, BatchCookRow, BatchItem, BatchItemRow, DayLog, FoodItem, MealEntry, MealEntryRow,
    MealLog, NewBatchCook, NewFoodItem, NewMealEntry,
};
use super::MealStore;

const FOOD_COLUMNS: &str = "id, name, normalized_name, calories_per_100g, protein_per_100g, \
                            carbs_per_100g, fat_per_100g";
const ENTRY_COLUMNS: &str = "id, meal_log_id, food_item_id, batch_cook_id, food_name, \
                             weight_grams, calories, category, created_at";
const BATCH_ITEM_COLUMNS: &str = "id, batch_cook_id, food_name, weight_grams, calories, \
                                  calories_source, food_item_id, created_at";

#[derive(Clone)]
pub struct PgStore {
    pub db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    async fn batch_items(&self, batch_ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Vec<BatchItem>>> {
        let rows = sqlx::query_as::<_, BatchItemRow>(&format!(
            r#"
            SELECT {BATCH_ITEM_COLUMNS}
              FROM batch_items
             WHERE batch_cook_id = ANY($1)
             ORDER BY created_at ASC, position ASC
            "#
        ))
        .bind(batch_ids.to_vec())
        .fetch_all(&self.db)
        .await
        .context("list batch items")?;

        let mut by_batch: HashMap<Uuid, Vec<BatchItem>> = HashMap::new();
        for row in rows {
            let item = BatchItem::try_from(row)?;
            by_batch.entry(item.batch_cook_id).or_default().push(item);
        }
        Ok(by_batch)
    }

    async fn entries_for_logs(&self, logs: Vec<MealLog>) -> anyhow::Result<Vec<DayLog>> {
        let ids: Vec<Uuid> = logs.iter().map(|l| l.id).collect();
        let rows = sqlx::query_as::<_, MealEntryRow>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
              FROM meal_entries
             WHERE meal_log_id = ANY($1)
             ORDER BY created_at ASC
            "#
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("list meal entries")?;

        let mut by_log: HashMap<Uuid, Vec<MealEntry>> = HashMap::new();
        for row in rows {
            let entry = MealEntry::try_from(row)?;
            by_log.entry(entry.meal_log_id).or_default().push(entry);
        }
        Ok(logs
            .into_iter()
            .map(|log| DayLog {
                entries: by_log.remove(&log.id).unwrap_or_default(),
                log,
            })
            .collect())
    }
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl MealStore for PgStore {
    async fn find_food_by_normalized_name(
        &self,
        normalized_name: &str,
    ) -> anyhow::Result<Option<FoodItem>> {
        let food = sqlx::query_as::<_, FoodItem>(&format!(
            "SELECT {FOOD_COLUMNS} FROM food_items WHERE normalized_name = $1"
        ))
        .bind(normalized_name)
        .fetch_optional(&self.db)
        .await
        .context("find food by normalized name")?;
        Ok(food)
    }

    async fn find_foods_by_normalized_names(
        &self,
        names: &[String],
    ) -> anyhow::Result<Vec<FoodItem>> {
        let foods = sqlx::query_as::<_, FoodItem>(&format!(
            "SELECT {FOOD_COLUMNS} FROM food_items WHERE normalized_name = ANY($1)"
        ))
        .bind(names.to_vec())
        .fetch_all(&self.db)
        .await
        .context("find foods by normalized names")?;
        Ok(foods)
    }

    async fn search_foods(&self, query: Option<&str>, limit: i64) -> anyhow::Result<Vec<FoodItem>> {
        let foods = match query {
            Some(q) => {
                sqlx::query_as::<_, FoodItem>(&format!(
                    r#"
                    SELECT {FOOD_COLUMNS}
                      FROM food_items
                     WHERE name ILIKE '%' || $1 || '%'
                     ORDER BY name ASC
                     LIMIT $2
                    "#
                ))
                .bind(escape_like(q))
                .bind(limit)
                .fetch_all(&self.db)
                .await
            }
            None => {
                sqlx::query_as::<_, FoodItem>(&format!(
                    "SELECT {FOOD_COLUMNS} FROM food_items ORDER BY name ASC LIMIT $1"
                ))
                .bind(limit)
                .fetch_all(&self.db)
                .await
            }
        }
        .context("search foods")?;
        Ok(foods)
    }

    async fn upsert_food(&self, food: NewFoodItem) -> anyhow::Result<FoodItem> {
        let row = sqlx::query_as::<_, FoodItem>(&format!(
            r#"
            INSERT INTO food_items
                (id, name, normalized_name, calories_per_100g, protein_per_100g,
                 carbs_per_100g, fat_per_100g)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (normalized_name) DO UPDATE
               SET name = EXCLUDED.name,
                   calories_per_100g = EXCLUDED.calories_per_100g,
                   protein_per_100g = EXCLUDED.protein_per_100g,
                   carbs_per_100g = EXCLUDED.carbs_per_100g,
                   fat_per_100g = EXCLUDED.fat_per_100g,
                   updated_at = now()
            RETURNING {FOOD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&food.name)
        .bind(&food.normalized_name)
        .bind(food.calories_per_100g)
        .bind(food.protein_per_100g)
        .bind(food.carbs_per_100g)
        .bind(food.fat_per_100g)
        .fetch_one(&self.db)
        .await
        .with_context(|| format!("upsert food {}", food.normalized_name))?;
        Ok(row)
    }

    async fn find_batch(&self, id: Uuid) -> anyhow::Result<Option<BatchCook>> {
        let row = sqlx::query_as::<_, BatchCookRow>(
            r#"
            SELECT id, name, servings, total_weight_grams, total_calories, created_at
              FROM batch_cooks
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find batch cook")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut items = self.batch_items(&[row.id]).await?;
        let items = items.remove(&row.id).unwrap_or_default();
        Ok(Some(row.with_items(items)))
    }

    async fn list_batches(&self) -> anyhow::Result<Vec<BatchCook>> {
        let rows = sqlx::query_as::<_, BatchCookRow>(
            r#"
            SELECT id, name, servings, total_weight_grams, total_calories, created_at
              FROM batch_cooks
             ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list batch cooks")?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.batch_items(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let batch_items = items.remove(&row.id).unwrap_or_default();
                row.with_items(batch_items)
            })
            .collect())
    }

    async fn create_batch(&self, batch: NewBatchCook) -> anyhow::Result<BatchCook> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let row = sqlx::query_as::<_, BatchCookRow>(
            r#"
            INSERT INTO batch_cooks (id, name, servings, total_weight_grams, total_calories)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, servings, total_weight_grams, total_calories, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&batch.name)
        .bind(batch.servings)
        .bind(batch.total_weight_grams)
        .bind(batch.total_calories)
        .fetch_one(&mut *tx)
        .await
        .context("insert batch cook")?;

        let mut items = Vec::with_capacity(batch.items.len());
        for (position, item) in batch.items.iter().enumerate() {
            let item_row = sqlx::query_as::<_, BatchItemRow>(&format!(
                r#"
                INSERT INTO batch_items
                    (id, batch_cook_id, position, food_name, weight_grams, calories,
                     calories_source, food_item_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {BATCH_ITEM_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(row.id)
            .bind(position as i32)
            .bind(&item.food_name)
            .bind(item.weight_grams)
            .bind(item.calories)
            .bind(item.calories_source.as_str())
            .bind(item.food_item_id)
            .fetch_one(&mut *tx)
            .await
            .context("insert batch item")?;
            items.push(BatchItem::try_from(item_row)?);
        }

        tx.commit().await.context("commit tx")?;
        Ok(row.with_items(items))
    }

    async fn find_day_log(&self, logged_for: OffsetDateTime) -> anyhow::Result<Option<DayLog>> {
        let log = sqlx::query_as::<_, MealLog>(
            "SELECT id, logged_for FROM meal_logs WHERE logged_for = $1",
        )
        .bind(logged_for)
        .fetch_optional(&self.db)
        .await
        .context("find meal log")?;

        match log {
            Some(log) => Ok(self.entries_for_logs(vec![log]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_day_logs(
        &self,
        start: OffsetDateTime,
        end_exclusive: OffsetDateTime,
    ) -> anyhow::Result<Vec<DayLog>> {
        let logs = sqlx::query_as::<_, MealLog>(
            r#"
            SELECT id, logged_for
              FROM meal_logs
             WHERE logged_for >= $1 AND logged_for < $2
             ORDER BY logged_for ASC
            "#,
        )
        .bind(start)
        .bind(end_exclusive)
        .fetch_all(&self.db)
        .await
        .context("list meal logs")?;

        self.entries_for_logs(logs).await
    }

    async fn create_entry(&self, entry: NewMealEntry) -> anyhow::Result<MealEntry> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // The upsert locks the log row, so a concurrent prune waits for this
        // transaction and then sees the new entry.
        let log = sqlx::query_as::<_, MealLog>(
            r#"
            INSERT INTO meal_logs (id, logged_for)
            VALUES ($1, $2)
            ON CONFLICT (logged_for) DO UPDATE SET logged_for = EXCLUDED.logged_for
            RETURNING id, logged_for
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.logged_for)
        .fetch_one(&mut *tx)
        .await
        .context("upsert meal log")?;

        let row = sqlx::query_as::<_, MealEntryRow>(&format!(
            r#"
            INSERT INTO meal_entries
                (id, meal_log_id, food_item_id, batch_cook_id, food_name, weight_grams,
                 calories, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(log.id)
        .bind(entry.source.food_item_id())
        .bind(entry.source.batch_cook_id())
        .bind(&entry.food_name)
        .bind(entry.weight_grams)
        .bind(entry.calories)
        .bind(entry.category.as_str())
        .fetch_one(&mut *tx)
        .await
        .context("insert meal entry")?;

        tx.commit().await.context("commit tx")?;
        MealEntry::try_from(row)
    }

    async fn find_entry(&self, id: Uuid) -> anyhow::Result<Option<MealEntry>> {
        let row = sqlx::query_as::<_, MealEntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM meal_entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find meal entry")?;
        row.map(MealEntry::try_from).transpose()
    }

    async fn delete_entry(&self, id: Uuid) -> anyhow::Result<bool> {
        let done = sqlx::query("DELETE FROM meal_entries WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete meal entry")?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_meal_log_if_empty(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // Waits out any transaction still adding an entry to this log; the
        // delete below then runs on a fresh snapshot.
        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM meal_logs WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock meal log")?;
        if locked.is_none() {
            return Ok(false);
        }

        let done = sqlx::query(
            r#"
            DELETE FROM meal_logs
             WHERE id = $1
               AND NOT EXISTS (SELECT 1 FROM meal_entries WHERE meal_log_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("delete empty meal log")?;

        tx.commit().await.context("commit tx")?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("chicken"), "chicken");
        assert_eq!(escape_like("100%_juice\\"), "100\\%\\_juice\\\\");
    }
}
