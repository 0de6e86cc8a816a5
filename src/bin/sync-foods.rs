//! Upserts the JSON-lines food dataset into the catalog.
//!
//! Usage: `sync-foods [PATH]`; falls back to `FOODS_DATA_PATH`.

use std::path::PathBuf;

use mealtrack::{app::init_tracing, config::AppConfig, store::PgStore, sync::sync_foods_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("mealtrack=info,sqlx=warn");

    let config = AppConfig::from_env()?;
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.foods_data_path.clone());

    let store = PgStore::connect(&config.database_url, config.db_max_connections).await?;
    store.migrate().await?;

    let report = sync_foods_file(&store, &path).await?;
    println!(
        "synced {} foods from {} ({} skipped)",
        report.upserted,
        path.display(),
        report.skipped
    );
    Ok(())
}
