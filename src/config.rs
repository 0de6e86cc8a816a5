use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    /// JSON-lines food dataset read by `sync-foods`.
    pub foods_data_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("APP_PORT", 8080)?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            foods_data_path: std::env::var("FOODS_DATA_PATH")
                .unwrap_or_else(|_| "data/foods.jsonl".into())
                .into(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key} value {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_only_when_unset() {
        assert_eq!(parse_or::<u16>("MEALTRACK_TEST_UNSET_PORT", 8080).unwrap(), 8080);

        std::env::set_var("MEALTRACK_TEST_BAD_PORT", "eighty");
        assert!(parse_or::<u16>("MEALTRACK_TEST_BAD_PORT", 8080).is_err());

        std::env::set_var("MEALTRACK_TEST_GOOD_PORT", " 3000 ");
        assert_eq!(parse_or::<u16>("MEALTRACK_TEST_GOOD_PORT", 8080).unwrap(), 3000);
    }
}
