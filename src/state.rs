// src/state.rs
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::create_pool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub recent_limit: u32,
}

impl AppState {
    pub fn new(pool: SqlitePool, recent_limit: u32) -> Self {
        Self { pool, recent_limit }
    }

    pub async fn from_config(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = create_pool(&config.database_url).await?;
        Ok(Self::new(pool, config.recent_limit))
    }
}
