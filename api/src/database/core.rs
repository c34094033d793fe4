use super::types::{Database, PoolSettings};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

impl Database {
    /// Connects without touching the schema
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_open_connections)
            .min_connections(
                settings
                    .max_idle_connections
                    .min(settings.max_open_connections),
            )
            .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
            .connect(database_url)
            .await
            .with_context(|| "Failed to connect to database")?;
        Ok(Self { pool })
    }

    pub async fn new(database_url: &str, settings: &PoolSettings) -> Result<Self> {
        let db = Self::connect(database_url, settings).await?;
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .context("Failed to apply migrations")?;
        Ok(())
    }

    /// Whether the inventory tables exist
    pub async fn schema_applied(&self) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = 'servers')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
