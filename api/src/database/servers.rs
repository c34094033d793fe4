use super::types::Database;
use crate::pagination::{OrderBy, PageWindow};
use crate::search::{CompiledQuery, ServerListFilter};
use anyhow::Result;
use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Columns `orderby` may name on server lists
pub const SERVER_ORDER_COLUMNS: &[&str] = &["name", "facility_code", "created_at", "updated_at"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
#[oai(skip_serializing_if_is_none)]
pub struct Server {
    pub id: Uuid,
    pub name: Option<String>,
    pub facility_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Object)]
pub struct ServerInput {
    pub name: Option<String>,
    pub facility_code: Option<String>,
}

impl Database {
    /// One page of servers matching `query`, plus the total match count
    pub async fn list_servers(
        &self,
        query: &CompiledQuery,
        order: Option<OrderBy>,
        window: PageWindow,
    ) -> Result<(Vec<Server>, i64)> {
        let order_sql = OrderBy::sql(order, ServerListFilter::TABLE, "created_at");
        self.fetch_page(ServerListFilter::TABLE, query, &order_sql, window)
            .await
    }

    pub async fn get_server(&self, id: Uuid) -> Result<Option<Server>> {
        let server = sqlx::query_as::<_, Server>(
            "SELECT id, name, facility_code, created_at, updated_at FROM servers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(server)
    }

    pub async fn create_server(&self, input: &ServerInput) -> Result<Server> {
        let server = sqlx::query_as::<_, Server>(
            "INSERT INTO servers (id, name, facility_code) VALUES ($1, $2, $3) \
             RETURNING id, name, facility_code, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.facility_code)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(server_id = %server.id, "created server");
        Ok(server)
    }

    pub async fn update_server(&self, id: Uuid, input: &ServerInput) -> Result<Option<Server>> {
        let server = sqlx::query_as::<_, Server>(
            "UPDATE servers SET name = $2, facility_code = $3, updated_at = clock_timestamp() \
             WHERE id = $1 RETURNING id, name, facility_code, created_at, updated_at",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.facility_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(server)
    }

    /// Deletes the server with its components and attributes.
    /// Returns false if it did not exist.
    pub async fn delete_server(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM servers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            tracing::info!(server_id = %id, "deleted server");
        }
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests;
