use super::types::Database;
use anyhow::Result;
use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity an attribute document hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOwner {
    Server(Uuid),
    Component(Uuid),
}

impl AttributeOwner {
    fn column(&self) -> &'static str {
        match self {
            Self::Server(_) => "server_id",
            Self::Component(_) => "server_component_id",
        }
    }

    fn id(&self) -> Uuid {
        match self {
            Self::Server(id) | Self::Component(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct Attribute {
    pub namespace: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct VersionedAttribute {
    pub id: Uuid,
    pub namespace: String,
    pub data: serde_json::Value,
    /// Times the same data was reported again after this row was written
    pub tally: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct AttributeInput {
    pub namespace: String,
    pub data: serde_json::Value,
}

pub(crate) async fn upsert_attribute_with<'e, E>(
    executor: E,
    owner: AttributeOwner,
    namespace: &str,
    data: &serde_json::Value,
) -> Result<Attribute>
where
    E: sqlx::PgExecutor<'e>,
{
    let column = owner.column();
    let sql = format!(
        "INSERT INTO attributes (id, {column}, namespace, data) VALUES ($1, $2, $3, $4) \
         ON CONFLICT ({column}, namespace) DO UPDATE SET data = EXCLUDED.data, updated_at = clock_timestamp() \
         RETURNING namespace, data, created_at, updated_at"
    );
    let attribute = sqlx::query_as::<_, Attribute>(&sql)
        .bind(Uuid::new_v4())
        .bind(owner.id())
        .bind(namespace)
        .bind(data)
        .fetch_one(executor)
        .await?;
    Ok(attribute)
}

/// Must run inside a transaction; the advisory lock is held until it ends.
pub(crate) async fn append_versioned_attribute_with(
    tx: &mut sqlx::PgConnection,
    owner: AttributeOwner,
    namespace: &str,
    data: &serde_json::Value,
) -> Result<VersionedAttribute> {
    let column = owner.column();

    // Serializes appends per owner and namespace until the transaction ends
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("versioned:{}:{}:{}", column, owner.id(), namespace))
        .execute(&mut *tx)
        .await?;

    let current_sql = format!(
        "SELECT id, namespace, data, tally, created_at FROM versioned_attributes \
         WHERE {column} = $1 AND namespace = $2 ORDER BY created_at DESC LIMIT 1"
    );
    let current = sqlx::query_as::<_, VersionedAttribute>(&current_sql)
        .bind(owner.id())
        .bind(namespace)
        .fetch_optional(&mut *tx)
        .await?;

    if let Some(current) = current.filter(|c| &c.data == data) {
        let bumped = sqlx::query_as::<_, VersionedAttribute>(
            "UPDATE versioned_attributes SET tally = tally + 1 WHERE id = $1 \
             RETURNING id, namespace, data, tally, created_at",
        )
        .bind(current.id)
        .fetch_one(&mut *tx)
        .await?;
        return Ok(bumped);
    }

    let insert_sql = format!(
        "INSERT INTO versioned_attributes (id, {column}, namespace, data) VALUES ($1, $2, $3, $4) \
         RETURNING id, namespace, data, tally, created_at"
    );
    let inserted = sqlx::query_as::<_, VersionedAttribute>(&insert_sql)
        .bind(Uuid::new_v4())
        .bind(owner.id())
        .bind(namespace)
        .bind(data)
        .fetch_one(&mut *tx)
        .await?;
    Ok(inserted)
}

impl Database {
    pub async fn list_attributes(&self, owner: AttributeOwner) -> Result<Vec<Attribute>> {
        let sql = format!(
            "SELECT namespace, data, created_at, updated_at FROM attributes \
             WHERE {} = $1 ORDER BY namespace ASC",
            owner.column()
        );
        let attributes = sqlx::query_as::<_, Attribute>(&sql)
            .bind(owner.id())
            .fetch_all(&self.pool)
            .await?;
        Ok(attributes)
    }

    /// Creates the namespace document or replaces its data
    pub async fn upsert_attribute(
        &self,
        owner: AttributeOwner,
        namespace: &str,
        data: &serde_json::Value,
    ) -> Result<Attribute> {
        upsert_attribute_with(&self.pool, owner, namespace, data).await
    }

    /// Returns false if nothing was deleted
    pub async fn delete_attribute(&self, owner: AttributeOwner, namespace: &str) -> Result<bool> {
        let sql = format!(
            "DELETE FROM attributes WHERE {} = $1 AND namespace = $2",
            owner.column()
        );
        let result = sqlx::query(&sql)
            .bind(owner.id())
            .bind(namespace)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Newest row per namespace
    pub async fn current_versioned_attributes(
        &self,
        owner: AttributeOwner,
    ) -> Result<Vec<VersionedAttribute>> {
        let sql = format!(
            "SELECT DISTINCT ON (namespace) id, namespace, data, tally, created_at \
             FROM versioned_attributes WHERE {} = $1 ORDER BY namespace ASC, created_at DESC",
            owner.column()
        );
        let attributes = sqlx::query_as::<_, VersionedAttribute>(&sql)
            .bind(owner.id())
            .fetch_all(&self.pool)
            .await?;
        Ok(attributes)
    }

    /// Appends a new version unless the data matches the current one, in
    /// which case the current row's tally goes up.
    pub async fn append_versioned_attribute(
        &self,
        owner: AttributeOwner,
        namespace: &str,
        data: &serde_json::Value,
    ) -> Result<VersionedAttribute> {
        let mut tx = self.pool.begin().await?;
        let attribute = append_versioned_attribute_with(&mut *tx, owner, namespace, data).await?;
        tx.commit().await?;
        Ok(attribute)
    }
}
