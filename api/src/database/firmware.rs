use super::attributes::{Attribute, AttributeInput};
use super::types::Database;
use crate::pagination::{OrderBy, PageWindow};
use crate::search::{CompiledQuery, FirmwareListFilter, FirmwareSetListFilter};
use anyhow::Result;
use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const FIRMWARE_ORDER_COLUMNS: &[&str] = &["vendor", "model", "version", "created_at"];
pub const FIRMWARE_SET_ORDER_COLUMNS: &[&str] = &["name", "created_at"];

const FIRMWARE_COLUMNS: &str = "component_firmware_version.id, component_firmware_version.vendor, \
     component_firmware_version.model, component_firmware_version.filename, \
     component_firmware_version.version, component_firmware_version.checksum, \
     component_firmware_version.upstream_url, component_firmware_version.repository_url, \
     component_firmware_version.created_at, component_firmware_version.updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct Firmware {
    pub id: Uuid,
    pub vendor: String,
    pub model: String,
    pub filename: String,
    pub version: String,
    pub checksum: String,
    pub upstream_url: String,
    pub repository_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct FirmwareInput {
    pub vendor: String,
    pub model: String,
    pub filename: String,
    pub version: String,
    pub checksum: String,
    pub upstream_url: String,
    pub repository_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct FirmwareSet {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct FirmwareSetDetail {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub firmwares: Vec<Firmware>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct FirmwareSetInput {
    pub name: String,
    #[serde(default)]
    #[oai(default)]
    pub firmware_ids: Vec<Uuid>,
    #[serde(default)]
    #[oai(default)]
    pub attributes: Vec<AttributeInput>,
}

impl Database {
    pub async fn list_firmware(
        &self,
        query: &CompiledQuery,
        order: Option<OrderBy>,
        window: PageWindow,
    ) -> Result<(Vec<Firmware>, i64)> {
        let order_sql = OrderBy::sql(order, FirmwareListFilter::TABLE, "created_at");
        self.fetch_page(FirmwareListFilter::TABLE, query, &order_sql, window)
            .await
    }

    pub async fn get_firmware(&self, id: Uuid) -> Result<Option<Firmware>> {
        let sql = format!(
            "SELECT {FIRMWARE_COLUMNS} FROM component_firmware_version WHERE id = $1"
        );
        let firmware = sqlx::query_as::<_, Firmware>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(firmware)
    }

    pub async fn create_firmware(&self, input: &FirmwareInput) -> Result<Firmware> {
        let sql = format!(
            "INSERT INTO component_firmware_version \
             (id, vendor, model, filename, version, checksum, upstream_url, repository_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {FIRMWARE_COLUMNS}"
        );
        let firmware = sqlx::query_as::<_, Firmware>(&sql)
            .bind(Uuid::new_v4())
            .bind(&input.vendor)
            .bind(&input.model)
            .bind(&input.filename)
            .bind(&input.version)
            .bind(&input.checksum)
            .bind(&input.upstream_url)
            .bind(&input.repository_url)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(firmware_id = %firmware.id, vendor = %firmware.vendor, version = %firmware.version, "created firmware");
        Ok(firmware)
    }

    pub async fn list_firmware_sets(
        &self,
        query: &CompiledQuery,
        order: Option<OrderBy>,
        window: PageWindow,
    ) -> Result<(Vec<FirmwareSet>, i64)> {
        let order_sql = OrderBy::sql(order, FirmwareSetListFilter::TABLE, "created_at");
        self.fetch_page(FirmwareSetListFilter::TABLE, query, &order_sql, window)
            .await
    }

    /// Firmware ids from `ids` that do not exist
    pub async fn missing_firmware(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let known: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM component_firmware_version WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.iter().copied().filter(|id| !known.contains(id)).collect())
    }

    pub async fn create_firmware_set(&self, input: &FirmwareSetInput) -> Result<FirmwareSetDetail> {
        let mut tx = self.pool.begin().await?;

        let set = sqlx::query_as::<_, FirmwareSet>(
            "INSERT INTO component_firmware_set (id, name) VALUES ($1, $2) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .fetch_one(&mut *tx)
        .await?;

        for firmware_id in &input.firmware_ids {
            sqlx::query(
                "INSERT INTO component_firmware_set_map (firmware_set_id, firmware_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(set.id)
            .bind(firmware_id)
            .execute(&mut *tx)
            .await?;
        }

        for attribute in &input.attributes {
            sqlx::query(
                "INSERT INTO attributes_firmware_set (id, firmware_set_id, namespace, data) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (firmware_set_id, namespace) DO UPDATE SET data = EXCLUDED.data",
            )
            .bind(Uuid::new_v4())
            .bind(set.id)
            .bind(&attribute.namespace)
            .bind(&attribute.data)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(firmware_set_id = %set.id, name = %set.name, "created firmware set");

        self.get_firmware_set(set.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Firmware set not found after creation"))
    }

    pub async fn get_firmware_set(&self, id: Uuid) -> Result<Option<FirmwareSetDetail>> {
        let Some(set) = sqlx::query_as::<_, FirmwareSet>(
            "SELECT id, name, created_at, updated_at FROM component_firmware_set WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let firmware_sql = format!(
            "SELECT {FIRMWARE_COLUMNS} FROM component_firmware_version \
             JOIN component_firmware_set_map ON component_firmware_set_map.firmware_id = component_firmware_version.id \
             WHERE component_firmware_set_map.firmware_set_id = $1 \
             ORDER BY component_firmware_version.vendor, component_firmware_version.model"
        );
        let firmwares = sqlx::query_as::<_, Firmware>(&firmware_sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        let attributes = sqlx::query_as::<_, Attribute>(
            "SELECT namespace, data, created_at, updated_at FROM attributes_firmware_set \
             WHERE firmware_set_id = $1 ORDER BY namespace ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(FirmwareSetDetail {
            id: set.id,
            name: set.name,
            created_at: set.created_at,
            updated_at: set.updated_at,
            firmwares,
            attributes,
        }))
    }
}
