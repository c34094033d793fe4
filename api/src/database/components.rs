use super::attributes::{
    append_versioned_attribute_with, upsert_attribute_with, AttributeInput, AttributeOwner,
};
use super::types::Database;
use crate::pagination::{OrderBy, PageWindow};
use crate::search::{CompiledQuery, ComponentListFilter};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Columns `orderby` may name on component lists
pub const COMPONENT_ORDER_COLUMNS: &[&str] = &["name", "vendor", "model", "serial", "created_at"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
pub struct ComponentType {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct ComponentTypeInput {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, Object)]
#[oai(skip_serializing_if_is_none)]
pub struct ServerComponent {
    pub id: Uuid,
    pub server_id: Uuid,
    pub server_component_type_id: Uuid,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Object)]
pub struct ComponentInput {
    pub component_type_slug: String,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    #[serde(default)]
    #[oai(default)]
    pub attributes: Vec<AttributeInput>,
    #[serde(default)]
    #[oai(default)]
    pub versioned_attributes: Vec<AttributeInput>,
}

const COMPONENT_COLUMNS: &str =
    "id, server_id, server_component_type_id, name, vendor, model, serial, created_at, updated_at";

impl Database {
    pub async fn list_component_types(&self) -> Result<Vec<ComponentType>> {
        let types = sqlx::query_as::<_, ComponentType>(
            "SELECT id, name, slug FROM server_component_types ORDER BY slug ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    pub async fn create_component_type(&self, input: &ComponentTypeInput) -> Result<ComponentType> {
        let component_type = sqlx::query_as::<_, ComponentType>(
            "INSERT INTO server_component_types (id, name, slug) VALUES ($1, $2, $3) \
             RETURNING id, name, slug",
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(component_type)
    }

    /// One page of components matching `query`, plus the total match count
    pub async fn list_components(
        &self,
        query: &CompiledQuery,
        order: Option<OrderBy>,
        window: PageWindow,
    ) -> Result<(Vec<ServerComponent>, i64)> {
        let order_sql = OrderBy::sql(order, ComponentListFilter::TABLE, "created_at");
        self.fetch_page(ComponentListFilter::TABLE, query, &order_sql, window)
            .await
    }

    /// Slugs from `inputs` that name no known component type
    pub async fn unknown_component_types(&self, inputs: &[ComponentInput]) -> Result<Vec<String>> {
        let slugs: Vec<String> = inputs
            .iter()
            .map(|input| input.component_type_slug.clone())
            .collect();
        let known: Vec<String> =
            sqlx::query_scalar("SELECT slug FROM server_component_types WHERE slug = ANY($1)")
                .bind(&slugs)
                .fetch_all(&self.pool)
                .await?;

        let mut unknown: Vec<String> = slugs
            .into_iter()
            .filter(|slug| !known.contains(slug))
            .collect();
        unknown.sort();
        unknown.dedup();
        Ok(unknown)
    }

    /// Creates the components of a server together with their attribute
    /// documents, all or nothing.
    pub async fn create_server_components(
        &self,
        server_id: Uuid,
        inputs: &[ComponentInput],
    ) -> Result<Vec<ServerComponent>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(inputs.len());

        for input in inputs {
            let type_id: Uuid =
                sqlx::query_scalar("SELECT id FROM server_component_types WHERE slug = $1")
                    .bind(&input.component_type_slug)
                    .fetch_optional(&mut *tx)
                    .await?
                    .with_context(|| {
                        format!("Unknown component type: {}", input.component_type_slug)
                    })?;

            let sql = format!(
                "INSERT INTO server_components (id, server_id, server_component_type_id, name, vendor, model, serial) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COMPONENT_COLUMNS}"
            );
            let component = sqlx::query_as::<_, ServerComponent>(&sql)
                .bind(Uuid::new_v4())
                .bind(server_id)
                .bind(type_id)
                .bind(&input.name)
                .bind(&input.vendor)
                .bind(&input.model)
                .bind(&input.serial)
                .fetch_one(&mut *tx)
                .await?;

            let owner = AttributeOwner::Component(component.id);
            for attribute in &input.attributes {
                upsert_attribute_with(&mut *tx, owner, &attribute.namespace, &attribute.data)
                    .await?;
            }
            for attribute in &input.versioned_attributes {
                append_versioned_attribute_with(
                    &mut *tx,
                    owner,
                    &attribute.namespace,
                    &attribute.data,
                )
                .await?;
            }
            created.push(component);
        }

        tx.commit().await?;
        tracing::info!(server_id = %server_id, count = created.len(), "created server components");
        Ok(created)
    }
}
