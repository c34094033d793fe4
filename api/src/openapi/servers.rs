use super::common::{
    bad_request, not_found, store_error, ApiConfig, ApiResponse, ApiTags, ListRequest,
    ListResponse,
};
use crate::database::components::COMPONENT_ORDER_COLUMNS;
use crate::database::servers::SERVER_ORDER_COLUMNS;
use crate::database::{
    Attribute, AttributeInput, AttributeOwner, ComponentInput, Database, Server, ServerComponent,
    ServerInput, VersionedAttribute,
};
use crate::search::{ComponentListFilter, ServerListFilter};
use poem::web::Data;
use poem_openapi::{param::Path, payload::Json, OpenApi};
use std::sync::Arc;
use uuid::Uuid;

pub struct ServersApi;

async fn existing_server(db: &Database, id: Uuid) -> poem::Result<Server> {
    db.get_server(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Server"))
}

#[OpenApi]
impl ServersApi {
    /// List servers
    ///
    /// Filters: `name`, `facility_code`, `attr`, `ver_attr` and component
    /// match groups `sc_<i>[name|vendor|model|serial|type]`, `sc_<i>_attr`,
    /// `sc_<i>_ver_attr`. Attribute filters use `namespace~key.path~op~value`.
    #[oai(path = "/servers", method = "get", tag = "ApiTags::Servers")]
    async fn list_servers(
        &self,
        db: Data<&Arc<Database>>,
        config: Data<&ApiConfig>,
        req: &poem::Request,
    ) -> poem::Result<Json<ListResponse<Server>>> {
        let list = ListRequest::from_request(req, &config, SERVER_ORDER_COLUMNS)?;
        let query = ServerListFilter::from_query(&list.params)
            .and_then(|filter| filter.compile())
            .map_err(bad_request)?;

        let (servers, total) = db
            .list_servers(&query, list.order, list.pagination.window())
            .await
            .map_err(store_error)?;
        Ok(Json(list.respond(servers, total)))
    }

    /// Create a server
    #[oai(path = "/servers", method = "post", tag = "ApiTags::Servers")]
    async fn create_server(
        &self,
        db: Data<&Arc<Database>>,
        input: Json<ServerInput>,
    ) -> poem::Result<Json<ApiResponse<Server>>> {
        let server = db.create_server(&input.0).await.map_err(store_error)?;
        Ok(Json(ApiResponse::ok(server)))
    }

    /// Get a server
    #[oai(path = "/servers/:id", method = "get", tag = "ApiTags::Servers")]
    async fn get_server(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
    ) -> poem::Result<Json<ApiResponse<Server>>> {
        let server = existing_server(&db, id.0).await?;
        Ok(Json(ApiResponse::ok(server)))
    }

    /// Update a server
    #[oai(path = "/servers/:id", method = "put", tag = "ApiTags::Servers")]
    async fn update_server(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
        input: Json<ServerInput>,
    ) -> poem::Result<Json<ApiResponse<Server>>> {
        let server = db
            .update_server(id.0, &input.0)
            .await
            .map_err(store_error)?
            .ok_or_else(|| not_found("Server"))?;
        Ok(Json(ApiResponse::ok(server)))
    }

    /// Delete a server
    ///
    /// Removes the server together with its components and attributes
    #[oai(path = "/servers/:id", method = "delete", tag = "ApiTags::Servers")]
    async fn delete_server(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
    ) -> poem::Result<Json<ApiResponse<String>>> {
        if !db.delete_server(id.0).await.map_err(store_error)? {
            return Err(not_found("Server"));
        }
        Ok(Json(ApiResponse::ok("Server deleted".to_string())))
    }

    /// List server attributes
    #[oai(path = "/servers/:id/attributes", method = "get", tag = "ApiTags::Servers")]
    async fn list_attributes(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
    ) -> poem::Result<Json<ApiResponse<Vec<Attribute>>>> {
        existing_server(&db, id.0).await?;
        let attributes = db
            .list_attributes(AttributeOwner::Server(id.0))
            .await
            .map_err(store_error)?;
        Ok(Json(ApiResponse::ok(attributes)))
    }

    /// Create or replace one attribute namespace of a server
    #[oai(
        path = "/servers/:id/attributes/:namespace",
        method = "put",
        tag = "ApiTags::Servers"
    )]
    async fn upsert_attribute(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
        namespace: Path<String>,
        data: Json<serde_json::Value>,
    ) -> poem::Result<Json<ApiResponse<Attribute>>> {
        existing_server(&db, id.0).await?;
        let attribute = db
            .upsert_attribute(AttributeOwner::Server(id.0), &namespace.0, &data.0)
            .await
            .map_err(store_error)?;
        Ok(Json(ApiResponse::ok(attribute)))
    }

    /// Delete one attribute namespace of a server
    #[oai(
        path = "/servers/:id/attributes/:namespace",
        method = "delete",
        tag = "ApiTags::Servers"
    )]
    async fn delete_attribute(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
        namespace: Path<String>,
    ) -> poem::Result<Json<ApiResponse<String>>> {
        let deleted = db
            .delete_attribute(AttributeOwner::Server(id.0), &namespace.0)
            .await
            .map_err(store_error)?;
        if !deleted {
            return Err(not_found("Attribute"));
        }
        Ok(Json(ApiResponse::ok("Attribute deleted".to_string())))
    }

    /// Current versioned attributes of a server, newest row per namespace
    #[oai(
        path = "/servers/:id/versioned-attributes",
        method = "get",
        tag = "ApiTags::Servers"
    )]
    async fn list_versioned_attributes(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
    ) -> poem::Result<Json<ApiResponse<Vec<VersionedAttribute>>>> {
        existing_server(&db, id.0).await?;
        let attributes = db
            .current_versioned_attributes(AttributeOwner::Server(id.0))
            .await
            .map_err(store_error)?;
        Ok(Json(ApiResponse::ok(attributes)))
    }

    /// Record a new version of a server attribute namespace
    ///
    /// Data equal to the current version increments its tally instead
    #[oai(
        path = "/servers/:id/versioned-attributes",
        method = "post",
        tag = "ApiTags::Servers"
    )]
    async fn append_versioned_attribute(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
        input: Json<AttributeInput>,
    ) -> poem::Result<Json<ApiResponse<VersionedAttribute>>> {
        if input.0.namespace.trim().is_empty() {
            return Err(bad_request("namespace must not be empty"));
        }
        existing_server(&db, id.0).await?;
        let attribute = db
            .append_versioned_attribute(
                AttributeOwner::Server(id.0),
                &input.0.namespace,
                &input.0.data,
            )
            .await
            .map_err(store_error)?;
        Ok(Json(ApiResponse::ok(attribute)))
    }

    /// List the components of a server
    #[oai(path = "/servers/:id/components", method = "get", tag = "ApiTags::Servers")]
    async fn list_server_components(
        &self,
        db: Data<&Arc<Database>>,
        config: Data<&ApiConfig>,
        id: Path<Uuid>,
        req: &poem::Request,
    ) -> poem::Result<Json<ListResponse<ServerComponent>>> {
        let list = ListRequest::from_request(req, &config, COMPONENT_ORDER_COLUMNS)?;
        existing_server(&db, id.0).await?;
        let query = ComponentListFilter::for_server(id.0)
            .compile()
            .map_err(bad_request)?;

        let (components, total) = db
            .list_components(&query, list.order, list.pagination.window())
            .await
            .map_err(store_error)?;
        Ok(Json(list.respond(components, total)))
    }

    /// Add components to a server
    ///
    /// Every component must name a known component type slug
    #[oai(path = "/servers/:id/components", method = "post", tag = "ApiTags::Servers")]
    async fn create_server_components(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
        input: Json<Vec<ComponentInput>>,
    ) -> poem::Result<Json<ApiResponse<Vec<ServerComponent>>>> {
        existing_server(&db, id.0).await?;

        let unknown = db
            .unknown_component_types(&input.0)
            .await
            .map_err(store_error)?;
        if !unknown.is_empty() {
            return Err(bad_request(format!(
                "unknown component type: {}",
                unknown.join(", ")
            )));
        }

        let components = db
            .create_server_components(id.0, &input.0)
            .await
            .map_err(store_error)?;
        Ok(Json(ApiResponse::ok(components)))
    }
}
