use super::common::{
    bad_request, store_error, ApiConfig, ApiResponse, ApiTags, ListRequest, ListResponse,
};
use crate::database::components::COMPONENT_ORDER_COLUMNS;
use crate::database::{ComponentType, ComponentTypeInput, Database, ServerComponent};
use crate::search::ComponentListFilter;
use poem::web::Data;
use poem_openapi::{payload::Json, OpenApi};
use std::sync::Arc;

pub struct ComponentsApi;

#[OpenApi]
impl ComponentsApi {
    /// List components across all servers
    ///
    /// Filters: `name`, `vendor`, `model`, `serial`, `type` and
    /// `attr`/`ver_attr` on component attributes
    #[oai(path = "/server-components", method = "get", tag = "ApiTags::Components")]
    async fn list_components(
        &self,
        db: Data<&Arc<Database>>,
        config: Data<&ApiConfig>,
        req: &poem::Request,
    ) -> poem::Result<Json<ListResponse<ServerComponent>>> {
        let list = ListRequest::from_request(req, &config, COMPONENT_ORDER_COLUMNS)?;
        let query = ComponentListFilter::from_query(&list.params)
            .and_then(|filter| filter.compile())
            .map_err(bad_request)?;

        let (components, total) = db
            .list_components(&query, list.order, list.pagination.window())
            .await
            .map_err(store_error)?;
        Ok(Json(list.respond(components, total)))
    }

    /// List component types
    #[oai(
        path = "/server-component-types",
        method = "get",
        tag = "ApiTags::Components"
    )]
    async fn list_component_types(
        &self,
        db: Data<&Arc<Database>>,
    ) -> poem::Result<Json<ApiResponse<Vec<ComponentType>>>> {
        let types = db.list_component_types().await.map_err(store_error)?;
        Ok(Json(ApiResponse::ok(types)))
    }

    /// Create a component type
    #[oai(
        path = "/server-component-types",
        method = "post",
        tag = "ApiTags::Components"
    )]
    async fn create_component_type(
        &self,
        db: Data<&Arc<Database>>,
        input: Json<ComponentTypeInput>,
    ) -> poem::Result<Json<ApiResponse<ComponentType>>> {
        if input.0.slug.trim().is_empty() {
            return Err(bad_request("slug must not be empty"));
        }
        let component_type = db
            .create_component_type(&input.0)
            .await
            .map_err(store_error)?;
        tracing::info!(slug = %component_type.slug, "created component type");
        Ok(Json(ApiResponse::ok(component_type)))
    }
}
