use super::common::{
    bad_request, not_found, store_error, ApiConfig, ApiResponse, ApiTags, ListRequest,
    ListResponse,
};
use crate::database::firmware::{FIRMWARE_ORDER_COLUMNS, FIRMWARE_SET_ORDER_COLUMNS};
use crate::database::{
    Database, Firmware, FirmwareInput, FirmwareSet, FirmwareSetDetail, FirmwareSetInput,
};
use crate::search::{FirmwareListFilter, FirmwareSetListFilter};
use poem::web::Data;
use poem_openapi::{param::Path, payload::Json, OpenApi};
use std::sync::Arc;
use uuid::Uuid;

pub struct FirmwareApi;

#[OpenApi]
impl FirmwareApi {
    /// List firmware
    ///
    /// Exact-match filters: `vendor`, `model`, `version`
    #[oai(
        path = "/server-component-firmwares",
        method = "get",
        tag = "ApiTags::Firmware"
    )]
    async fn list_firmware(
        &self,
        db: Data<&Arc<Database>>,
        config: Data<&ApiConfig>,
        req: &poem::Request,
    ) -> poem::Result<Json<ListResponse<Firmware>>> {
        let list = ListRequest::from_request(req, &config, FIRMWARE_ORDER_COLUMNS)?;
        let query = FirmwareListFilter::from_query(&list.params).compile();

        let (firmware, total) = db
            .list_firmware(&query, list.order, list.pagination.window())
            .await
            .map_err(store_error)?;
        Ok(Json(list.respond(firmware, total)))
    }

    /// Register a firmware file
    #[oai(
        path = "/server-component-firmwares",
        method = "post",
        tag = "ApiTags::Firmware"
    )]
    async fn create_firmware(
        &self,
        db: Data<&Arc<Database>>,
        input: Json<FirmwareInput>,
    ) -> poem::Result<Json<ApiResponse<Firmware>>> {
        let firmware = db.create_firmware(&input.0).await.map_err(store_error)?;
        Ok(Json(ApiResponse::ok(firmware)))
    }

    /// Get a firmware
    #[oai(
        path = "/server-component-firmwares/:id",
        method = "get",
        tag = "ApiTags::Firmware"
    )]
    async fn get_firmware(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
    ) -> poem::Result<Json<ApiResponse<Firmware>>> {
        let firmware = db
            .get_firmware(id.0)
            .await
            .map_err(store_error)?
            .ok_or_else(|| not_found("Firmware"))?;
        Ok(Json(ApiResponse::ok(firmware)))
    }

    /// List firmware sets
    ///
    /// Filters: `name` and `attr` on firmware set attributes
    #[oai(
        path = "/server-component-firmware-sets",
        method = "get",
        tag = "ApiTags::Firmware"
    )]
    async fn list_firmware_sets(
        &self,
        db: Data<&Arc<Database>>,
        config: Data<&ApiConfig>,
        req: &poem::Request,
    ) -> poem::Result<Json<ListResponse<FirmwareSet>>> {
        let list = ListRequest::from_request(req, &config, FIRMWARE_SET_ORDER_COLUMNS)?;
        let query = FirmwareSetListFilter::from_query(&list.params)
            .and_then(|filter| filter.compile())
            .map_err(bad_request)?;

        let (sets, total) = db
            .list_firmware_sets(&query, list.order, list.pagination.window())
            .await
            .map_err(store_error)?;
        Ok(Json(list.respond(sets, total)))
    }

    /// Create a firmware set
    ///
    /// Every listed firmware id must exist
    #[oai(
        path = "/server-component-firmware-sets",
        method = "post",
        tag = "ApiTags::Firmware"
    )]
    async fn create_firmware_set(
        &self,
        db: Data<&Arc<Database>>,
        input: Json<FirmwareSetInput>,
    ) -> poem::Result<Json<ApiResponse<FirmwareSetDetail>>> {
        if input.0.name.trim().is_empty() {
            return Err(bad_request("firmware set name must not be empty"));
        }
        if input.0.attributes.iter().any(|a| a.namespace.trim().is_empty()) {
            return Err(bad_request("attribute namespace must not be empty"));
        }

        let missing = db
            .missing_firmware(&input.0.firmware_ids)
            .await
            .map_err(store_error)?;
        if !missing.is_empty() {
            let ids: Vec<String> = missing.iter().map(Uuid::to_string).collect();
            return Err(bad_request(format!("unknown firmware: {}", ids.join(", "))));
        }

        let set = db
            .create_firmware_set(&input.0)
            .await
            .map_err(store_error)?;
        Ok(Json(ApiResponse::ok(set)))
    }

    /// Get a firmware set with its firmware and attributes
    #[oai(
        path = "/server-component-firmware-sets/:id",
        method = "get",
        tag = "ApiTags::Firmware"
    )]
    async fn get_firmware_set(
        &self,
        db: Data<&Arc<Database>>,
        id: Path<Uuid>,
    ) -> poem::Result<Json<ApiResponse<FirmwareSetDetail>>> {
        let set = db
            .get_firmware_set(id.0)
            .await
            .map_err(store_error)?
            .ok_or_else(|| not_found("Firmware set"))?;
        Ok(Json(ApiResponse::ok(set)))
    }
}
