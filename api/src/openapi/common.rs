use crate::pagination::{Envelope, LinkBase, Links, OrderBy, PaginationParams};
use crate::query_params::QueryParams;
use poem::http::StatusCode;
use poem_openapi::types::{ParseFromJSON, ToJSON};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Object)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub environment: String,
}

#[derive(Debug, Serialize, Deserialize, Object)]
#[oai(skip_serializing_if_is_none)]
pub struct ApiResponse<T: ParseFromJSON + ToJSON> {
    pub success: bool,
    #[oai(skip_serializing_if_is_none)]
    pub data: Option<T>,
    #[oai(skip_serializing_if_is_none)]
    pub error: Option<String>,
}

impl<T: ParseFromJSON + ToJSON> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// One page of records with the paging envelope
#[derive(Debug, Serialize, Deserialize, Object)]
pub struct ListResponse<T: ParseFromJSON + ToJSON> {
    pub page_size: i64,
    pub page: i64,
    pub page_count: i64,
    pub total_pages: i64,
    pub total_record_count: i64,
    #[serde(rename = "_links")]
    #[oai(rename = "_links")]
    pub links: Links,
    pub records: Vec<T>,
}

impl<T: ParseFromJSON + ToJSON> ListResponse<T> {
    pub fn new(envelope: Envelope, records: Vec<T>) -> Self {
        Self {
            page_size: envelope.page_size,
            page: envelope.page,
            page_count: envelope.page_count,
            total_pages: envelope.total_pages,
            total_record_count: envelope.total_record_count,
            links: envelope.links,
            records,
        }
    }
}

#[derive(poem_openapi::Tags)]
pub enum ApiTags {
    /// System endpoints
    System,
    /// Servers and their attributes
    Servers,
    /// Server components and component types
    Components,
    /// Component firmware and firmware sets
    Firmware,
}

/// Settings the handlers share
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// Scheme and host for pagination links; taken from the request if unset
    pub public_base_url: Option<String>,
}

/// Query string of a list request, split into filters, paging and ordering
pub struct ListRequest {
    pub params: QueryParams,
    pub pagination: PaginationParams,
    pub order: Option<OrderBy>,
    link_base: LinkBase,
}

impl ListRequest {
    pub fn from_request(
        req: &poem::Request,
        config: &ApiConfig,
        order_columns: &[&'static str],
    ) -> poem::Result<Self> {
        let params = QueryParams::from_request(req);
        let pagination = PaginationParams::from_query(&params);
        let order = OrderBy::parse(pagination.order_by.as_deref(), order_columns)
            .map_err(bad_request)?;
        Ok(Self {
            link_base: LinkBase::from_request(req, config.public_base_url.as_deref()),
            params,
            pagination,
            order,
        })
    }

    pub fn respond<T: ParseFromJSON + ToJSON>(&self, records: Vec<T>, total: i64) -> ListResponse<T> {
        let envelope = self
            .pagination
            .envelope(total, records.len(), &self.link_base);
        ListResponse::new(envelope, records)
    }
}

fn error_response(status: StatusCode, message: String) -> poem::Error {
    let body = serde_json::json!({
        "success": false,
        "error": message,
    });
    poem::Error::from_response(
        poem::Response::builder()
            .status(status)
            .header(poem::http::header::CONTENT_TYPE, "application/json")
            .body(body.to_string()),
    )
}

pub fn bad_request(err: impl std::fmt::Display) -> poem::Error {
    error_response(StatusCode::BAD_REQUEST, err.to_string())
}

pub fn not_found(what: &str) -> poem::Error {
    error_response(StatusCode::NOT_FOUND, format!("{} not found", what))
}

/// Datastore failures: unique violations are conflicts, everything else is
/// logged and hidden behind a generic 500.
pub fn store_error(err: anyhow::Error) -> poem::Error {
    let unique_violation = err
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|e| e.is_unique_violation());
    if unique_violation {
        return error_response(StatusCode::CONFLICT, "Record already exists".to_string());
    }

    tracing::error!("Datastore error: {:#}", err);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal datastore error".to_string(),
    )
}
