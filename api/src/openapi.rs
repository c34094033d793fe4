pub mod common;
pub mod components;
pub mod firmware;
pub mod servers;
pub mod system;

pub use common::ApiConfig;
pub use components::ComponentsApi;
pub use firmware::FirmwareApi;
pub use servers::ServersApi;
pub use system::SystemApi;

use poem_openapi::OpenApi;

/// Combines all API modules into a single OpenAPI specification
pub fn create_combined_api() -> impl OpenApi {
    (SystemApi, ServersApi, ComponentsApi, FirmwareApi)
}
