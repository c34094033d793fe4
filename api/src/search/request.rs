use super::builder::{compile_attribute_filters, AttributeTarget, CompiledQuery};
use super::components::{compile_component_conditions, compile_component_groups};
use super::parser::{
    parse_attribute_filters, parse_component_groups, ATTR_PARAM, VERSIONED_ATTR_PARAM,
};
use super::types::{AttributeFilter, ComponentMatchGroup, SearchError};
use crate::query_params::QueryParams;

/// Filters accepted by `GET /servers`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerListFilter {
    pub name: Option<String>,
    pub facility_code: Option<String>,
    pub attributes: Vec<AttributeFilter>,
    pub versioned_attributes: Vec<AttributeFilter>,
    pub components: Vec<ComponentMatchGroup>,
}

impl ServerListFilter {
    pub const TABLE: &'static str = "servers";

    pub fn from_query(params: &QueryParams) -> Result<Self, SearchError> {
        Ok(Self {
            name: params.get_non_empty("name").map(str::to_string),
            facility_code: params.get_non_empty("facility_code").map(str::to_string),
            attributes: parse_attribute_filters(params, ATTR_PARAM)?,
            versioned_attributes: parse_attribute_filters(params, VERSIONED_ATTR_PARAM)?,
            components: parse_component_groups(params)?,
        })
    }

    pub fn compile(&self) -> Result<CompiledQuery, SearchError> {
        let mut query = CompiledQuery::new();
        if let Some(name) = &self.name {
            query.push_eq("servers.name", name);
        }
        if let Some(facility) = &self.facility_code {
            query.push_eq("servers.facility_code", facility);
        }
        compile_attribute_filters(
            &self.attributes,
            AttributeTarget::ServerAttributes,
            Self::TABLE,
            &mut query,
        )?;
        compile_attribute_filters(
            &self.versioned_attributes,
            AttributeTarget::ServerVersionedAttributes,
            Self::TABLE,
            &mut query,
        )?;
        compile_component_groups(&self.components, Self::TABLE, &mut query)?;
        Ok(query)
    }
}

/// Filters accepted by `GET /server-components`: one match group applied to
/// the listed component rows themselves
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentListFilter {
    pub server_id: Option<uuid::Uuid>,
    pub group: ComponentMatchGroup,
}

impl ComponentListFilter {
    pub const TABLE: &'static str = "server_components";

    pub fn from_query(params: &QueryParams) -> Result<Self, SearchError> {
        let field = |key: &str| params.get_non_empty(key).map(str::to_string);
        Ok(Self {
            server_id: None,
            group: ComponentMatchGroup {
                name: field("name"),
                vendor: field("vendor"),
                model: field("model"),
                serial: field("serial"),
                component_type_slug: field("type"),
                attribute_filters: parse_attribute_filters(params, ATTR_PARAM)?,
                versioned_attribute_filters: parse_attribute_filters(
                    params,
                    VERSIONED_ATTR_PARAM,
                )?,
            },
        })
    }

    pub fn for_server(server_id: uuid::Uuid) -> Self {
        Self {
            server_id: Some(server_id),
            group: ComponentMatchGroup::default(),
        }
    }

    pub fn compile(&self) -> Result<CompiledQuery, SearchError> {
        let mut query = CompiledQuery::new();
        if let Some(server_id) = self.server_id {
            let placeholder = query.bind_uuid(server_id);
            query
                .predicates
                .push(format!("server_components.server_id = {}", placeholder));
        }
        compile_component_conditions(&self.group, Self::TABLE, &mut query)?;
        Ok(query)
    }
}

/// Filters accepted by `GET /server-component-firmware-sets`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirmwareSetListFilter {
    pub name: Option<String>,
    pub attributes: Vec<AttributeFilter>,
}

impl FirmwareSetListFilter {
    pub const TABLE: &'static str = "component_firmware_set";

    pub fn from_query(params: &QueryParams) -> Result<Self, SearchError> {
        Ok(Self {
            name: params.get_non_empty("name").map(str::to_string),
            attributes: parse_attribute_filters(params, ATTR_PARAM)?,
        })
    }

    pub fn compile(&self) -> Result<CompiledQuery, SearchError> {
        let mut query = CompiledQuery::new();
        if let Some(name) = &self.name {
            query.push_eq("component_firmware_set.name", name);
        }
        compile_attribute_filters(
            &self.attributes,
            AttributeTarget::FirmwareSetAttributes,
            Self::TABLE,
            &mut query,
        )?;
        Ok(query)
    }
}

/// Exact-match filters accepted by `GET /server-component-firmwares`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirmwareListFilter {
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
}

impl FirmwareListFilter {
    pub const TABLE: &'static str = "component_firmware_version";

    pub fn from_query(params: &QueryParams) -> Self {
        let field = |key: &str| params.get_non_empty(key).map(str::to_string);
        Self {
            vendor: field("vendor"),
            model: field("model"),
            version: field("version"),
        }
    }

    pub fn compile(&self) -> CompiledQuery {
        let mut query = CompiledQuery::new();
        let columns = [
            ("component_firmware_version.vendor", &self.vendor),
            ("component_firmware_version.model", &self.model),
            ("component_firmware_version.version", &self.version),
        ];
        for (column, value) in columns {
            if let Some(v) = value {
                query.push_eq(column, v);
            }
        }
        query
    }
}
