mod builder;
mod components;
mod parser;
mod request;
mod types;

pub use builder::{CompiledQuery, SqlValue};
pub use request::{
    ComponentListFilter, FirmwareListFilter, FirmwareSetListFilter, ServerListFilter,
};
pub use types::SearchError;

#[cfg(test)]
pub use builder::{compile_attribute_filters, AttributeTarget};
#[cfg(test)]
pub use components::compile_component_groups;
#[cfg(test)]
pub use parser::{
    append_attribute_filter, append_component_group, decode_attribute_filter,
    encode_attribute_filter, parse_attribute_filters, parse_component_groups, ATTR_PARAM,
    VERSIONED_ATTR_PARAM,
};
#[cfg(test)]
pub use types::{AttributeFilter, ComponentMatchGroup, Operator};
