use super::types::{AttributeFilter, ComponentMatchGroup, Operator, SearchError};
use crate::query_params::QueryParams;

const SEGMENT_SEPARATOR: char = '~';
const KEY_SEPARATOR: char = '.';

/// Query keys of the top-level filters
pub const ATTR_PARAM: &str = "attr";
pub const VERSIONED_ATTR_PARAM: &str = "ver_attr";

/// Decodes `namespace`, `namespace~key.path` or `namespace~key.path~op~value`.
///
/// Never fails. An unknown operator leaves a key existence test; any other
/// segment count keeps only the namespace.
pub fn decode_attribute_filter(token: &str) -> AttributeFilter {
    let segments: Vec<&str> = token.split(SEGMENT_SEPARATOR).collect();

    let mut filter = AttributeFilter::namespace(segments[0]);
    match segments.as_slice() {
        [_] => {}
        [_, key_path] => filter.key_path = split_key_path(key_path),
        [_, key_path, operator, value] => {
            filter.key_path = split_key_path(key_path);
            if let Some(op) = Operator::from_token(operator) {
                filter.operator = Some(op);
                filter.value = value.to_string();
                filter.apply_like_wildcard();
            } else {
                tracing::debug!(operator = %operator, "ignoring unknown attribute filter operator");
            }
        }
        _ => {}
    }
    filter
}

fn split_key_path(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(KEY_SEPARATOR).map(str::to_string).collect()
}

/// Minimal token for a filter, the inverse of [`decode_attribute_filter`]
pub fn encode_attribute_filter(filter: &AttributeFilter) -> String {
    let mut token = filter.namespace.clone();
    if filter.key_path.is_empty() && filter.operator.is_none() {
        return token;
    }

    token.push(SEGMENT_SEPARATOR);
    token.push_str(&filter.key_path.join(&KEY_SEPARATOR.to_string()));
    if let Some(op) = filter.operator {
        token.push(SEGMENT_SEPARATOR);
        token.push_str(op.token());
        token.push(SEGMENT_SEPARATOR);
        token.push_str(&filter.value);
    }
    token
}

#[cfg(test)]
pub fn append_attribute_filter(params: &mut QueryParams, key: &str, filter: &AttributeFilter) {
    params.append(key, encode_attribute_filter(filter));
}

/// Rejects filters the compiler cannot express.
pub fn validate_attribute_filter(filter: &AttributeFilter, param: &str) -> Result<(), SearchError> {
    if !filter.namespace.is_empty() {
        return Ok(());
    }
    if filter.key_path.is_empty() {
        Err(SearchError::EmptyNamespace {
            param: param.to_string(),
        })
    } else {
        Err(SearchError::MissingNamespace {
            param: param.to_string(),
            key_path: filter.key_path.join("."),
        })
    }
}

/// Decodes every occurrence of `key`, in query order
pub fn parse_attribute_filters(
    params: &QueryParams,
    key: &str,
) -> Result<Vec<AttributeFilter>, SearchError> {
    params
        .get_all(key)
        .map(|token| {
            let filter = decode_attribute_filter(token);
            validate_attribute_filter(&filter, key)?;
            tracing::debug!(
                param = %key,
                filter = %encode_attribute_filter(&filter),
                "decoded attribute filter"
            );
            Ok(filter)
        })
        .collect()
}

fn group_prefix(index: usize) -> String {
    format!("sc_{}", index)
}

/// Reads `sc_<i>[field]`, `sc_<i>_attr` and `sc_<i>_ver_attr` groups.
///
/// Indexes are 0-based and contiguous; scanning stops at the first index with
/// no parameters at all. Groups without any condition are dropped.
pub fn parse_component_groups(params: &QueryParams) -> Result<Vec<ComponentMatchGroup>, SearchError> {
    let mut groups = Vec::new();

    for index in 0.. {
        let prefix = group_prefix(index);
        let attr_key = format!("{}_attr", prefix);
        let ver_attr_key = format!("{}_ver_attr", prefix);
        let field_prefix = format!("{}[", prefix);

        if !params.has_key_with_prefix(&field_prefix)
            && !params.contains_key(&attr_key)
            && !params.contains_key(&ver_attr_key)
        {
            break;
        }

        let field = |name: &str| {
            params
                .get_non_empty(&format!("{}[{}]", prefix, name))
                .map(str::to_string)
        };

        let group = ComponentMatchGroup {
            name: field("name"),
            vendor: field("vendor"),
            model: field("model"),
            serial: field("serial"),
            component_type_slug: field("type"),
            attribute_filters: parse_attribute_filters(params, &attr_key)?,
            versioned_attribute_filters: parse_attribute_filters(params, &ver_attr_key)?,
        };

        if group.is_empty() {
            tracing::debug!(group = index, "dropping empty component match group");
            continue;
        }
        groups.push(group);
    }

    Ok(groups)
}

/// Writes a group back as `sc_<index>...` parameters
#[cfg(test)]
pub fn append_component_group(params: &mut QueryParams, index: usize, group: &ComponentMatchGroup) {
    let prefix = group_prefix(index);
    let fields = [
        ("name", &group.name),
        ("vendor", &group.vendor),
        ("model", &group.model),
        ("serial", &group.serial),
        ("type", &group.component_type_slug),
    ];
    for (name, value) in fields {
        if let Some(v) = value {
            params.append(format!("{}[{}]", prefix, name), v.clone());
        }
    }
    for filter in &group.attribute_filters {
        append_attribute_filter(params, &format!("{}_attr", prefix), filter);
    }
    for filter in &group.versioned_attribute_filters {
        append_attribute_filter(params, &format!("{}_ver_attr", prefix), filter);
    }
}
