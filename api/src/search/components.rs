use super::builder::{attribute_predicates, AttributeTarget, CompiledQuery};
use super::types::{ComponentMatchGroup, SearchError};

const COMPONENT_TABLE: &str = "server_components";
const COMPONENT_TYPE_TABLE: &str = "server_component_types";

/// Compiles component match groups against the servers in `parent`.
///
/// Group `j` joins its own component row as `comp_j` and every condition of
/// the group, nested attribute filters included, is checked on that row only.
/// The statement requires every group; different groups may be satisfied by
/// different components of the same server.
pub fn compile_component_groups(
    groups: &[ComponentMatchGroup],
    parent: &str,
    query: &mut CompiledQuery,
) -> Result<(), SearchError> {
    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            continue;
        }

        let alias = format!("comp_{}", index);
        query.joins.push(format!(
            "LEFT OUTER JOIN {COMPONENT_TABLE} AS {alias} ON {alias}.server_id = {parent}.id"
        ));

        let conditions = group_conditions(group, &alias, &format!("{}_", alias), query)?;
        query.predicates.push(format!("({})", conditions.join(" AND ")));
    }
    Ok(())
}

/// Compiles one group directly against component rows already in the
/// statement, e.g. when components are the listed entity.
pub fn compile_component_conditions(
    group: &ComponentMatchGroup,
    component: &str,
    query: &mut CompiledQuery,
) -> Result<(), SearchError> {
    let conditions = group_conditions(group, component, "", query)?;
    query.predicates.extend(conditions);
    Ok(())
}

fn group_conditions(
    group: &ComponentMatchGroup,
    component: &str,
    alias_prefix: &str,
    query: &mut CompiledQuery,
) -> Result<Vec<String>, SearchError> {
    let mut conditions = Vec::new();

    for (column, value) in group.direct_fields() {
        let placeholder = query.bind(value);
        conditions.push(format!("{}.{} = {}", component, column, placeholder));
    }

    if let Some(slug) = group.type_slug() {
        let type_alias = format!("{}type", type_alias_prefix(component, alias_prefix));
        query.joins.push(format!(
            "LEFT OUTER JOIN {COMPONENT_TYPE_TABLE} AS {type_alias} \
             ON {type_alias}.id = {component}.server_component_type_id"
        ));
        let placeholder = query.bind(slug);
        conditions.push(format!("{}.slug = {}", type_alias, placeholder));
    }

    conditions.extend(attribute_predicates(
        &group.attribute_filters,
        AttributeTarget::ComponentAttributes,
        component,
        alias_prefix,
        query,
    )?);
    conditions.extend(attribute_predicates(
        &group.versioned_attribute_filters,
        AttributeTarget::ComponentVersionedAttributes,
        component,
        alias_prefix,
        query,
    )?);

    Ok(conditions)
}

fn type_alias_prefix(component: &str, alias_prefix: &str) -> String {
    if alias_prefix.is_empty() {
        format!("{}_", component)
    } else {
        alias_prefix.to_string()
    }
}
