use super::parser::validate_attribute_filter;
use super::types::{AttributeFilter, Operator, SearchError};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Integer(i64),
    Uuid(uuid::Uuid),
}

/// Join clauses, WHERE predicates and bind values of one list statement.
///
/// Placeholders are PostgreSQL-style (`$1`, `$2`, ...) and numbered in bind
/// order, so joins and predicates may share a placeholder. Only trusted shape
/// (aliases, columns, operators) is ever written into the SQL text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
    pub joins: Vec<String>,
    pub predicates: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl CompiledQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a text value and returns its placeholder
    pub fn bind(&mut self, value: impl Into<String>) -> String {
        self.values.push(SqlValue::String(value.into()));
        format!("${}", self.values.len())
    }

    pub fn bind_int(&mut self, value: i64) -> String {
        self.values.push(SqlValue::Integer(value));
        format!("${}", self.values.len())
    }

    pub fn bind_uuid(&mut self, value: uuid::Uuid) -> String {
        self.values.push(SqlValue::Uuid(value));
        format!("${}", self.values.len())
    }

    /// `column = $n` on a trusted column name
    pub fn push_eq(&mut self, column: &str, value: &str) {
        let placeholder = self.bind(value);
        self.predicates.push(format!("{} = {}", column, placeholder));
    }

    pub fn join_sql(&self) -> String {
        self.joins
            .iter()
            .map(|join| format!(" {}", join))
            .collect()
    }

    pub fn where_sql(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }

    /// Counts distinct base rows; joins may repeat a row
    pub fn count_sql(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(DISTINCT {table}.id) FROM {table}{}{}",
            self.join_sql(),
            self.where_sql()
        )
    }

    /// Page query over the same joins and predicates as [`Self::count_sql`].
    ///
    /// Returns the SQL and the full bind list, limit and offset included.
    pub fn select_sql(
        &self,
        table: &str,
        order_sql: &str,
        limit: i64,
        offset: i64,
    ) -> (String, Vec<SqlValue>) {
        let mut page = self.clone();
        let limit_placeholder = page.bind_int(limit);
        let offset_placeholder = page.bind_int(offset);
        let sql = format!(
            "SELECT DISTINCT {table}.* FROM {table}{}{} ORDER BY {} LIMIT {} OFFSET {}",
            self.join_sql(),
            self.where_sql(),
            order_sql,
            limit_placeholder,
            offset_placeholder
        );
        (sql, page.values)
    }
}

/// Physical attribute table and owner column a filter list is compiled against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeTarget {
    ServerAttributes,
    ServerVersionedAttributes,
    ComponentAttributes,
    ComponentVersionedAttributes,
    FirmwareSetAttributes,
}

impl AttributeTarget {
    fn table(&self) -> &'static str {
        match self {
            Self::ServerAttributes | Self::ComponentAttributes => "attributes",
            Self::ServerVersionedAttributes | Self::ComponentVersionedAttributes => {
                "versioned_attributes"
            }
            Self::FirmwareSetAttributes => "attributes_firmware_set",
        }
    }

    fn owner_column(&self) -> &'static str {
        match self {
            Self::ServerAttributes | Self::ServerVersionedAttributes => "server_id",
            Self::ComponentAttributes | Self::ComponentVersionedAttributes => {
                "server_component_id"
            }
            Self::FirmwareSetAttributes => "firmware_set_id",
        }
    }

    fn is_versioned(&self) -> bool {
        matches!(
            self,
            Self::ServerVersionedAttributes | Self::ComponentVersionedAttributes
        )
    }

    fn alias_stem(&self) -> &'static str {
        if self.is_versioned() {
            "ver_attr"
        } else {
            "attr"
        }
    }
}

/// Compiles `filters` against the rows of `parent` and adds one predicate per
/// filter to the statement, so the statement requires all of them.
pub fn compile_attribute_filters(
    filters: &[AttributeFilter],
    target: AttributeTarget,
    parent: &str,
    query: &mut CompiledQuery,
) -> Result<(), SearchError> {
    let predicates = attribute_predicates(filters, target, parent, "", query)?;
    query.predicates.extend(predicates);
    Ok(())
}

/// Emits one uniquely aliased join per filter into `query` and returns the
/// filters' predicates without adding them.
///
/// Aliases are `<alias_prefix><attr|ver_attr>_<position>`: two filters never
/// share a joined row, even on the same namespace.
pub(crate) fn attribute_predicates(
    filters: &[AttributeFilter],
    target: AttributeTarget,
    parent: &str,
    alias_prefix: &str,
    query: &mut CompiledQuery,
) -> Result<Vec<String>, SearchError> {
    for filter in filters {
        validate_attribute_filter(filter, target.alias_stem())?;
    }

    let predicates = filters
        .iter()
        .enumerate()
        .map(|(position, filter)| {
            let alias = format!("{}{}_{}", alias_prefix, target.alias_stem(), position);
            compile_filter(filter, target, parent, &alias, query)
        })
        .collect();
    Ok(predicates)
}

fn compile_filter(
    filter: &AttributeFilter,
    target: AttributeTarget,
    parent: &str,
    alias: &str,
    query: &mut CompiledQuery,
) -> String {
    let table = target.table();
    let owner = target.owner_column();
    let namespace = query.bind(filter.namespace.as_str());

    if target.is_versioned() {
        // Only the newest row per (owner, namespace) takes part in filtering
        query.joins.push(format!(
            "LEFT OUTER JOIN {table} AS {alias} ON {alias}.{owner} = {parent}.id \
             AND {alias}.created_at = (SELECT MAX({alias}_latest.created_at) FROM {table} AS {alias}_latest \
             WHERE {alias}_latest.{owner} = {parent}.id AND {alias}_latest.namespace = {namespace})"
        ));
    } else {
        query.joins.push(format!(
            "LEFT OUTER JOIN {table} AS {alias} ON {alias}.{owner} = {parent}.id"
        ));
    }

    let namespace_predicate = format!("{}.namespace = {}", alias, namespace);
    let Some((last_key, parents)) = filter.key_path.split_last() else {
        return namespace_predicate;
    };

    let document_predicate = match filter.operator {
        None => {
            let mut document = format!("{}.data", alias);
            for key in parents {
                document = format!("{} -> {}", document, query.bind(key.as_str()));
            }
            format!("({}) ? {}", document, query.bind(last_key.as_str()))
        }
        Some(operator) => {
            let path: Vec<String> = filter
                .key_path
                .iter()
                .map(|key| query.bind(key.as_str()))
                .collect();
            let extracted = format!(
                "jsonb_extract_path_text({}.data, {})",
                alias,
                path.join(", ")
            );
            let value = query.bind(filter.value.as_str());
            match operator {
                Operator::Equal => format!("{} = {}", extracted, value),
                Operator::Like => format!("{} LIKE {}", extracted, value),
                Operator::GreaterThan => format!("({})::int > {}::int", extracted, value),
                Operator::LessThan => format!("({})::int < {}::int", extracted, value),
            }
        }
    };

    format!("({} AND {})", namespace_predicate, document_predicate)
}
