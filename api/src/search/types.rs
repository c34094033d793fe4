/// AST types for the attribute filter grammar

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,       // ns~key~eq~value
    Like,        // ns~key~like~value
    GreaterThan, // ns~key~gt~value
    LessThan,    // ns~key~lt~value
}

impl Operator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(Self::Equal),
            "like" => Some(Self::Like),
            "gt" => Some(Self::GreaterThan),
            "lt" => Some(Self::LessThan),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Equal => "eq",
            Self::Like => "like",
            Self::GreaterThan => "gt",
            Self::LessThan => "lt",
        }
    }
}

/// One test against a namespaced JSON document.
///
/// Without an operator the filter only checks that `key_path` exists in the
/// document; without a key path it only checks that the namespace exists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeFilter {
    pub namespace: String,
    pub key_path: Vec<String>,
    pub operator: Option<Operator>,
    pub value: String,
}

impl AttributeFilter {
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn has_key(namespace: impl Into<String>, key_path: &[&str]) -> Self {
        Self {
            namespace: namespace.into(),
            key_path: key_path.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn compare(
        namespace: impl Into<String>,
        key_path: &[&str],
        operator: Operator,
        value: impl Into<String>,
    ) -> Self {
        let mut filter = Self {
            namespace: namespace.into(),
            key_path: key_path.iter().map(|k| k.to_string()).collect(),
            operator: Some(operator),
            value: value.into(),
        };
        filter.apply_like_wildcard();
        filter
    }

    /// `like` values without a wildcard match as a prefix
    pub(crate) fn apply_like_wildcard(&mut self) {
        if self.operator == Some(Operator::Like) && !self.value.contains('%') {
            self.value.push('%');
        }
    }
}

/// "The server must have a component such that..."
///
/// Every non-empty field and every filter is satisfied by the same component row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentMatchGroup {
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub component_type_slug: Option<String>,
    pub attribute_filters: Vec<AttributeFilter>,
    pub versioned_attribute_filters: Vec<AttributeFilter>,
}

impl ComponentMatchGroup {
    pub fn is_empty(&self) -> bool {
        self.direct_fields().next().is_none()
            && self.type_slug().is_none()
            && self.attribute_filters.is_empty()
            && self.versioned_attribute_filters.is_empty()
    }

    /// Non-empty direct fields as `(column, value)` on the component row
    pub(crate) fn direct_fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("name", self.name.as_deref()),
            ("vendor", self.vendor.as_deref()),
            ("model", self.model.as_deref()),
            ("serial", self.serial.as_deref()),
        ]
        .into_iter()
        .filter_map(|(column, value)| match value {
            Some(v) if !v.is_empty() => Some((column, v)),
            _ => None,
        })
    }

    pub(crate) fn type_slug(&self) -> Option<&str> {
        self.component_type_slug
            .as_deref()
            .filter(|slug| !slug.is_empty())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("attribute filter {param}: key path `{key_path}` given without a namespace")]
    MissingNamespace { param: String, key_path: String },
    #[error("attribute filter {param}: namespace must not be empty")]
    EmptyNamespace { param: String },
    #[error("unknown orderby column: {0}")]
    UnknownOrderBy(String),
}
