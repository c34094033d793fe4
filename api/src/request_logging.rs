use crate::query_params::QueryParams;
use poem::{Endpoint, IntoResponse, Middleware, Request, Response};
use std::collections::BTreeSet;
use std::time::Instant;

/// Logs every API call with a summary of its filter and paging parameters
pub struct RequestLogging;

impl<E: Endpoint> Middleware<E> for RequestLogging {
    type Output = RequestLoggingEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        RequestLoggingEndpoint { inner: ep }
    }
}

pub struct RequestLoggingEndpoint<E> {
    inner: E,
}

/// Shape of a list query, safe to log at `info`: counts only, no values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuerySummary {
    pub query_len: usize,
    pub attribute_filters: usize,
    pub component_groups: usize,
    pub paging: Paging,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Paging {
    #[default]
    None,
    Page,
    Cursor,
}

impl Paging {
    fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Page => "page",
            Self::Cursor => "cursor",
        }
    }
}

impl QuerySummary {
    pub fn from_query(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|r| !r.is_empty()) else {
            return Self::default();
        };
        let params = QueryParams::parse(raw);

        let mut attribute_filters = 0;
        let mut groups = BTreeSet::new();
        for key in params.keys() {
            if key == "attr" || key == "ver_attr" {
                attribute_filters += 1;
            } else if let Some(index) = group_index(key) {
                groups.insert(index);
            }
        }

        let paging = if params.contains_key("cursor") {
            Paging::Cursor
        } else if params.contains_key("page") || params.contains_key("limit") {
            Paging::Page
        } else {
            Paging::None
        };

        Self {
            query_len: raw.len(),
            attribute_filters,
            component_groups: groups.len(),
            paging,
        }
    }
}

/// `sc_3[model]`, `sc_3_attr` and `sc_3_ver_attr` all belong to group 3
fn group_index(key: &str) -> Option<u32> {
    let rest = key.strip_prefix("sc_")?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let suffix = &rest[end..];
    if suffix.is_empty() || suffix.starts_with('[') || suffix == "_attr" || suffix == "_ver_attr" {
        rest[..end].parse().ok()
    } else {
        None
    }
}

impl<E: Endpoint> Endpoint for RequestLoggingEndpoint<E> {
    type Output = Response;

    async fn call(&self, req: Request) -> poem::Result<Self::Output> {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let summary = QuerySummary::from_query(req.uri().query());
        let client_ip = req
            .remote_addr()
            .as_socket_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        // Filter values may carry serials and other inventory data
        tracing::debug!(method = %method, path = %path, query = ?req.uri().query(), "request received");

        let response = self.inner.call(req).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match response {
            Ok(resp) => resp.into_response(),
            Err(err) => {
                tracing::error!(
                    method = %method,
                    path = %path,
                    status = err.status().as_u16(),
                    duration_ms,
                    client_ip = %client_ip,
                    error = %err,
                    "request error"
                );
                return Err(err);
            }
        };

        let status = resp.status().as_u16();
        macro_rules! log_request {
            ($level:ident, $message:literal) => {
                tracing::$level!(
                    method = %method,
                    path = %path,
                    status,
                    query_len = summary.query_len,
                    attribute_filters = summary.attribute_filters,
                    component_groups = summary.component_groups,
                    paging = summary.paging.as_str(),
                    duration_ms,
                    client_ip = %client_ip,
                    $message
                )
            };
        }

        if resp.status().is_client_error() || resp.status().is_server_error() {
            log_request!(warn, "request failed");
        } else {
            log_request!(info, "request completed");
        }

        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_filters_and_groups() {
        let summary = QuerySummary::from_query(Some(
            "attr=meta~age~lt~7&ver_attr=bios&sc_0%5Bname%5D=Fin&sc_0_attr=hw~slot&sc_2_ver_attr=fw&limit=5",
        ));
        assert_eq!(summary.attribute_filters, 2);
        assert_eq!(summary.component_groups, 2);
        assert_eq!(summary.paging, Paging::Page);
    }

    #[test]
    fn test_summary_prefers_cursor() {
        let summary = QuerySummary::from_query(Some("cursor=MTA6MTA&page=2"));
        assert_eq!(summary.paging, Paging::Cursor);
        assert_eq!(summary.attribute_filters, 0);
    }

    #[test]
    fn test_summary_of_missing_query() {
        assert_eq!(QuerySummary::from_query(None), QuerySummary::default());
        assert_eq!(QuerySummary::from_query(Some("")), QuerySummary::default());
    }

    #[test]
    fn test_group_index() {
        assert_eq!(group_index("sc_3[model]"), Some(3));
        assert_eq!(group_index("sc_12_attr"), Some(12));
        assert_eq!(group_index("sc_0_ver_attr"), Some(0));
        assert_eq!(group_index("sc_x"), None);
        assert_eq!(group_index("sc_1_other"), None);
        assert_eq!(group_index("attr"), None);
    }
}
