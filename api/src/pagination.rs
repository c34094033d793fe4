use crate::query_params::QueryParams;
use crate::search::SearchError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 1000;
/// Highest row offset a page or cursor may point at
pub const MAX_OFFSET: i64 = i64::MAX - MAX_PAGE_SIZE;

const LIMIT_PARAM: &str = "limit";
const PAGE_PARAM: &str = "page";
const CURSOR_PARAM: &str = "cursor";
const ORDER_BY_PARAM: &str = "orderby";

/// Requested page size, clamped into `[1, MAX_PAGE_SIZE]`
pub fn effective_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        limit.min(MAX_PAGE_SIZE)
    }
}

/// Pagination controls of a list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationParams {
    pub limit: i64,
    pub page: i64,
    pub cursor: Option<String>,
    pub order_by: Option<String>,
}

impl PaginationParams {
    /// Unparsable numbers count as absent
    pub fn from_query(params: &QueryParams) -> Self {
        let number = |key: &str| {
            params
                .get_non_empty(key)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(0)
        };
        Self {
            limit: number(LIMIT_PARAM),
            page: number(PAGE_PARAM),
            cursor: params.get_non_empty(CURSOR_PARAM).map(str::to_string),
            order_by: params.get_non_empty(ORDER_BY_PARAM).map(str::to_string),
        }
    }

    /// Rows to fetch. A cursor replaces page and limit entirely.
    pub fn window(&self) -> PageWindow {
        if let Some(raw) = &self.cursor {
            let cursor = Cursor::decode(raw).unwrap_or_else(|| {
                tracing::debug!(cursor = %raw, "undecodable cursor, restarting from the first row");
                Cursor {
                    offset: 0,
                    limit: DEFAULT_PAGE_SIZE,
                }
            });
            return PageWindow {
                limit: cursor.limit,
                offset: cursor.offset.min(MAX_OFFSET),
                mode: PageMode::Cursor,
            };
        }

        let limit = effective_limit(self.limit);
        PageWindow {
            limit,
            offset: (self.page.max(1) - 1).saturating_mul(limit).min(MAX_OFFSET),
            mode: PageMode::Offset,
        }
    }

    /// Builds the response envelope for a page holding `result_count` rows out
    /// of `total_count` matches.
    pub fn envelope(&self, total_count: i64, result_count: usize, base: &LinkBase) -> Envelope {
        let window = self.window();
        let total_pages = total_pages(total_count, window.limit);
        let page = window.page();

        let links = match window.mode {
            PageMode::Offset => Links {
                self_link: base.page_link(page, window.limit),
                first: Some(base.page_link(1, window.limit)),
                previous: window.previous().map(|c| base.cursor_link(&c)),
                next: window.next(total_count).map(|c| base.cursor_link(&c)),
                last: Some(base.page_link(total_pages.max(1), window.limit)),
            },
            PageMode::Cursor => Links {
                self_link: base.cursor_link(&window.cursor()),
                first: None,
                previous: window.previous().map(|c| base.cursor_link(&c)),
                next: window.next(total_count).map(|c| base.cursor_link(&c)),
                last: None,
            },
        };

        Envelope {
            page_size: window.limit,
            page,
            page_count: result_count as i64,
            total_pages,
            total_record_count: total_count,
            links,
        }
    }
}

pub fn total_pages(total_count: i64, limit: i64) -> i64 {
    if total_count <= 0 {
        return 0;
    }
    (total_count + limit - 1) / limit
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Fresh request browsing by page number
    Offset,
    /// Continuation through a previously issued link
    Cursor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub offset: i64,
    pub mode: PageMode,
}

impl PageWindow {
    /// 1-based page the offset falls into
    pub fn page(&self) -> i64 {
        self.offset / self.limit + 1
    }

    fn cursor(&self) -> Cursor {
        Cursor {
            offset: self.offset,
            limit: self.limit,
        }
    }

    fn next(&self, total_count: i64) -> Option<Cursor> {
        let offset = self.offset.checked_add(self.limit)?;
        (offset < total_count).then_some(Cursor {
            offset,
            limit: self.limit,
        })
    }

    fn previous(&self) -> Option<Cursor> {
        (self.offset > 0).then(|| Cursor {
            offset: (self.offset - self.limit).max(0),
            limit: self.limit,
        })
    }
}

/// Opaque continuation token: unpadded URL-safe base64 of `offset:limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub offset: i64,
    pub limit: i64,
}

impl Cursor {
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}:{}", self.offset, self.limit))
    }

    pub fn decode(token: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        let (offset, limit) = text.split_once(':')?;
        Some(Self {
            offset: offset.parse::<i64>().ok()?.clamp(0, MAX_OFFSET),
            limit: effective_limit(limit.parse().ok()?),
        })
    }
}

/// URL and filter parameters every link of a response repeats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBase {
    url: String,
    filters: QueryParams,
}

impl LinkBase {
    pub fn new(url: impl Into<String>, query: &QueryParams) -> Self {
        Self {
            url: url.into(),
            filters: query.without(&[LIMIT_PARAM, PAGE_PARAM, CURSOR_PARAM]),
        }
    }

    /// `public_base_url` overrides the scheme and host seen on the request
    pub fn from_request(req: &poem::Request, public_base_url: Option<&str>) -> Self {
        let origin = match public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => {
                let header = |name: &str| {
                    req.headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                let scheme = header("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
                let host = header("host").unwrap_or_else(|| "localhost".to_string());
                format!("{}://{}", scheme, host)
            }
        };
        let url = format!("{}{}", origin, req.uri().path());
        Self::new(url, &QueryParams::from_request(req))
    }

    fn href(&self, params: QueryParams) -> Link {
        Link {
            href: format!("{}?{}", self.url, params.to_query_string()),
        }
    }

    fn page_link(&self, page: i64, limit: i64) -> Link {
        let mut params = self.filters.clone();
        params.append(LIMIT_PARAM, limit.to_string());
        params.append(PAGE_PARAM, page.to_string());
        self.href(params)
    }

    fn cursor_link(&self, cursor: &Cursor) -> Link {
        let mut params = self.filters.clone();
        params.append(CURSOR_PARAM, cursor.encode());
        self.href(params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Object)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Object)]
#[oai(skip_serializing_if_is_none)]
pub struct Links {
    #[serde(rename = "self")]
    #[oai(rename = "self")]
    pub self_link: Link,
    pub first: Option<Link>,
    pub previous: Option<Link>,
    pub next: Option<Link>,
    pub last: Option<Link>,
}

/// Page metadata of a list response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub page_size: i64,
    pub page: i64,
    pub page_count: i64,
    pub total_pages: i64,
    pub total_record_count: i64,
    pub links: Links,
}

/// Column a list may be ordered by; the primary key always breaks ties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub descending: bool,
}

impl OrderBy {
    /// Parses `column` or `-column` against the allowed columns
    pub fn parse(raw: Option<&str>, allowed: &[&'static str]) -> Result<Option<Self>, SearchError> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        let (name, descending) = match raw.strip_prefix('-') {
            Some(name) => (name, true),
            None => (raw, false),
        };
        allowed
            .iter()
            .find(|column| **column == name)
            .map(|column| {
                Some(Self {
                    column: *column,
                    descending,
                })
            })
            .ok_or_else(|| SearchError::UnknownOrderBy(raw.to_string()))
    }

    pub fn sql(order: Option<Self>, table: &str, default_column: &str) -> String {
        let (column, direction) = match order {
            Some(o) => (o.column, if o.descending { "DESC" } else { "ASC" }),
            None => (default_column, "ASC"),
        };
        format!("{table}.{column} {direction}, {table}.id ASC")
    }
}

#[cfg(test)]
mod tests;
