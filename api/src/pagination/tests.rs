use super::*;

fn base() -> LinkBase {
    LinkBase::new(
        "http://inventory.test/api/v1/servers",
        &QueryParams::parse("attr=meta~age~lt~7&page=9&limit=3"),
    )
}

fn params(limit: i64, page: i64) -> PaginationParams {
    PaginationParams {
        limit,
        page,
        ..Default::default()
    }
}

fn query_of(link: &Link) -> QueryParams {
    let (_, query) = link.href.split_once('?').unwrap();
    QueryParams::parse(query)
}

#[test]
fn test_limit_above_max_is_clamped() {
    assert_eq!(params(100_000, 1).window().limit, MAX_PAGE_SIZE);
}

#[test]
fn test_limit_zero_or_negative_uses_default() {
    assert_eq!(params(0, 1).window().limit, DEFAULT_PAGE_SIZE);
    assert_eq!(params(-5, 1).window().limit, DEFAULT_PAGE_SIZE);
}

#[test]
fn test_page_zero_is_first_page() {
    assert_eq!(params(10, 0).window().offset, 0);
    assert_eq!(params(10, -3).window().offset, 0);
    assert_eq!(params(10, 1).window().offset, 0);
    assert_eq!(params(10, 3).window().offset, 20);
}

#[test]
fn test_from_query_ignores_garbage_numbers() {
    let p = PaginationParams::from_query(&QueryParams::parse("limit=abc&page=2&orderby=-name"));
    assert_eq!(p.limit, 0);
    assert_eq!(p.page, 2);
    assert_eq!(p.order_by.as_deref(), Some("-name"));
    assert_eq!(p.window().limit, DEFAULT_PAGE_SIZE);
}

#[test]
fn test_total_pages() {
    assert_eq!(total_pages(0, 10), 0);
    assert_eq!(total_pages(1, 10), 1);
    assert_eq!(total_pages(10, 10), 1);
    assert_eq!(total_pages(11, 10), 2);
}

#[test]
fn test_first_page_links() {
    let envelope = params(10, 1).envelope(25, 10, &base());

    assert_eq!(envelope.total_pages, 3);
    assert_eq!(envelope.page, 1);
    assert_eq!(envelope.page_count, 10);
    assert_eq!(envelope.total_record_count, 25);
    assert!(envelope.links.previous.is_none());

    let next = envelope.links.next.expect("next link on page 1 of 3");
    let next_query = query_of(&next);
    assert_eq!(next_query.get("attr"), Some("meta~age~lt~7"));
    assert_eq!(next_query.get("page"), None);
    let cursor = Cursor::decode(next_query.get("cursor").unwrap()).unwrap();
    assert_eq!(cursor, Cursor { offset: 10, limit: 10 });

    let first = query_of(envelope.links.first.as_ref().unwrap());
    assert_eq!(first.get("page"), Some("1"));
    let last = query_of(envelope.links.last.as_ref().unwrap());
    assert_eq!(last.get("page"), Some("3"));
    assert_eq!(last.get("limit"), Some("10"));
}

#[test]
fn test_last_page_has_no_next() {
    let envelope = params(10, 3).envelope(25, 5, &base());
    assert!(envelope.links.next.is_none());
    let previous = envelope.links.previous.expect("previous link on last page");
    let cursor = Cursor::decode(query_of(&previous).get("cursor").unwrap()).unwrap();
    assert_eq!(cursor.offset, 10);
}

#[test]
fn test_self_link_echoes_filters_and_replaces_page() {
    let envelope = params(10, 2).envelope(25, 10, &base());
    let self_query = query_of(&envelope.links.self_link);
    let attrs: Vec<&str> = self_query.get_all("attr").collect();
    assert_eq!(attrs, vec!["meta~age~lt~7"]);
    assert_eq!(self_query.get("page"), Some("2"));
    assert_eq!(self_query.get_all("page").count(), 1);
    assert!(envelope
        .links
        .self_link
        .href
        .starts_with("http://inventory.test/api/v1/servers?"));
}

#[test]
fn test_empty_result_links() {
    let envelope = params(10, 1).envelope(0, 0, &base());
    assert_eq!(envelope.total_pages, 0);
    assert!(envelope.links.next.is_none());
    assert!(envelope.links.previous.is_none());
    let last = query_of(envelope.links.last.as_ref().unwrap());
    assert_eq!(last.get("page"), Some("1"));
}

#[test]
fn test_cursor_mode_omits_first_and_last() {
    let cursor = Cursor { offset: 10, limit: 10 }.encode();
    let p = PaginationParams {
        limit: 500,
        page: 7,
        cursor: Some(cursor),
        order_by: None,
    };

    assert_eq!(p.window().limit, 10);
    assert_eq!(p.window().offset, 10);

    let envelope = p.envelope(25, 10, &base());
    assert_eq!(envelope.page, 2);
    assert!(envelope.links.first.is_none());
    assert!(envelope.links.last.is_none());
    assert!(envelope.links.next.is_some());
    assert!(envelope.links.previous.is_some());
}

#[test]
fn test_bad_cursor_restarts_from_first_row() {
    let p = PaginationParams {
        cursor: Some("!!not-a-cursor".to_string()),
        ..Default::default()
    };
    let window = p.window();
    assert_eq!(window.offset, 0);
    assert_eq!(window.limit, DEFAULT_PAGE_SIZE);
    assert_eq!(window.mode, PageMode::Cursor);
}

#[test]
fn test_cursor_limit_is_clamped() {
    let token = URL_SAFE_NO_PAD.encode("-20:5000");
    let cursor = Cursor::decode(&token).unwrap();
    assert_eq!(cursor, Cursor { offset: 0, limit: MAX_PAGE_SIZE });
}

#[test]
fn test_huge_page_number_stays_in_range() {
    let p = params(MAX_PAGE_SIZE, i64::MAX);
    assert_eq!(p.window().offset, MAX_OFFSET);

    let envelope = p.envelope(5, 0, &base());
    assert!(envelope.links.next.is_none());
    assert!(envelope.page > 0);
    let previous = envelope.links.previous.expect("previous link past the end");
    let cursor = Cursor::decode(query_of(&previous).get("cursor").unwrap()).unwrap();
    assert_eq!(cursor.offset, MAX_OFFSET - MAX_PAGE_SIZE);
}

#[test]
fn test_cursor_at_max_offset_has_no_next() {
    let p = PaginationParams {
        cursor: Some(Cursor { offset: i64::MAX, limit: 10 }.encode()),
        ..Default::default()
    };
    let window = p.window();
    assert_eq!(window.offset, MAX_OFFSET);
    assert_eq!(window.limit, 10);

    let envelope = p.envelope(5, 0, &base());
    assert!(envelope.links.next.is_none());
    assert!(envelope.links.previous.is_some());
}

#[test]
fn test_order_by_allowlist() {
    let allowed = ["name", "created_at"];
    assert_eq!(OrderBy::parse(None, &allowed).unwrap(), None);
    assert_eq!(
        OrderBy::parse(Some("-name"), &allowed).unwrap(),
        Some(OrderBy {
            column: "name",
            descending: true
        })
    );
    assert_eq!(
        OrderBy::parse(Some("id; DROP TABLE servers"), &allowed),
        Err(SearchError::UnknownOrderBy("id; DROP TABLE servers".to_string()))
    );
}

#[test]
fn test_order_by_sql() {
    let order = OrderBy::parse(Some("-name"), &["name"]).unwrap();
    assert_eq!(
        OrderBy::sql(order, "servers", "created_at"),
        "servers.name DESC, servers.id ASC"
    );
    assert_eq!(
        OrderBy::sql(None, "servers", "created_at"),
        "servers.created_at ASC, servers.id ASC"
    );
}
