use super::*;
use crate::database::test_helpers::setup_test_db;
use crate::database::{AttributeInput, AttributeOwner, ComponentInput, ComponentTypeInput};
use crate::pagination::PageMode;
use crate::query_params::QueryParams;
use crate::search::{AttributeFilter, ComponentMatchGroup, Operator};
use serde_json::json;

fn first_page() -> PageWindow {
    PageWindow {
        limit: 100,
        offset: 0,
        mode: PageMode::Offset,
    }
}

async fn server_named(db: &Database, name: &str) -> Server {
    db.create_server(&ServerInput {
        name: Some(name.to_string()),
        facility_code: Some("AMS1".to_string()),
    })
    .await
    .unwrap()
}

async fn matching_names(db: &Database, filter: &ServerListFilter) -> Vec<String> {
    let query = filter.compile().unwrap();
    let order = Some(OrderBy {
        column: "name",
        descending: false,
    });
    let (servers, total) = db.list_servers(&query, order, first_page()).await.unwrap();
    assert_eq!(total, servers.len() as i64);
    servers.into_iter().filter_map(|s| s.name).collect()
}

async fn seed_fin_types(db: &Database) {
    db.create_component_type(&ComponentTypeInput {
        name: "Fins".to_string(),
        slug: "fins".to_string(),
    })
    .await
    .unwrap();
}

fn fin(name: &str, location: &str) -> ComponentInput {
    ComponentInput {
        component_type_slug: "fins".to_string(),
        name: Some(name.to_string()),
        attributes: vec![AttributeInput {
            namespace: "sh.hollow.fin".to_string(),
            data: json!({"location": location}),
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_server_crud() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    let server = server_named(&db, "nemo").await;
    assert_eq!(server.name.as_deref(), Some("nemo"));

    let fetched = db.get_server(server.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, server.id);

    let updated = db
        .update_server(
            server.id,
            &ServerInput {
                name: Some("dory".to_string()),
                facility_code: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name.as_deref(), Some("dory"));
    assert_eq!(updated.facility_code, None);

    assert!(db.delete_server(server.id).await.unwrap());
    assert!(db.get_server(server.id).await.unwrap().is_none());
    assert!(!db.delete_server(server.id).await.unwrap());
    assert!(db
        .update_server(server.id, &ServerInput::default())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_numeric_comparisons_on_attribute_values() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    for (name, age) in [("young", 3), ("middle", 9), ("old", 15)] {
        let server = server_named(&db, name).await;
        db.upsert_attribute(
            AttributeOwner::Server(server.id),
            "meta",
            &json!({"age": age}),
        )
        .await
        .unwrap();
    }

    let younger = ServerListFilter {
        attributes: vec![AttributeFilter::compare(
            "meta",
            &["age"],
            Operator::LessThan,
            "7",
        )],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &younger).await, vec!["young"]);

    let older = ServerListFilter {
        attributes: vec![AttributeFilter::compare(
            "meta",
            &["age"],
            Operator::GreaterThan,
            "10",
        )],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &older).await, vec!["old"]);

    // lt 7 and gt 10 on the same namespace cannot both hold
    let both = ServerListFilter {
        attributes: vec![
            AttributeFilter::compare("meta", &["age"], Operator::LessThan, "7"),
            AttributeFilter::compare("meta", &["age"], Operator::GreaterThan, "10"),
        ],
        ..Default::default()
    };
    assert!(matching_names(&db, &both).await.is_empty());
}

#[tokio::test]
async fn test_filters_on_one_namespace_use_separate_rows() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    let both = server_named(&db, "both").await;
    db.upsert_attribute(
        AttributeOwner::Server(both.id),
        "sh.hollow.tag",
        &json!({"a": "1", "b": "2"}),
    )
    .await
    .unwrap();
    let only_a = server_named(&db, "only-a").await;
    db.upsert_attribute(
        AttributeOwner::Server(only_a.id),
        "sh.hollow.tag",
        &json!({"a": "1"}),
    )
    .await
    .unwrap();

    let a_and_b = ServerListFilter {
        attributes: vec![
            AttributeFilter::compare("sh.hollow.tag", &["a"], Operator::Equal, "1"),
            AttributeFilter::compare("sh.hollow.tag", &["b"], Operator::Equal, "2"),
        ],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &a_and_b).await, vec!["both"]);

    let only_first = ServerListFilter {
        attributes: vec![AttributeFilter::compare(
            "sh.hollow.tag",
            &["a"],
            Operator::Equal,
            "1",
        )],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &only_first).await, vec!["both", "only-a"]);
}

#[tokio::test]
async fn test_existence_and_like_filters() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    let nested = server_named(&db, "nested").await;
    db.upsert_attribute(
        AttributeOwner::Server(nested.id),
        "sh.hollow.bmc",
        &json!({"net": {"mac": "aa:bb:cc:dd:ee:ff"}}),
    )
    .await
    .unwrap();
    let flat = server_named(&db, "flat").await;
    db.upsert_attribute(
        AttributeOwner::Server(flat.id),
        "sh.hollow.bmc",
        &json!({"mac": "11:22:33:44:55:66"}),
    )
    .await
    .unwrap();
    server_named(&db, "bare").await;

    let has_namespace = ServerListFilter {
        attributes: vec![AttributeFilter::namespace("sh.hollow.bmc")],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &has_namespace).await, vec!["flat", "nested"]);

    let has_nested_key = ServerListFilter {
        attributes: vec![AttributeFilter::has_key("sh.hollow.bmc", &["net", "mac"])],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &has_nested_key).await, vec!["nested"]);

    let prefix = ServerListFilter {
        attributes: vec![AttributeFilter::compare(
            "sh.hollow.bmc",
            &["net", "mac"],
            Operator::Like,
            "aa:bb",
        )],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &prefix).await, vec!["nested"]);
}

#[tokio::test]
async fn test_component_groups_match_one_component_each() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    seed_fin_types(&db).await;

    let nemo = server_named(&db, "nemo").await;
    db.create_server_components(nemo.id, &[fin("Belly", "Up"), fin("Fin", "Left")])
        .await
        .unwrap();
    let dory = server_named(&db, "dory").await;
    db.create_server_components(dory.id, &[fin("Belly", "Left"), fin("Fin", "Up")])
        .await
        .unwrap();

    let belly_up = ComponentMatchGroup {
        name: Some("Belly".to_string()),
        attribute_filters: vec![AttributeFilter::compare(
            "sh.hollow.fin",
            &["location"],
            Operator::Equal,
            "Up",
        )],
        ..Default::default()
    };
    let fin_left = ComponentMatchGroup {
        name: Some("Fin".to_string()),
        component_type_slug: Some("fins".to_string()),
        attribute_filters: vec![AttributeFilter::compare(
            "sh.hollow.fin",
            &["location"],
            Operator::Equal,
            "Left",
        )],
        ..Default::default()
    };

    let filter = ServerListFilter {
        components: vec![belly_up.clone(), fin_left],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &filter).await, vec!["nemo"]);

    let single = ServerListFilter {
        components: vec![belly_up],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &single).await, vec!["nemo"]);

    let wrong_type = ServerListFilter {
        components: vec![ComponentMatchGroup {
            component_type_slug: Some("fans".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    assert!(matching_names(&db, &wrong_type).await.is_empty());
}

#[tokio::test]
async fn test_versioned_filters_see_newest_value_only() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    let server = server_named(&db, "nemo").await;
    let owner = AttributeOwner::Server(server.id);
    db.append_versioned_attribute(owner, "sh.hollow.bios", &json!({"version": "1.0"}))
        .await
        .unwrap();
    db.append_versioned_attribute(owner, "sh.hollow.bios", &json!({"version": "2.0"}))
        .await
        .unwrap();

    let old = ServerListFilter {
        versioned_attributes: vec![AttributeFilter::compare(
            "sh.hollow.bios",
            &["version"],
            Operator::Equal,
            "1.0",
        )],
        ..Default::default()
    };
    assert!(matching_names(&db, &old).await.is_empty());

    let current = ServerListFilter {
        versioned_attributes: vec![AttributeFilter::compare(
            "sh.hollow.bios",
            &["version"],
            Operator::Equal,
            "2.0",
        )],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &current).await, vec!["nemo"]);
}

#[tokio::test]
async fn test_repeated_versioned_data_bumps_tally() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    let server = server_named(&db, "nemo").await;
    let owner = AttributeOwner::Server(server.id);
    let data = json!({"version": "1.0"});

    let first = db
        .append_versioned_attribute(owner, "sh.hollow.bios", &data)
        .await
        .unwrap();
    assert_eq!(first.tally, 0);

    let again = db
        .append_versioned_attribute(owner, "sh.hollow.bios", &data)
        .await
        .unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.tally, 1);

    let changed = db
        .append_versioned_attribute(owner, "sh.hollow.bios", &json!({"version": "1.1"}))
        .await
        .unwrap();
    assert_ne!(changed.id, first.id);

    let current = db.current_versioned_attributes(owner).await.unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, changed.id);
}

#[tokio::test]
async fn test_concurrent_identical_reports_share_one_version() {
    let Some(db) = setup_test_db().await else {
        return;
    };

    let server = server_named(&db, "dory").await;
    let owner = AttributeOwner::Server(server.id);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move {
                db.append_versioned_attribute(owner, "sh.hollow.bios", &json!({"version": "2.1"}))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM versioned_attributes WHERE server_id = $1")
            .bind(server.id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(rows, 1);

    let current = db.current_versioned_attributes(owner).await.unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].tally, 3);
}

#[tokio::test]
async fn test_list_pages_count_distinct_servers() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    seed_fin_types(&db).await;

    for i in 0..5 {
        let server = server_named(&db, &format!("server-{i}")).await;
        // two matching components per server must not duplicate the server
        db.create_server_components(server.id, &[fin("Fin", "Up"), fin("Fin", "Up")])
            .await
            .unwrap();
    }

    let query = ServerListFilter::from_query(&QueryParams::parse("sc_0[name]=Fin"))
        .unwrap()
        .compile()
        .unwrap();
    let window = PageWindow {
        limit: 2,
        offset: 4,
        mode: PageMode::Offset,
    };
    let (servers, total) = db.list_servers(&query, None, window).await.unwrap();
    assert_eq!(total, 5);
    assert_eq!(servers.len(), 1);
}

#[tokio::test]
async fn test_deleting_server_removes_components_and_attributes() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    seed_fin_types(&db).await;

    let server = server_named(&db, "nemo").await;
    let components = db
        .create_server_components(server.id, &[fin("Belly", "Up")])
        .await
        .unwrap();
    db.upsert_attribute(AttributeOwner::Server(server.id), "sh.hollow.fish", &json!({}))
        .await
        .unwrap();

    assert!(db.delete_server(server.id).await.unwrap());

    let remaining = db
        .list_attributes(AttributeOwner::Component(components[0].id))
        .await
        .unwrap();
    assert!(remaining.is_empty());
    let remaining = db
        .list_attributes(AttributeOwner::Server(server.id))
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_mismatched_model_and_serial_do_not_combine_across_components() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    seed_fin_types(&db).await;

    let part = |model: &str, serial: &str| ComponentInput {
        component_type_slug: "fins".to_string(),
        model: Some(model.to_string()),
        serial: Some(serial.to_string()),
        ..Default::default()
    };
    let nemo = server_named(&db, "nemo").await;
    db.create_server_components(nemo.id, &[part("Belly", "Up"), part("Fin", "Left")])
        .await
        .unwrap();

    let group = |model: &str, serial: &str| ComponentMatchGroup {
        model: Some(model.to_string()),
        serial: Some(serial.to_string()),
        ..Default::default()
    };

    let mismatched = ServerListFilter {
        components: vec![group("Belly", "Left")],
        ..Default::default()
    };
    assert!(matching_names(&db, &mismatched).await.is_empty());

    let matched = ServerListFilter {
        components: vec![group("Belly", "Up"), group("Fin", "Left")],
        ..Default::default()
    };
    assert_eq!(matching_names(&db, &matched).await, vec!["nemo"]);
}
