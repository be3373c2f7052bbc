//! Unit tests for GraphStore
//!
//! These tests verify find-or-create, relationship integrity and lookups.

use localgraph::{rel_types, GraphError, GraphStore, PropertyMap, PropertyValue};

fn file_props(path: &str, project: &str) -> PropertyMap {
    PropertyMap::new().with("path", path).with("projectId", project)
}

#[test]
fn test_find_or_create_same_arguments_same_identity() {
    let mut store = GraphStore::in_memory().unwrap();

    for _ in 0..5 {
        store
            .find_or_create_node(["Function", "Declaration"], file_props("a.src", "p1").with("name", "main"))
            .unwrap();
    }

    assert_eq!(store.node_count(), 1);
}

#[test]
fn test_lowest_identity_wins_among_matches() {
    let mut store = GraphStore::in_memory().unwrap();
    let first = store
        .create_node(["File"], file_props("a.src", "p1"))
        .unwrap();
    let _second = store
        .create_node(["File"], file_props("a.src", "p2"))
        .unwrap();

    // Both nodes match on `path` alone
    let found = store
        .find_or_create_node(["File"], PropertyMap::new().with("path", "a.src"))
        .unwrap();
    assert_eq!(found.identity, first.identity);
}

#[test]
fn test_labels_are_deduplicated_in_order() {
    let mut store = GraphStore::in_memory().unwrap();
    let node = store
        .create_node(["Function", "Declaration", "Function"], PropertyMap::new())
        .unwrap();

    assert_eq!(node.labels, vec!["Function", "Declaration"]);
    assert_eq!(node.primary_label(), Some("Function"));
}

#[test]
fn test_find_nodes_by_label_and_filter() {
    let mut store = GraphStore::in_memory().unwrap();
    store.create_node(["File"], file_props("a.src", "p1")).unwrap();
    store.create_node(["File"], file_props("b.src", "p1")).unwrap();
    store.create_node(["File"], file_props("a.src", "p2")).unwrap();

    let p1 = store.find_nodes("File", &PropertyMap::new().with("projectId", "p1"));
    assert_eq!(p1.len(), 2);
    assert!(p1.windows(2).all(|w| w[0].identity < w[1].identity));

    assert!(store.find_nodes("Class", &PropertyMap::new()).is_empty());
    assert_eq!(store.find_nodes("File", &PropertyMap::new()).len(), 3);
}

#[test]
fn test_bogus_endpoint_leaves_collections_unchanged() {
    let mut store = GraphStore::in_memory().unwrap();
    let a = store.create_node(["File"], PropertyMap::new()).unwrap();
    let b = store.create_node(["Function"], PropertyMap::new()).unwrap();
    store
        .create_relationship(a.identity, b.identity, rel_types::CONTAINS, PropertyMap::new())
        .unwrap();
    let before = store.snapshot();

    let err = store
        .create_relationship(u64::MAX, b.identity, rel_types::CONTAINS, PropertyMap::new())
        .unwrap_err();

    assert!(matches!(err, GraphError::NodeNotFound { .. }));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_empty_relationship_type_rejected() {
    let mut store = GraphStore::in_memory().unwrap();
    let a = store.create_node(["File"], PropertyMap::new()).unwrap();

    let err = store
        .create_relationship(a.identity, a.identity, " ", PropertyMap::new())
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidOperation { .. }));
}

#[test]
fn test_relationship_properties_participate_in_merge() {
    let mut store = GraphStore::in_memory().unwrap();
    let a = store.create_node(["Function"], PropertyMap::new()).unwrap();
    let b = store.create_node(["Call"], PropertyMap::new()).unwrap();

    let first = store
        .merge_relationship(a.identity, b.identity, rel_types::CALLS, PropertyMap::new().with("line", 3i64))
        .unwrap();
    let other_line = store
        .merge_relationship(a.identity, b.identity, rel_types::CALLS, PropertyMap::new().with("line", 9i64))
        .unwrap();
    let any = store
        .merge_relationship(a.identity, b.identity, rel_types::CALLS, PropertyMap::new())
        .unwrap();

    assert_ne!(first.identity, other_line.identity);
    assert_eq!(any.identity, first.identity);
    assert_eq!(store.relationship_count(), 2);
}

#[test]
fn test_get_missing_entities() {
    let store = GraphStore::in_memory().unwrap();
    assert!(matches!(store.get_node(1), Err(GraphError::NodeNotFound { .. })));
    assert!(matches!(
        store.get_relationship(1),
        Err(GraphError::RelationshipNotFound { .. })
    ));
}

#[test]
fn test_null_property_matches_only_null() {
    let mut store = GraphStore::in_memory().unwrap();
    let with_null = store
        .create_node(["Variable"], PropertyMap::new().with("init", PropertyValue::Null))
        .unwrap();
    store.create_node(["Variable"], PropertyMap::new()).unwrap();

    let found = store.find_nodes("Variable", &PropertyMap::new().with("init", PropertyValue::Null));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].identity, with_null.identity);
}

#[test]
fn test_stats_serialize() {
    let mut store = GraphStore::in_memory().unwrap();
    store.create_node(["File"], PropertyMap::new()).unwrap();

    let json = serde_json::to_value(store.stats()).unwrap();
    assert_eq!(json["node_count"], 1);
    assert_eq!(json["labels"]["File"], 1);
}

#[test]
fn test_non_finite_properties_rejected() {
    let mut store = GraphStore::in_memory().unwrap();
    let a = store.create_node(["Metric"], PropertyMap::new()).unwrap();

    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let props = PropertyMap::new().with("score", bad);
        assert!(matches!(
            store.find_or_create_node(["Metric"], props.clone()),
            Err(GraphError::InvalidOperation { .. })
        ));
        assert!(matches!(
            store.find_or_create_node_with(["Metric"], PropertyMap::new(), props.clone()),
            Err(GraphError::InvalidOperation { .. })
        ));
        assert!(store.create_node(["Metric"], props.clone()).is_err());
        assert!(store
            .create_relationship(a.identity, a.identity, rel_types::CALLS, props.clone())
            .is_err());
        assert!(store
            .merge_relationship(a.identity, a.identity, rel_types::CALLS, props)
            .is_err());
    }

    assert_eq!(store.node_count(), 1);
    assert_eq!(store.relationship_count(), 0);
}

#[test]
fn test_find_or_create_is_deterministic_for_floats() {
    let mut store = GraphStore::in_memory().unwrap();
    let props = PropertyMap::new().with("score", 0.25);

    let first = store.find_or_create_node(["Metric"], props.clone()).unwrap();
    let second = store.find_or_create_node(["Metric"], props).unwrap();
    assert_eq!(first.identity, second.identity);
    assert_eq!(store.node_count(), 1);
}
