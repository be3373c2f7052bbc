//! Unit tests for record column access and coercion

use localgraph::{execute_query, GraphError, GraphStore, Node, PropertyMap, Value};

#[test]
fn test_keys_follow_projection_order() {
    let store = GraphStore::in_memory().unwrap();
    let records = execute_query(&store, "RETURN 'a' AS first, 2 AS second, true AS third").unwrap();

    assert_eq!(records[0].keys(), ["first", "second", "third"].map(String::from));
    let pairs: Vec<(&str, &Value)> = records[0].iter().collect();
    assert_eq!(pairs[2], ("third", &Value::Bool(true)));
}

#[test]
fn test_typed_get() {
    let store = GraphStore::in_memory().unwrap();
    let records = execute_query(&store, "RETURN 2.0 AS n, '7' AS s, null AS missing").unwrap();
    let record = &records[0];

    let n: i64 = record.get("n").unwrap();
    let s: i64 = record.get("s").unwrap();
    let f: f64 = record.get("s").unwrap();
    let missing: Option<String> = record.get("missing").unwrap();

    assert_eq!(n, 2);
    assert_eq!(s, 7);
    assert_eq!(f, 7.0);
    assert_eq!(missing, None);
}

#[test]
fn test_coercion_failures() {
    let store = GraphStore::in_memory().unwrap();
    let records = execute_query(&store, "RETURN 'abc' AS word, 1 AS one").unwrap();
    let record = &records[0];

    assert!(matches!(
        record.get_i64("word"),
        Err(GraphError::PropertyTypeMismatch { expected, .. }) if expected == "integer"
    ));
    assert!(matches!(
        record.get_bool("one"),
        Err(GraphError::PropertyTypeMismatch { .. })
    ));
    assert!(matches!(
        record.get_str("nope"),
        Err(GraphError::ColumnNotFound { .. })
    ));
}

#[test]
fn test_node_columns() {
    let mut store = GraphStore::in_memory().unwrap();
    store
        .create_node(["Class", "Declaration"], PropertyMap::new().with("name", "Repo"))
        .unwrap();

    let records = execute_query(&store, "MATCH (c:Class) RETURN c, labels(c) AS labels, id(c) AS id").unwrap();
    let record = &records[0];

    let node: Node = record.get("c").unwrap();
    assert_eq!(node.properties.get_string("name"), Some("Repo"));
    assert_eq!(record.get_i64("id").unwrap(), node.identity as i64);
    assert_eq!(record.get::<Vec<String>>("labels").unwrap(), node.labels);
    assert!(record.get_node("id").is_err());
}

#[test]
fn test_out_of_range_integers_are_mismatches() {
    let mut store = GraphStore::in_memory().unwrap();
    store
        .create_node(
            ["M"],
            PropertyMap::new()
                .with("big", 1e20)
                .with("text", "1e20")
                .with("edge", -9_223_372_036_854_775_808.0)
                .with("exp", "3e2"),
        )
        .unwrap();
    let records = execute_query(
        &store,
        "MATCH (m:M) RETURN m.big AS big, m.text AS text, m.edge AS edge, m.exp AS exp",
    )
    .unwrap();
    let record = &records[0];

    assert!(matches!(
        record.get_i64("big"),
        Err(GraphError::PropertyTypeMismatch { ref expected, .. }) if expected == "integer"
    ));
    assert!(matches!(
        record.get_i64("text"),
        Err(GraphError::PropertyTypeMismatch { .. })
    ));
    assert_eq!(record.get_f64("big").unwrap(), 1e20);
    assert_eq!(record.get_i64("edge").unwrap(), i64::MIN);
    assert_eq!(record.get_i64("exp").unwrap(), 300);
}
