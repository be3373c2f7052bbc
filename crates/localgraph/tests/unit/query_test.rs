//! Unit tests for the query engine

use localgraph::{
    execute_query, rel_types, GraphError, GraphStore, PropertyMap, Query, QueryEngine, Value,
};

fn code_graph() -> GraphStore {
    let mut store = GraphStore::in_memory().unwrap();
    let file = store
        .create_node(
            ["File"],
            PropertyMap::new().with("path", "src/app.js").with("projectId", "p1"),
        )
        .unwrap();

    for (i, name) in ["start", "stop", "restart"].iter().enumerate() {
        let func = store
            .create_node(
                ["Function", "Declaration"],
                PropertyMap::new()
                    .with("name", *name)
                    .with("projectId", "p1")
                    .with("line", (i as i64 + 1) * 10),
            )
            .unwrap();
        store
            .create_relationship(file.identity, func.identity, rel_types::CONTAINS, PropertyMap::new())
            .unwrap();
    }
    store
}

#[test]
fn test_liveness_query() {
    let store = GraphStore::in_memory().unwrap();
    let records = execute_query(&store, "RETURN 1 AS test").unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get_i64("test").unwrap(), 1);
}

#[test]
fn test_keywords_are_case_insensitive() {
    let store = code_graph();
    let records = execute_query(&store, "match (f:Function) return count(*) as n limit 1").unwrap();
    assert_eq!(records[0].get_i64("n").unwrap(), 3);
}

#[test]
fn test_projection_of_whole_node() {
    let store = code_graph();
    let records = execute_query(&store, "MATCH (f:File) RETURN f").unwrap();

    let file = records[0].get_node("f").unwrap();
    assert_eq!(file.properties.get_string("path"), Some("src/app.js"));
}

#[test]
fn test_relationship_projection() {
    let store = code_graph();
    let records = execute_query(
        &store,
        "MATCH (f:File)-[r:CONTAINS]->(fn {name: 'stop'}) RETURN r, fn.line AS line",
    )
    .unwrap();

    assert_eq!(records.len(), 1);
    match records[0].get_value("r").unwrap() {
        Value::Relationship(rel) => assert_eq!(rel.rel_type, rel_types::CONTAINS),
        other => panic!("expected relationship, got {other:?}"),
    }
    assert_eq!(records[0].get_i64("line").unwrap(), 20);
}

#[test]
fn test_parameterized_where() {
    let store = code_graph();
    let query = Query::new("MATCH (fn:Function) WHERE fn.projectId = $project AND fn.line = $line RETURN fn.name AS name")
        .param("project", "p1")
        .param("line", 30i64);

    let records = QueryEngine.execute(&store, &query).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get_str("name").unwrap(), "restart");
}

#[test]
fn test_limit_caps_rows_in_identity_order() {
    let store = code_graph();
    let records = execute_query(&store, "MATCH (fn:Function) RETURN fn.name AS name LIMIT 2").unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.get_str("name").unwrap()).collect();
    assert_eq!(names, vec!["start", "stop"]);
}

#[test]
fn test_unsupported_constructs_fail() {
    let store = code_graph();
    for text in [
        "MATCH (n) SET n.name = 'x' RETURN n",
        "MATCH (n) DETACH DELETE n",
        "OPTIONAL MATCH (n) RETURN n",
        "UNWIND [1, 2] AS x RETURN x",
        "MATCH (n) RETURN n SKIP 1",
        "MATCH (n) RETURN n.name + 'x'",
        "MATCH (a), (b) RETURN a",
        "MATCH (a)-[:CONTAINS*1..3]->(b) RETURN b",
        "CALL db.labels()",
    ] {
        let result = execute_query(&store, text);
        assert!(
            matches!(result, Err(GraphError::QuerySyntax { .. })),
            "{text} should be rejected, got {result:?}"
        );
    }
}

#[test]
fn test_query_from_str() {
    let query: Query = "RETURN 'ok' AS status".into();
    let store = GraphStore::in_memory().unwrap();
    let records = QueryEngine.execute(&store, &query).unwrap();
    assert_eq!(records[0].get_string("status").unwrap(), "ok");
}
