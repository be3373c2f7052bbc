//! Population scenarios over a shared store

use localgraph::{
    execute_query, rel_types, GraphError, GraphPopulator, GraphStore, LocalSession, PropertyMap,
    SharedStore,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Program → FunctionDeclaration(main) → BlockStatement → ExpressionStatement → CallExpression(helper)
fn one_declaration_with_call() -> Value {
    json!({
        "type": "Program",
        "body": [{
            "type": "FunctionDeclaration",
            "id": {"type": "Identifier", "name": "main"},
            "params": [],
            "body": {
                "type": "BlockStatement",
                "body": [{
                    "type": "ExpressionStatement",
                    "expression": {
                        "type": "CallExpression",
                        "callee": {"type": "Identifier", "name": "helper"},
                        "arguments": []
                    }
                }]
            },
            "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 3, "column": 1}}
        }]
    })
}

fn populate(store: &SharedStore) -> usize {
    let mut session = LocalSession::new(Arc::clone(store));
    GraphPopulator::default()
        .populate(&mut session, &one_declaration_with_call(), "a.src", "p1")
        .unwrap()
        .node_count
}

fn counts(store: &SharedStore) -> (usize, usize) {
    let store = store.lock().unwrap();
    (store.node_count(), store.relationship_count())
}

#[test]
fn test_scenario_a_single_population() {
    let store: SharedStore = Arc::new(Mutex::new(GraphStore::in_memory().unwrap()));
    let node_count = populate(&store);

    assert_eq!(node_count, 5);

    let (nodes, rels) = counts(&store);
    assert!(nodes >= 2);
    assert!(rels >= 1);

    let store = store.lock().unwrap();
    assert_eq!(store.find_nodes("File", &PropertyMap::new()).len(), 1);
    let decl = store.find_nodes("Declaration", &PropertyMap::new().with("name", "main"));
    assert_eq!(decl.len(), 1);
    assert_eq!(decl[0].properties.get_int("line"), Some(1));

    let contains = store
        .relationships()
        .into_iter()
        .filter(|r| r.rel_type == rel_types::CONTAINS)
        .count();
    assert!(contains >= 1);

    let calls = execute_query(
        &store,
        "MATCH (f:Function {name: 'main'})-[:CALLS]->(c:Call) RETURN c.name AS callee",
    )
    .unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].get_str("callee").unwrap(), "helper");
}

#[test]
fn test_scenario_b_repopulation_is_idempotent() {
    let store: SharedStore = Arc::new(Mutex::new(GraphStore::in_memory().unwrap()));

    populate(&store);
    let first = counts(&store);
    let node_count = populate(&store);
    let second = counts(&store);

    assert_eq!(first, second);
    assert_eq!(node_count, 5);
}

#[test]
fn test_scenario_c_find_file_by_project() {
    let store: SharedStore = Arc::new(Mutex::new(GraphStore::in_memory().unwrap()));
    populate(&store);

    let store = store.lock().unwrap();
    let files = store.find_nodes("File", &PropertyMap::new().with("projectId", "p1"));
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].properties.get_string("path"), Some("a.src"));
    assert!(store
        .find_nodes("File", &PropertyMap::new().with("projectId", "p2"))
        .is_empty());
}

#[test]
fn test_scenario_d_bogus_start_id() {
    let store: SharedStore = Arc::new(Mutex::new(GraphStore::in_memory().unwrap()));
    populate(&store);

    let mut store = store.lock().unwrap();
    let before = store.snapshot();
    let target = store.find_nodes("File", &PropertyMap::new())[0].identity;

    let err = store
        .create_relationship(987_654, target, rel_types::CONTAINS, PropertyMap::new())
        .unwrap_err();

    assert!(matches!(err, GraphError::NodeNotFound { ref node_id } if node_id == "987654"));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_changed_file_adds_without_pruning() {
    let store: SharedStore = Arc::new(Mutex::new(GraphStore::in_memory().unwrap()));
    populate(&store);

    let renamed = json!({"type": "Program", "body": [
        {"type": "FunctionDeclaration", "id": {"type": "Identifier", "name": "entry"}}
    ]});
    let mut session = LocalSession::new(Arc::clone(&store));
    GraphPopulator::default()
        .populate(&mut session, &renamed, "a.src", "p1")
        .unwrap();

    let store = store.lock().unwrap();
    let names: Vec<&str> = store
        .find_nodes("Function", &PropertyMap::new())
        .into_iter()
        .filter_map(|n| n.properties.get_string("name"))
        .collect();
    assert_eq!(names, vec!["main", "entry"]);
    assert_eq!(store.find_nodes("File", &PropertyMap::new()).len(), 1);
}
