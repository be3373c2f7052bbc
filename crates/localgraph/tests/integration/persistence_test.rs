//! Persistence integration tests
//!
//! Tests that a saved graph is reproduced by a fresh open, and that damaged
//! documents are reported instead of silently discarded.

use localgraph::{
    rel_types, FileBackend, GraphConfig, GraphError, GraphStore, PropertyMap, PropertyValue,
};
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

fn build(store: &mut GraphStore) {
    let file = store
        .find_or_create_node(["File"], PropertyMap::new().with("path", "a.src").with("projectId", "p1"))
        .unwrap();
    for i in 0..20 {
        let func = store
            .find_or_create_node_with(
                ["Function", "Declaration"],
                PropertyMap::new().with("name", format!("fn_{i}")).with("projectId", "p1"),
                PropertyMap::new()
                    .with("line", i as i64)
                    .with("weight", 0.5 * i as f64)
                    .with("exported", i % 2 == 0)
                    .with("doc", PropertyValue::Null),
            )
            .unwrap();
        store
            .create_relationship(file.identity, func.identity, rel_types::CONTAINS, PropertyMap::new())
            .unwrap();
    }
}

#[test]
fn test_round_trip_reproduces_graph() {
    let temp_dir = TempDir::new().unwrap();

    let before = {
        let mut store = GraphStore::open(temp_dir.path()).unwrap();
        build(&mut store);
        store.save_state().unwrap();
        store.snapshot()
    };

    let store = GraphStore::open(temp_dir.path()).unwrap();
    let after = store.snapshot();

    let ids = |s: &localgraph::Snapshot| s.nodes.iter().map(|n| n.identity).collect::<BTreeSet<_>>();
    assert_eq!(ids(&before), ids(&after));
    assert_eq!(before, after);
    assert_eq!(store.relationship_count(), 20);

    // Integers stay integers after a round trip
    let func = store.find_nodes("Function", &PropertyMap::new().with("name", "fn_3"))[0];
    assert_eq!(func.properties.get("line"), Some(&PropertyValue::Int(3)));
    assert_eq!(func.properties.get("weight"), Some(&PropertyValue::Float(1.5)));
}

#[test]
fn test_nothing_written_before_save() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = GraphStore::open(temp_dir.path()).unwrap();
        build(&mut store);
    }

    let store = GraphStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.node_count(), 0);
    assert!(!temp_dir.path().join("nodes.json").exists());
}

#[test]
fn test_document_layout() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = GraphStore::open(temp_dir.path()).unwrap();
    build(&mut store);
    store.save_state().unwrap();

    let nodes: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp_dir.path().join("nodes.json")).unwrap()).unwrap();
    let rels: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp_dir.path().join("relationships.json")).unwrap())
            .unwrap();

    assert_eq!(nodes[0]["labels"], serde_json::json!(["File"]));
    assert_eq!(nodes[0]["properties"]["path"], "a.src");
    assert!(nodes[0]["identity"].is_u64());

    let rel = &rels[0];
    assert_eq!(rel["type"], "CONTAINS");
    assert!(rel["startNodeId"].is_u64());
    assert!(rel["endNodeId"].is_u64());

    // No temporary files left behind
    let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 2);
}

#[test]
fn test_corrupt_document_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("nodes.json"), "[{\"identity\": 0, \"labels\": [").unwrap();

    let result = GraphStore::open(temp_dir.path());
    assert!(matches!(result, Err(GraphError::Io { .. })));
}

#[test]
fn test_dangling_endpoint_in_document_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("nodes.json"),
        r#"[{"identity": 0, "labels": ["File"], "properties": {}}]"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("relationships.json"),
        r#"[{"identity": 0, "type": "CONTAINS", "startNodeId": 0, "endNodeId": 9, "properties": {}}]"#,
    )
    .unwrap();

    assert!(matches!(
        GraphStore::open(temp_dir.path()),
        Err(GraphError::Io { .. })
    ));
}

#[test]
fn test_identities_resume_after_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let max_before = {
        let mut store = GraphStore::open(temp_dir.path()).unwrap();
        build(&mut store);
        store.save_state().unwrap();
        store.nodes().iter().map(|n| n.identity).max().unwrap()
    };

    let mut store = GraphStore::open(temp_dir.path()).unwrap();
    let fresh = store.create_node(["Call"], PropertyMap::new()).unwrap();
    assert!(fresh.identity > max_before);
}

#[test]
fn test_custom_document_names() {
    let temp_dir = TempDir::new().unwrap();
    let config = GraphConfig {
        nodes_file: "n.json".to_string(),
        relationships_file: "r.json".to_string(),
        ..GraphConfig::at(temp_dir.path().join("graph"))
    };

    let mut store = GraphStore::from_config(&config).unwrap();
    build(&mut store);
    store.save_state().unwrap();

    let backend = FileBackend::open_with_names(&config.data_dir, "n.json", "r.json").unwrap();
    assert!(backend.nodes_path().exists());
    assert!(backend.relationships_path().exists());
    assert_eq!(GraphStore::from_config(&config).unwrap().node_count(), 21);
}

#[test]
fn test_float_extremes_survive_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = GraphStore::open(temp_dir.path()).unwrap();
        store
            .create_node(
                ["Metric"],
                PropertyMap::new().with("big", f64::MAX).with("tiny", f64::MIN_POSITIVE),
            )
            .unwrap();
        // Non-finite values never get in, so nothing can come back as null
        assert!(store
            .create_node(["Metric"], PropertyMap::new().with("w", f64::INFINITY))
            .is_err());
        store.save_state().unwrap();
    }

    let store = GraphStore::open(temp_dir.path()).unwrap();
    let metric = store.find_nodes("Metric", &PropertyMap::new())[0];
    assert_eq!(metric.properties.get("big"), Some(&PropertyValue::Float(f64::MAX)));
    assert_eq!(metric.properties.get_float("tiny"), Some(f64::MIN_POSITIVE));
    assert_eq!(store.node_count(), 1);
}
