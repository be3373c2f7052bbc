//! Session facade and analysis pipeline over a real data directory

use localgraph::{
    AnalysisPipeline, GraphConfig, GraphError, GraphStore, Query, Result, SessionFacade,
    SyntaxTreeProducer,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

/// Treats each non-empty source line as a function declaration name.
struct LineProducer;

impl SyntaxTreeProducer for LineProducer {
    fn parse(&self, source: &str, path: &str) -> Result<Value> {
        if source.contains('{') {
            return Err(GraphError::MalformedTree {
                path: path.to_string(),
                reason: "unexpected token `{`".to_string(),
            });
        }
        let body: Vec<Value> = source
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .enumerate()
            .map(|(i, name)| {
                json!({
                    "type": "FunctionDeclaration",
                    "id": {"type": "Identifier", "name": name},
                    "loc": {"start": {"line": i + 1, "column": 0}}
                })
            })
            .collect();
        Ok(json!({"type": "Program", "body": body}))
    }
}

#[test]
fn test_pipeline_persists_and_reopens() {
    let temp_dir = TempDir::new().unwrap();
    let facade = SessionFacade::new(GraphConfig::at(temp_dir.path()));
    let pipeline = AnalysisPipeline::new(&facade);

    let report = pipeline.analyze_source(&LineProducer, "start\nstop\n", "src/app.js", "p1");
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.node_count, 3);

    let reopened = GraphStore::open(temp_dir.path()).unwrap();
    assert_eq!(reopened.node_count(), 3);
    assert_eq!(reopened.relationship_count(), 2);
}

#[test]
fn test_parse_error_is_not_built() {
    let temp_dir = TempDir::new().unwrap();
    let facade = SessionFacade::new(GraphConfig::at(temp_dir.path()));
    let report = AnalysisPipeline::new(&facade).analyze_source(&LineProducer, "fn {", "a.js", "p1");

    assert!(!report.built);
    assert!(!report.persisted);
    assert!(report.error.unwrap().contains("unexpected token"));
}

#[test]
fn test_sessions_share_one_store() {
    let temp_dir = TempDir::new().unwrap();
    let facade = SessionFacade::new(GraphConfig::at(temp_dir.path()));

    let report = AnalysisPipeline::new(&facade).analyze_source(&LineProducer, "main", "a.js", "p1");
    assert!(report.persisted);

    let mut session = facade.get_session().unwrap();
    let records = session
        .run(Query::new("MATCH (f:File)-[:CONTAINS]->(d:Declaration) RETURN d.name AS name"))
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get_str("name").unwrap(), "main");
}

#[test]
fn test_concurrent_analyses_of_one_project() {
    let temp_dir = TempDir::new().unwrap();
    let facade = SessionFacade::new(GraphConfig::at(temp_dir.path()));
    let pipeline = Arc::new(AnalysisPipeline::new(&facade));

    thread::scope(|scope| {
        for worker in 0..4 {
            let pipeline = Arc::clone(&pipeline);
            scope.spawn(move || {
                let path = format!("src/file_{worker}.js");
                let report = pipeline.analyze_source(&LineProducer, "alpha\nbeta", &path, "p1");
                assert!(report.is_success());
            });
        }
    });

    // Every worker's file plus two declarations each, persisted in one consistent snapshot
    let reopened = GraphStore::open(temp_dir.path()).unwrap();
    assert_eq!(reopened.node_count(), 12);
    assert_eq!(reopened.relationship_count(), 8);
}

#[test]
fn test_store_open_failure_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("nodes.json"), "not json").unwrap();

    let facade = SessionFacade::new(GraphConfig::at(temp_dir.path()));
    assert!(matches!(facade.get_session(), Err(GraphError::Io { .. })));

    let report = AnalysisPipeline::new(&facade).analyze_tree(&json!({"type": "Program"}), "a.js", "p1");
    assert!(!report.built);
}

#[test]
fn test_disabled_local_engine_without_connector() {
    let temp_dir = TempDir::new().unwrap();
    let config = GraphConfig {
        use_local_engine: false,
        ..GraphConfig::at(temp_dir.path())
    };
    let facade = SessionFacade::new(config);
    assert!(!facade.uses_local_engine());
    assert!(matches!(
        facade.get_session(),
        Err(GraphError::BackendUnavailable { .. })
    ));

    facade.set_use_local_engine(true);
    assert!(facade.get_session().is_ok());
}
