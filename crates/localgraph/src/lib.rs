//! # localgraph
//!
//! An embedded graph store that stands in for a remote graph database during
//! code analysis.
//!
//! ## Core Principles
//!
//! - **Backend Agnostic**: Sessions, queries and records look like a network
//!   driver's, so calling code does not care which backend answers
//! - **Idempotent Upserts**: Find-or-create nodes and merged relationships make
//!   re-analysis of an unchanged file a no-op
//! - **Explicit Persistence**: Nothing reaches disk until `save_state`
//! - **Fail Loudly**: Unsupported queries and corrupt documents are errors,
//!   never empty results
//!
//! ## Architecture
//!
//! ```text
//! Analysis pipeline (session → populate → save → close)
//!     ↓
//! GraphPopulator (syntax tree → nodes/relationships)
//!     ↓
//! SessionFacade / Session (driver-shaped access)
//!     ↓
//! QueryEngine (MATCH/WHERE/RETURN subset → Records)
//!     ↓
//! GraphStore (nodes, relationships, indices)
//!     ↓
//! Snapshot Backend (JSON files, memory)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use localgraph::{AnalysisPipeline, GraphConfig, Query, SessionFacade};
//! use serde_json::json;
//!
//! let facade = SessionFacade::new(GraphConfig::at("./graph-data"));
//! let pipeline = AnalysisPipeline::new(&facade);
//!
//! let tree = json!({"type": "Program", "body": [
//!     {"type": "FunctionDeclaration", "id": {"type": "Identifier", "name": "main"}}
//! ]});
//! let report = pipeline.analyze_tree(&tree, "src/main.js", "p1");
//! assert!(report.persisted);
//!
//! let mut session = facade.get_session().unwrap();
//! let records = session
//!     .run(Query::new("MATCH (f:Function {projectId: $p}) RETURN f.name AS name").param("p", "p1"))
//!     .unwrap();
//! assert_eq!(records[0].get_str("name").unwrap(), "main");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod graph;
pub mod populate;
pub mod query;
pub mod session;
pub mod storage;

// Re-export main types
pub use config::{GraphConfig, TraversalConfig};
pub use error::{GraphError, Result};
pub use graph::{
    rel_types, GraphStats, GraphStore, Node, NodeId, PropertyMap, PropertyValue, Relationship,
    RelationshipId,
};
pub use populate::pipeline::{AnalysisPipeline, AnalysisReport, SyntaxTreeProducer};
pub use populate::{GraphPopulator, PopulationSummary};
pub use query::{execute_query, FromValue, PreparedQuery, Query, QueryEngine, Record, Value};
pub use session::{GraphSession, LocalSession, RemoteConnector, Session, SessionFacade, SharedStore};
pub use storage::{FileBackend, MemoryBackend, Snapshot, SnapshotBackend};
