//! Syntax tree to graph population.
//!
//! [`GraphPopulator`] walks one file's syntax tree depth-first and emits
//! project-scoped nodes and relationships through a [`GraphSession`]:
//!
//! - one `File` node per `(path, projectId)`
//! - `[<Kind>, Declaration]` nodes for named functions, classes, methods and
//!   variables, contained by their lexical parent
//! - `Module` nodes for imports, linked from the file with `IMPORTS`
//! - `Call` nodes for calls, linked from the enclosing entity with `CALLS`
//!
//! Every write goes through find-or-create and relationship merge, so
//! re-populating an unchanged file leaves the graph as it was. Nodes from an
//! earlier version of a changed file are not pruned. The populator never
//! saves; see [`pipeline::AnalysisPipeline`] for the full analyze-then-save
//! flow.

pub mod pipeline;
mod syntax;

pub use syntax::{EntityKind, TreeNode};

use crate::config::TraversalConfig;
use crate::error::{GraphError, Result};
use crate::graph::{rel_types, NodeId, PropertyMap};
use crate::session::GraphSession;
use log::{debug, trace, warn};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Counts from one populate run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PopulationSummary {
    /// Tree nodes visited, including the root
    pub node_count: usize,
    /// Graph entities (declarations, imports, calls) found or created
    pub entities: usize,
    /// Malformed subtrees that were skipped
    pub skipped: usize,
}

/// Walks syntax trees into the graph.
#[derive(Debug, Clone, Default)]
pub struct GraphPopulator {
    traversal: TraversalConfig,
}

/// Per-run state.
struct Walk<'a> {
    path: &'a str,
    project_id: &'a str,
    file_id: NodeId,
    summary: PopulationSummary,
}

impl Walk<'_> {
    fn scope(&self, name: &str) -> PropertyMap {
        PropertyMap::new()
            .with("name", name)
            .with("path", self.path)
            .with("projectId", self.project_id)
    }
}

fn line_props(line: Option<i64>) -> PropertyMap {
    let mut props = PropertyMap::new();
    if let Some(line) = line {
        props.insert("line", line);
    }
    props
}

impl GraphPopulator {
    /// Populator recursing into the given child slots.
    pub fn new(traversal: TraversalConfig) -> Self {
        Self { traversal }
    }

    /// The child slots in use.
    pub fn traversal(&self) -> &TraversalConfig {
        &self.traversal
    }

    /// Populate the graph from one file's tree.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MalformedTree`] if `tree` is not an object. Store
    /// errors (e.g. [`GraphError::NodeNotFound`]) abort the run; nodes written
    /// before the failure stay in the store.
    pub fn populate(
        &self,
        session: &mut dyn GraphSession,
        tree: &Value,
        path: &str,
        project_id: &str,
    ) -> Result<PopulationSummary> {
        if !tree.is_object() {
            return Err(GraphError::MalformedTree {
                path: path.to_string(),
                reason: "tree root is not an object".to_string(),
            });
        }

        let file_name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path);
        let file = session.find_or_create_node_with(
            &["File"],
            PropertyMap::new()
                .with("path", path)
                .with("projectId", project_id),
            PropertyMap::new().with("name", file_name),
        )?;

        let mut walk = Walk {
            path,
            project_id,
            file_id: file.identity,
            summary: PopulationSummary::default(),
        };
        self.visit(session, &mut walk, tree, file.identity)?;

        debug!(
            "Populated {path} ({project_id}): {} tree nodes, {} entities, {} skipped",
            walk.summary.node_count, walk.summary.entities, walk.summary.skipped
        );
        Ok(walk.summary)
    }

    fn visit(
        &self,
        session: &mut dyn GraphSession,
        walk: &mut Walk<'_>,
        node: &Value,
        parent: NodeId,
    ) -> Result<()> {
        let mut scope = parent;

        match TreeNode::classify(node) {
            TreeNode::Skip { reason } => {
                let err = GraphError::MalformedTree {
                    path: walk.path.to_string(),
                    reason,
                };
                warn!("Skipping subtree: {err}");
                walk.summary.skipped += 1;
                return Ok(());
            }
            TreeNode::PassThrough { node_type } => {
                trace!("Passing through {node_type}");
            }
            TreeNode::Entity { kind, name, line } => {
                let entity =
                    session.find_or_create_node_with(&kind.labels(), walk.scope(name), line_props(line))?;
                session.merge_relationship(parent, entity.identity, rel_types::CONTAINS, PropertyMap::new())?;
                walk.summary.entities += 1;
                scope = entity.identity;
            }
            TreeNode::Import { source, line } => {
                let module =
                    session.find_or_create_node_with(&["Module"], walk.scope(source), line_props(line))?;
                session.merge_relationship(walk.file_id, module.identity, rel_types::IMPORTS, PropertyMap::new())?;
                walk.summary.entities += 1;
            }
            TreeNode::Call { callee, line } => {
                let call = session.find_or_create_node_with(&["Call"], walk.scope(&callee), line_props(line))?;
                session.merge_relationship(parent, call.identity, rel_types::CALLS, PropertyMap::new())?;
                walk.summary.entities += 1;
            }
        }

        walk.summary.node_count += 1;

        for slot in &self.traversal.child_slots {
            match node.get(slot) {
                Some(Value::Array(children)) => {
                    for child in children.iter().filter(|c| c.is_object()) {
                        self.visit(session, walk, child, scope)?;
                    }
                }
                Some(child @ Value::Object(_)) => self.visit(session, walk, child, scope)?,
                _ => {}
            }
        }

        Ok(())
    }
}
