//! Analyze-then-save entry point.
//!
//! The pipeline is where storage failures stop propagating: it turns the
//! outcome of one file's analysis into an [`AnalysisReport`] that tells
//! "the graph was built" apart from "the graph was durably saved".

use super::{GraphPopulator, PopulationSummary};
use crate::error::{GraphError, Result};
use crate::session::SessionFacade;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

/// Produces a syntax tree from source text.
///
/// The tree must be ESTree-shaped JSON (objects with a string `type`, children
/// under the slots listed in [`TraversalConfig`](crate::TraversalConfig)).
pub trait SyntaxTreeProducer {
    /// Parse `source`, read from `path`.
    fn parse(&self, source: &str, path: &str) -> Result<Value>;
}

/// Outcome of analyzing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    /// Project the file belongs to
    pub project_id: String,
    /// File path as given
    pub path: String,
    /// Tree nodes visited (0 when the build failed)
    pub node_count: usize,
    /// The graph was populated in memory
    pub built: bool,
    /// The populated graph was saved
    pub persisted: bool,
    /// Client-safe error message, if any step failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisReport {
    fn new(path: &str, project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            path: path.to_string(),
            node_count: 0,
            built: false,
            persisted: false,
            error: None,
        }
    }

    fn build_failed(mut self, err: &GraphError) -> Self {
        warn!("Analysis of {} failed: {err}", self.path);
        self.error = Some(err.to_string());
        self
    }

    /// Both steps succeeded.
    pub fn is_success(&self) -> bool {
        self.built && self.persisted
    }
}

/// Runs session → populate → save → close for one file at a time per project.
pub struct AnalysisPipeline<'a> {
    facade: &'a SessionFacade,
    populator: GraphPopulator,
}

impl<'a> AnalysisPipeline<'a> {
    /// Pipeline over `facade` with the default populator.
    pub fn new(facade: &'a SessionFacade) -> Self {
        Self::with_populator(facade, GraphPopulator::default())
    }

    /// Pipeline over `facade` with a custom populator.
    pub fn with_populator(facade: &'a SessionFacade, populator: GraphPopulator) -> Self {
        Self {
            facade,
            populator,
        }
    }

    /// Parse `source` with `producer`, then analyze the resulting tree.
    pub fn analyze_source(
        &self,
        producer: &dyn SyntaxTreeProducer,
        source: &str,
        path: &str,
        project_id: &str,
    ) -> AnalysisReport {
        match producer.parse(source, path) {
            Ok(tree) => self.analyze_tree(&tree, path, project_id),
            Err(err) => AnalysisReport::new(path, project_id).build_failed(&err),
        }
    }

    /// Populate the graph from `tree` and save it.
    ///
    /// Population and save for one project are serialized across every
    /// pipeline built over the same facade; different projects only contend
    /// on the store lock itself.
    pub fn analyze_tree(&self, tree: &Value, path: &str, project_id: &str) -> AnalysisReport {
        let lock = self.facade.project_lock(project_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let report = AnalysisReport::new(path, project_id);

        let mut session = match self.facade.get_session() {
            Ok(session) => session,
            Err(err) => return report.build_failed(&err),
        };

        let summary: PopulationSummary =
            match self.populator.populate(&mut *session, tree, path, project_id) {
                Ok(summary) => summary,
                Err(err) => return report.build_failed(&err),
            };

        let mut report = AnalysisReport {
            node_count: summary.node_count,
            built: true,
            ..report
        };

        match session.save_state() {
            Ok(()) => {
                report.persisted = true;
                info!(
                    "Analyzed {path} for project {project_id}: {} tree nodes, {} entities",
                    summary.node_count, summary.entities
                );
            }
            Err(err) => {
                if err.is_storage() {
                    warn!("Graph for {path} built but not saved: {err}");
                } else {
                    warn!("Save after analyzing {path} failed: {err}");
                }
                report.error = Some(err.to_string());
            }
        }

        self.facade.close(session);
        report
    }
}
