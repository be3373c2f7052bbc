//! Core graph types: nodes, relationships, IDs.

use super::property::{PropertyMap, PropertyValue};
use serde::{Deserialize, Serialize};

/// Unique identifier for a node (monotonic counter).
pub type NodeId = u64;

/// Unique identifier for a relationship (monotonic counter).
pub type RelationshipId = u64;

/// Relationship types emitted by the populator.
pub mod rel_types {
    /// Lexical parent contains child entity (file contains function)
    pub const CONTAINS: &str = "CONTAINS";
    /// Enclosing entity calls a callee
    pub const CALLS: &str = "CALLS";
    /// File imports a module
    pub const IMPORTS: &str = "IMPORTS";
}

/// Normalize a label list into an ordered set.
///
/// Duplicates are dropped keeping the first occurrence, so the primary label
/// stays first.
pub fn label_set<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let label = label.into();
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

/// A node in the graph.
///
/// Nodes represent files and code constructs. The first label is the primary
/// type for display; matching always uses the whole label set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier (assigned by the store)
    pub identity: NodeId,
    /// Ordered set of type tags
    pub labels: Vec<String>,
    /// Scalar metadata
    #[serde(default)]
    pub properties: PropertyMap,
}

impl Node {
    /// Create a new node (ID is assigned by the store).
    pub fn new(identity: NodeId, labels: Vec<String>, properties: PropertyMap) -> Self {
        Self {
            identity,
            labels,
            properties,
        }
    }

    /// Primary label, if any.
    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// Whether the node carries the given label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Whether the node's label set equals `labels`, ignoring order.
    pub fn has_label_set(&self, labels: &[String]) -> bool {
        self.labels.len() == labels.len() && labels.iter().all(|l| self.has_label(l))
    }

    /// Get a property value.
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// A directed, typed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Unique identifier (assigned by the store)
    pub identity: RelationshipId,
    /// Relationship verb, e.g. `CONTAINS`
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Start node ID
    pub start_node_id: NodeId,
    /// End node ID
    pub end_node_id: NodeId,
    /// Optional metadata
    #[serde(default)]
    pub properties: PropertyMap,
}

impl Relationship {
    /// Create a new relationship (ID is assigned by the store).
    pub fn new(
        identity: RelationshipId,
        rel_type: impl Into<String>,
        start_node_id: NodeId,
        end_node_id: NodeId,
        properties: PropertyMap,
    ) -> Self {
        Self {
            identity,
            rel_type: rel_type.into(),
            start_node_id,
            end_node_id,
            properties,
        }
    }

    /// Get a property value.
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}
