//! The in-process graph store.

use super::property::PropertyMap;
use super::types::{label_set, Node, NodeId, Relationship, RelationshipId};
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::storage::{FileBackend, MemoryBackend, Snapshot, SnapshotBackend};
use log::{debug, info, trace};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Counts reported back to callers (and serialized by the HTTP layer).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Total nodes
    pub node_count: usize,
    /// Total relationships
    pub relationship_count: usize,
    /// Node count per label
    pub labels: BTreeMap<String, usize>,
    /// Relationship count per type
    pub relationship_types: BTreeMap<String, usize>,
}

/// The embedded graph store.
///
/// `GraphStore` owns every node and relationship for the lifetime of the
/// process. The dataset is append-only: nodes may gain properties but nothing
/// is ever deleted. Nothing reaches disk until [`GraphStore::save_state`].
///
/// The store does no locking of its own. Callers that share it wrap it in a
/// mutex (see [`crate::session`]).
pub struct GraphStore {
    backend: Box<dyn SnapshotBackend>,
    // Node and relationship counters for monotonic ID generation
    node_counter: NodeId,
    relationship_counter: RelationshipId,
    nodes: HashMap<NodeId, Node>,
    relationships: HashMap<RelationshipId, Relationship>,
    // label -> nodes carrying it
    label_index: HashMap<String, BTreeSet<NodeId>>,
    // sorted label set -> nodes with exactly that set (find-or-create candidates)
    label_set_index: HashMap<Vec<String>, BTreeSet<NodeId>>,
    adjacency_out: HashMap<NodeId, BTreeSet<RelationshipId>>,
    adjacency_in: HashMap<NodeId, BTreeSet<RelationshipId>>,
}

impl GraphStore {
    /// Open a store over the given snapshot backend, loading whatever it holds.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] if the persisted snapshot cannot be read,
    /// cannot be parsed, or violates identity/endpoint invariants.
    pub fn with_backend(backend: Box<dyn SnapshotBackend>) -> Result<Self> {
        let mut store = Self {
            backend,
            node_counter: 0,
            relationship_counter: 0,
            nodes: HashMap::new(),
            relationships: HashMap::new(),
            label_index: HashMap::new(),
            label_set_index: HashMap::new(),
            adjacency_out: HashMap::new(),
            adjacency_in: HashMap::new(),
        };

        store.rebuild_from_backend()?;

        Ok(store)
    }

    /// Open a persistent store in `dir`, creating the directory if absent.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use localgraph::GraphStore;
    ///
    /// let store = GraphStore::open("./graph-data").unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] if the directory cannot be created or a
    /// persisted document is corrupt.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        info!("Opening graph store at {:?}", dir.as_ref());
        let backend = FileBackend::open(dir)?;
        Self::with_backend(Box::new(backend))
    }

    /// Open a persistent store as described by `config`.
    ///
    /// # Errors
    ///
    /// See [`GraphStore::open`].
    pub fn from_config(config: &GraphConfig) -> Result<Self> {
        info!("Opening graph store at {:?}", config.data_dir);
        let backend =
            FileBackend::open_with_names(&config.data_dir, &config.nodes_file, &config.relationships_file)?;
        Self::with_backend(Box::new(backend))
    }

    /// Create a store that never touches disk.
    ///
    /// **Warning**: `save_state` keeps the snapshot in memory only.
    pub fn in_memory() -> Result<Self> {
        Self::with_backend(Box::new(MemoryBackend::new()))
    }

    /// Find a node by exact label set and property subset, or create it.
    ///
    /// An existing node is reused iff its label set equals `labels` (order
    /// insensitive) and every key in `properties` equals the stored value.
    /// Stored keys not mentioned in `properties` are ignored. When several nodes
    /// match, the one with the lowest identity wins.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidOperation`] if a label is empty or a
    /// property is NaN or infinite.
    pub fn find_or_create_node<I, S>(&mut self, labels: I, properties: PropertyMap) -> Result<Node>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.find_or_create_node_with(labels, properties, PropertyMap::new())
    }

    /// Find-or-create matching on `match_properties`, merging `extra_properties`.
    ///
    /// On a hit, every key of `extra_properties` the node does not have yet is
    /// added; existing values are never overwritten. On a miss the new node gets
    /// the union of both maps (match keys win on conflict).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidOperation`] if a label is empty or a
    /// property is NaN or infinite.
    pub fn find_or_create_node_with<I, S>(
        &mut self,
        labels: I,
        match_properties: PropertyMap,
        extra_properties: PropertyMap,
    ) -> Result<Node>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = Self::validated_labels(labels)?;
        Self::check_properties(&match_properties)?;
        Self::check_properties(&extra_properties)?;

        if let Some(id) = self.find_match(&labels, &match_properties) {
            let node = self.get_node_mut(id)?;
            let added = node.properties.merge_missing(&extra_properties);
            if added > 0 {
                trace!("Merged {added} new properties into node {id}");
            }
            return Ok(node.clone());
        }

        let mut properties = extra_properties;
        for (key, value) in match_properties.iter() {
            properties.insert(key.clone(), value.clone());
        }
        Ok(self.insert_node(labels, properties))
    }

    /// Unconditionally create a node.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidOperation`] if a label is empty or a
    /// property is NaN or infinite.
    pub fn create_node<I, S>(&mut self, labels: I, properties: PropertyMap) -> Result<Node>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = Self::validated_labels(labels)?;
        Self::check_properties(&properties)?;
        Ok(self.insert_node(labels, properties))
    }

    /// Create a relationship between two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if either endpoint is absent; the
    /// relationship collection is left unchanged. Returns
    /// [`GraphError::InvalidOperation`] for an empty type or a non-finite
    /// property.
    pub fn create_relationship(
        &mut self,
        start_id: NodeId,
        end_id: NodeId,
        rel_type: &str,
        properties: PropertyMap,
    ) -> Result<Relationship> {
        debug!("Adding relationship: start={start_id}, end={end_id}, type={rel_type}");
        self.check_relationship(start_id, end_id, rel_type, &properties)?;
        Ok(self.insert_relationship(start_id, end_id, rel_type, properties))
    }

    /// Return a matching relationship or create one.
    ///
    /// A relationship matches when start, end and type are equal and every key
    /// in `properties` equals the stored value.
    ///
    /// # Errors
    ///
    /// Same as [`GraphStore::create_relationship`].
    pub fn merge_relationship(
        &mut self,
        start_id: NodeId,
        end_id: NodeId,
        rel_type: &str,
        properties: PropertyMap,
    ) -> Result<Relationship> {
        self.check_relationship(start_id, end_id, rel_type, &properties)?;

        let existing = self.adjacency_out.get(&start_id).and_then(|out| {
            out.iter()
                .filter_map(|id| self.relationships.get(id))
                .find(|rel| {
                    rel.end_node_id == end_id
                        && rel.rel_type == rel_type
                        && rel.properties.matches_subset(&properties)
                })
        });

        if let Some(rel) = existing {
            trace!("Reusing relationship {}", rel.identity);
            return Ok(rel.clone());
        }

        Ok(self.insert_relationship(start_id, end_id, rel_type, properties))
    }

    /// Get a node by ID.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NodeNotFound`] if the node doesn't exist.
    pub fn get_node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or_else(|| GraphError::NodeNotFound {
            node_id: id.to_string(),
        })
    }

    /// Get a relationship by ID.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::RelationshipNotFound`] if it doesn't exist.
    pub fn get_relationship(&self, id: RelationshipId) -> Result<&Relationship> {
        self.relationships
            .get(&id)
            .ok_or_else(|| GraphError::RelationshipNotFound {
                relationship_id: id.to_string(),
            })
    }

    /// All nodes carrying `label` whose properties satisfy every key of `filter`.
    ///
    /// Results are in identity order.
    pub fn find_nodes(&self, label: &str, filter: &PropertyMap) -> Vec<&Node> {
        self.label_index
            .get(label)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| node.properties.matches_subset(filter))
            .collect()
    }

    /// Every relationship with `node_id` as start or end, in identity order.
    ///
    /// An unknown node simply has no relationships.
    pub fn find_node_relationships(&self, node_id: NodeId) -> Vec<&Relationship> {
        let ids: BTreeSet<RelationshipId> = self
            .adjacency_out
            .get(&node_id)
            .into_iter()
            .chain(self.adjacency_in.get(&node_id))
            .flatten()
            .copied()
            .collect();

        ids.iter()
            .filter_map(|id| self.relationships.get(id))
            .collect()
    }

    /// Relationships starting at `node_id`, in identity order.
    pub fn outgoing(&self, node_id: NodeId) -> Vec<&Relationship> {
        self.adjacent(&self.adjacency_out, node_id)
    }

    /// Relationships ending at `node_id`, in identity order.
    pub fn incoming(&self, node_id: NodeId) -> Vec<&Relationship> {
        self.adjacent(&self.adjacency_in, node_id)
    }

    /// All nodes in identity order.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by_key(|n| n.identity);
        nodes
    }

    /// All relationships in identity order.
    pub fn relationships(&self) -> Vec<&Relationship> {
        let mut rels: Vec<&Relationship> = self.relationships.values().collect();
        rels.sort_by_key(|r| r.identity);
        rels
    }

    /// Get the total number of nodes in the store.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the total number of relationships in the store.
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Summary counts per label and relationship type.
    pub fn stats(&self) -> GraphStats {
        let labels = self
            .label_index
            .iter()
            .map(|(label, ids)| (label.clone(), ids.len()))
            .collect();

        let mut relationship_types = BTreeMap::new();
        for rel in self.relationships.values() {
            *relationship_types.entry(rel.rel_type.clone()).or_insert(0) += 1;
        }

        GraphStats {
            node_count: self.node_count(),
            relationship_count: self.relationship_count(),
            labels,
            relationship_types,
        }
    }

    /// Copy both collections out in identity order.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes().into_iter().cloned().collect(),
            relationships: self.relationships().into_iter().cloned().collect(),
        }
    }

    /// Persist both collections through the backend.
    ///
    /// This is the only operation that writes. Population never saves on its own.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] or [`GraphError::Serialization`] if the write
    /// fails. The in-memory graph is unaffected either way.
    pub fn save_state(&mut self) -> Result<()> {
        debug!("Saving graph state to {}", self.backend.describe());
        let snapshot = self.snapshot();
        self.backend.save(&snapshot)?;
        trace!("Save complete");
        Ok(())
    }

    // Private helper methods

    fn validated_labels<I, S>(labels: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = label_set(labels);
        if labels.iter().any(|l| l.trim().is_empty()) {
            return Err(GraphError::InvalidOperation {
                message: "node labels must be non-empty strings".to_string(),
            });
        }
        Ok(labels)
    }

    fn label_key(labels: &[String]) -> Vec<String> {
        let mut key = labels.to_vec();
        key.sort();
        key
    }

    fn find_match(&self, labels: &[String], properties: &PropertyMap) -> Option<NodeId> {
        self.label_set_index
            .get(&Self::label_key(labels))?
            .iter()
            .copied()
            .find(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|node| node.properties.matches_subset(properties))
            })
    }

    fn get_node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or_else(|| GraphError::NodeNotFound {
            node_id: id.to_string(),
        })
    }

    fn check_properties(properties: &PropertyMap) -> Result<()> {
        match properties.non_finite_key() {
            Some(key) => Err(GraphError::InvalidOperation {
                message: format!("property `{key}` must be a finite number"),
            }),
            None => Ok(()),
        }
    }

    fn check_relationship(
        &self,
        start_id: NodeId,
        end_id: NodeId,
        rel_type: &str,
        properties: &PropertyMap,
    ) -> Result<()> {
        if rel_type.trim().is_empty() {
            return Err(GraphError::InvalidOperation {
                message: "relationship type must be a non-empty string".to_string(),
            });
        }
        Self::check_properties(properties)?;
        self.get_node(start_id)?;
        self.get_node(end_id)?;
        Ok(())
    }

    fn adjacent(
        &self,
        index: &HashMap<NodeId, BTreeSet<RelationshipId>>,
        node_id: NodeId,
    ) -> Vec<&Relationship> {
        index
            .get(&node_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.relationships.get(id))
            .collect()
    }

    fn insert_node(&mut self, labels: Vec<String>, properties: PropertyMap) -> Node {
        let node_id = self.next_node_id();
        debug!("Adding node: id={node_id}, labels={labels:?}");
        let node = Node::new(node_id, labels, properties);
        self.index_node(&node);
        self.nodes.insert(node_id, node.clone());
        node
    }

    fn insert_relationship(
        &mut self,
        start_id: NodeId,
        end_id: NodeId,
        rel_type: &str,
        properties: PropertyMap,
    ) -> Relationship {
        let rel_id = self.next_relationship_id();
        let rel = Relationship::new(rel_id, rel_type, start_id, end_id, properties);
        self.index_relationship(&rel);
        self.relationships.insert(rel_id, rel.clone());
        rel
    }

    fn index_node(&mut self, node: &Node) {
        for label in &node.labels {
            self.label_index
                .entry(label.clone())
                .or_default()
                .insert(node.identity);
        }
        self.label_set_index
            .entry(Self::label_key(&node.labels))
            .or_default()
            .insert(node.identity);
    }

    fn index_relationship(&mut self, rel: &Relationship) {
        self.adjacency_out
            .entry(rel.start_node_id)
            .or_default()
            .insert(rel.identity);

        self.adjacency_in
            .entry(rel.end_node_id)
            .or_default()
            .insert(rel.identity);
    }

    fn next_node_id(&mut self) -> NodeId {
        let id = self.node_counter;
        self.node_counter += 1;
        id
    }

    fn next_relationship_id(&mut self) -> RelationshipId {
        let id = self.relationship_counter;
        self.relationship_counter += 1;
        id
    }

    fn corrupt(&self, message: String) -> GraphError {
        GraphError::io(
            PathBuf::from(self.backend.describe()),
            message,
            None::<std::io::Error>,
        )
    }

    fn rebuild_from_backend(&mut self) -> Result<()> {
        let Some(snapshot) = self.backend.load()? else {
            return Ok(());
        };

        for node in snapshot.nodes {
            if self.nodes.contains_key(&node.identity) {
                return Err(self.corrupt(format!("duplicate node identity {}", node.identity)));
            }
            self.node_counter = self.node_counter.max(node.identity + 1);
            self.index_node(&node);
            self.nodes.insert(node.identity, node);
        }

        for rel in snapshot.relationships {
            if self.relationships.contains_key(&rel.identity) {
                return Err(self.corrupt(format!(
                    "duplicate relationship identity {}",
                    rel.identity
                )));
            }
            for endpoint in [rel.start_node_id, rel.end_node_id] {
                if !self.nodes.contains_key(&endpoint) {
                    return Err(self.corrupt(format!(
                        "relationship {} references missing node {endpoint}",
                        rel.identity
                    )));
                }
            }
            self.relationship_counter = self.relationship_counter.max(rel.identity + 1);
            self.index_relationship(&rel);
            self.relationships.insert(rel.identity, rel);
        }

        info!(
            "Loaded {} nodes and {} relationships from {}",
            self.nodes.len(),
            self.relationships.len(),
            self.backend.describe()
        );
        Ok(())
    }
}
