//! Snapshot storage abstractions and implementations.
//!
//! This module defines the [`SnapshotBackend`] trait and provides implementations:
//! - [`FileBackend`]: Two JSON documents in a directory, replaced atomically
//! - [`MemoryBackend`]: In-memory snapshots for testing
//!
//! ## Design Philosophy
//!
//! - **Whole snapshots**: The store loads everything on open and writes everything on save
//! - **Explicit Operations**: Nothing is written until [`GraphStore::save_state`] is called
//! - **Fail Fast**: A document that cannot be parsed is an error, never an empty graph
//!
//! [`GraphStore::save_state`]: crate::graph::GraphStore::save_state

mod file;
mod memory;

pub use file::{FileBackend, NODES_FILE, RELATIONSHIPS_FILE};
pub use memory::MemoryBackend;

use crate::error::Result;
use crate::graph::{Node, Relationship};
use serde::{Deserialize, Serialize};

/// Both persisted collections, as written to and read from a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Node records
    pub nodes: Vec<Node>,
    /// Relationship records
    pub relationships: Vec<Relationship>,
}

impl Snapshot {
    /// Whether the snapshot holds no data.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

/// Trait defining the snapshot persistence interface.
///
/// Implementations must never leave a partially written document behind:
/// a reader either sees the previous snapshot or the new one.
pub trait SnapshotBackend: Send {
    /// Load the persisted snapshot.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] if a document exists but cannot be read or parsed.
    ///
    /// [`GraphError::Io`]: crate::error::GraphError::Io
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Persist a full snapshot, replacing the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] or [`GraphError::Serialization`] if the write fails.
    ///
    /// [`GraphError::Io`]: crate::error::GraphError::Io
    /// [`GraphError::Serialization`]: crate::error::GraphError::Serialization
    fn save(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Short description for log lines.
    fn describe(&self) -> String;
}
