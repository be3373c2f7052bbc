//! In-memory snapshot backend for testing.
//!
//! **Note**: This backend is for testing only. Snapshots live as long as the
//! backend (or a clone of it) does.

use super::{Snapshot, SnapshotBackend};
use crate::error::{GraphError, Result};
use std::sync::{Arc, Mutex};

/// In-memory snapshot backend.
///
/// Clones share the same slot, so a test can keep a handle, drop the store,
/// and open a new store over the "persisted" snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slot: Arc<Mutex<Option<Snapshot>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryBackend {
    /// Backend with nothing saved yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that already holds a snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot))),
            saves: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of completed saves. Useful for assertions.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    /// The last saved snapshot, if any.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }
}

fn poisoned() -> GraphError {
    GraphError::Storage {
        message: "memory backend lock poisoned".to_string(),
    }
}

impl SnapshotBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.slot.lock().map_err(|_| poisoned())?.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        *self.slot.lock().map_err(|_| poisoned())? = Some(snapshot.clone());
        *self.saves.lock().map_err(|_| poisoned())? += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
