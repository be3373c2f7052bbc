//! Flat-file snapshot backend.
//!
//! Persists the graph as two JSON documents in one directory:
//! `nodes.json` (array of node records) and `relationships.json` (array of
//! relationship records). Each document is written to a unique temporary file,
//! synced, and renamed over the target, so a crash mid-write leaves the previous
//! document intact.

use super::{Snapshot, SnapshotBackend};
use crate::error::{GraphError, Result};
use crate::graph::{Node, Relationship};
use log::{debug, info, trace};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default file name of the node document.
pub const NODES_FILE: &str = "nodes.json";

/// Default file name of the relationship document.
pub const RELATIONSHIPS_FILE: &str = "relationships.json";

/// Directory-backed snapshot storage.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    nodes_path: PathBuf,
    relationships_path: PathBuf,
}

impl FileBackend {
    /// Open (creating if absent) a snapshot directory with the default file names.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with_names(dir, NODES_FILE, RELATIONSHIPS_FILE)
    }

    /// Open a snapshot directory with custom document names.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] if the directory cannot be created.
    pub fn open_with_names<P: AsRef<Path>>(
        dir: P,
        nodes_file: &str,
        relationships_file: &str,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| GraphError::io(&dir, "Failed to create graph directory", Some(e)))?;
        info!("Opened graph directory {dir:?}");

        Ok(Self {
            nodes_path: dir.join(nodes_file),
            relationships_path: dir.join(relationships_file),
            dir,
        })
    }

    /// Directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the node document.
    pub fn nodes_path(&self) -> &Path {
        &self.nodes_path
    }

    /// Path of the relationship document.
    pub fn relationships_path(&self) -> &Path {
        &self.relationships_path
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    if !path.exists() {
        trace!("No document at {path:?}");
        return Ok(None);
    }

    let bytes =
        fs::read(path).map_err(|e| GraphError::io(path, "Failed to read graph document", Some(e)))?;
    let records = serde_json::from_slice(&bytes).map_err(|e| {
        GraphError::io(path, "Graph document is corrupt and cannot be parsed", Some(e))
    })?;
    Ok(Some(records))
}

/// Write `records` to `target` through a uniquely named temp file and a rename.
fn write_document<T: Serialize>(target: &Path, records: &[T]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(records)
        .map_err(|e| GraphError::serialization("Failed to serialize graph document", Some(e)))?;

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let tmp = target.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, target)
    })();

    if let Err(e) = written {
        // Leave the previous document untouched and clean up our temp file
        let _ = fs::remove_file(&tmp);
        return Err(GraphError::io(target, "Failed to write graph document", Some(e)));
    }

    // The rename itself is only durable once the directory entry is synced
    if let Some(dir) = target
        .parent()
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
    {
        sync_dir(dir).map_err(|e| GraphError::io(dir, "Failed to sync graph directory", Some(e)))?;
    }

    trace!("Wrote {} bytes to {target:?}", bytes.len());
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

// Directories cannot be opened as files on this platform
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

impl SnapshotBackend for FileBackend {
    fn load(&self) -> Result<Option<Snapshot>> {
        let nodes: Option<Vec<Node>> = read_document(&self.nodes_path)?;
        let relationships: Option<Vec<Relationship>> = read_document(&self.relationships_path)?;

        if nodes.is_none() && relationships.is_none() {
            debug!("No persisted graph in {:?}, starting empty", self.dir);
            return Ok(None);
        }

        Ok(Some(Snapshot {
            nodes: nodes.unwrap_or_default(),
            relationships: relationships.unwrap_or_default(),
        }))
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        // Nodes first: old relationships only reference nodes that still exist
        write_document(&self.nodes_path, &snapshot.nodes)?;
        write_document(&self.relationships_path, &snapshot.relationships)?;
        debug!(
            "Saved {} nodes and {} relationships to {:?}",
            snapshot.nodes.len(),
            snapshot.relationships.len(),
            self.dir
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{:?}", self.dir)
    }
}
