//! Configuration for the graph engine and the tree populator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the snapshot directory.
pub const ENV_DATA_DIR: &str = "LOCALGRAPH_DATA_DIR";

/// Environment variable selecting the local engine (`true`/`false`, `1`/`0`).
pub const ENV_USE_LOCAL: &str = "LOCALGRAPH_USE_LOCAL";

/// Child slots the populator descends into by default.
pub const DEFAULT_CHILD_SLOTS: [&str; 10] = [
    "body",
    "expression",
    "declarations",
    "params",
    "arguments",
    "properties",
    "elements",
    "block",
    "consequent",
    "alternate",
];

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Directory holding the persisted documents
    pub data_dir: PathBuf,

    /// Serve sessions from the embedded engine instead of a remote database
    pub use_local_engine: bool,

    /// File name of the node document inside `data_dir`
    pub nodes_file: String,

    /// File name of the relationship document inside `data_dir`
    pub relationships_file: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./graph-data"),
            use_local_engine: true,
            nodes_file: crate::storage::NODES_FILE.to_string(),
            relationships_file: crate::storage::RELATIONSHIPS_FILE.to_string(),
        }
    }
}

impl GraphConfig {
    /// Config rooted at `data_dir`, everything else default.
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `LOCALGRAPH_DATA_DIR` and `LOCALGRAPH_USE_LOCAL`.
    ///
    /// Unparseable toggle values fall back to the default (local engine on).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(ENV_USE_LOCAL) {
            match parse_bool(&raw) {
                Some(flag) => config.use_local_engine = flag,
                None => log::warn!("Ignoring invalid {ENV_USE_LOCAL} value {raw:?}"),
            }
        }

        config
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Which tree slots the populator recurses into.
///
/// Starts from [`DEFAULT_CHILD_SLOTS`]; parsers that put children elsewhere can
/// register extra slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Slot names, visited in this order
    pub child_slots: Vec<String>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            child_slots: DEFAULT_CHILD_SLOTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TraversalConfig {
    /// Register an additional child slot (no-op if already present).
    pub fn with_child_slot(mut self, slot: impl Into<String>) -> Self {
        let slot = slot.into();
        if !self.child_slots.contains(&slot) {
            self.child_slots.push(slot);
        }
        self
    }

    /// Default slots plus `init`, `value` and `argument`, which reach variable
    /// initializers, method bodies and returned expressions.
    pub fn extended() -> Self {
        Self::default()
            .with_child_slot("init")
            .with_child_slot("value")
            .with_child_slot("argument")
    }
}
