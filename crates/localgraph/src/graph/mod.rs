//! Core graph types and operations.
//!
//! This module defines the fundamental building blocks:
//! - [`Node`]: Labeled entities representing files and code constructs
//! - [`Relationship`]: Typed, directed edges between nodes
//! - [`GraphStore`]: The in-process store with find-or-create semantics

mod property;
mod store;
mod types;

pub(crate) use property::float_to_int;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphStats, GraphStore};
pub use types::{label_set, rel_types, Node, NodeId, Relationship, RelationshipId};
