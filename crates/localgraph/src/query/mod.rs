//! A minimal read-only query language over [`GraphStore`].
//!
//! Supports single-node and one-hop `MATCH` patterns with label and property
//! filters, equality `WHERE` conditions joined by `AND`, `RETURN` projections
//! with aliases, `count`, `id`, `labels`, `type` and `LIMIT`. Anything else is
//! rejected with [`GraphError::QuerySyntax`](crate::GraphError::QuerySyntax)
//! rather than silently returning nothing.
//!
//! # Example
//!
//! ```
//! use localgraph::{GraphStore, PropertyMap, Query, QueryEngine};
//!
//! let mut store = GraphStore::in_memory().unwrap();
//! store
//!     .find_or_create_node(["File"], PropertyMap::new().with("path", "src/app.js"))
//!     .unwrap();
//!
//! let query = Query::new("MATCH (f:File {path: $path}) RETURN id(f) AS id")
//!     .param("path", "src/app.js");
//! let records = QueryEngine.execute(&store, &query).unwrap();
//! assert_eq!(records.len(), 1);
//! ```

mod executor;
mod lexer;
mod parser;
mod record;

pub use executor::Params;
pub use record::{FromValue, Record, Value};

use crate::error::Result;
use crate::graph::{GraphStore, PropertyValue};
use log::debug;
use parser::Statement;

/// Query text plus named parameters, built like a driver's query object.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    params: Params,
}

impl Query {
    /// Create a query with no parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Params::new(),
        }
    }

    /// Builder pattern: bind `$name` to `value`.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bound parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::new(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Query::new(text)
    }
}

/// A parsed statement that can be run repeatedly with different parameters.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    statement: Statement,
}

impl PreparedQuery {
    /// Column names the query produces.
    pub fn columns(&self) -> Vec<&str> {
        self.statement.columns()
    }

    /// Execute against `store`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::QuerySyntax`](crate::GraphError::QuerySyntax) if a
    /// referenced parameter is missing from `params`.
    pub fn execute(&self, store: &GraphStore, params: &Params) -> Result<Vec<Record>> {
        executor::execute(store, &self.statement, params)
    }
}

/// Stateless entry point for parsing and running queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEngine;

impl QueryEngine {
    /// Parse query text once.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::QuerySyntax`](crate::GraphError::QuerySyntax)
    /// naming the first unsupported or malformed construct.
    pub fn prepare(&self, text: &str) -> Result<PreparedQuery> {
        Ok(PreparedQuery {
            statement: Statement::parse(text)?,
        })
    }

    /// Parse and execute `query` against `store`.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::prepare`] and [`PreparedQuery::execute`].
    pub fn execute(&self, store: &GraphStore, query: &Query) -> Result<Vec<Record>> {
        debug!("Executing query: {}", query.text());
        let records = self.prepare(query.text())?.execute(store, query.params())?;
        debug!("Query returned {} records", records.len());
        Ok(records)
    }
}

/// Execute parameterless query text against `store`.
///
/// ```
/// use localgraph::{execute_query, GraphStore};
///
/// let store = GraphStore::in_memory().unwrap();
/// let records = execute_query(&store, "RETURN 1 AS test").unwrap();
/// assert_eq!(records[0].get_i64("test").unwrap(), 1);
/// ```
///
/// # Errors
///
/// See [`QueryEngine::execute`].
pub fn execute_query(store: &GraphStore, text: &str) -> Result<Vec<Record>> {
    QueryEngine.execute(store, &Query::new(text))
}
