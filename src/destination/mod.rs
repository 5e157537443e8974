//! Destination stores that scripts run against and relations are written to

#[cfg(feature = "duckdb-backend")]
pub mod duckdb_backend;

use serde::{Deserialize, Serialize};

use crate::convert::TargetDialect;
use crate::error::DestinationError;
use crate::models::Relation;

#[cfg(feature = "duckdb-backend")]
pub use duckdb_backend::DuckDbDestination;

/// How a relation is written to an existing table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Drop and recreate the table
    #[default]
    Replace,
    /// Create the table if missing, then insert
    Append,
}

impl std::str::FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(WriteMode::Replace),
            "append" => Ok(WriteMode::Append),
            _ => Err(format!("Invalid write mode: {}. Expected: replace, append", s)),
        }
    }
}

/// A relational store: runs statements, hosts staging namespaces and
/// accepts bulk writes.
///
/// Table and namespace names are passed unquoted; implementations quote them.
pub trait Destination {
    /// Dialect scripts must be translated into before execution
    fn dialect(&self) -> TargetDialect;

    /// Execute one statement
    fn execute(&self, sql: &str) -> Result<(), DestinationError>;

    /// Run a query and materialize its result
    fn query(&self, sql: &str) -> Result<Relation, DestinationError>;

    /// Create an isolated namespace (schema)
    fn create_namespace(&self, name: &str) -> Result<(), DestinationError>;

    /// Drop a namespace and everything in it; dropping a missing namespace succeeds
    fn drop_namespace(&self, name: &str) -> Result<(), DestinationError>;

    fn namespace_exists(&self, name: &str) -> Result<bool, DestinationError>;

    /// Tables in a namespace (default namespace when `None`), sorted by name
    fn list_tables(&self, namespace: Option<&str>) -> Result<Vec<String>, DestinationError>;

    /// Case-insensitive table lookup
    fn table_exists(&self, namespace: Option<&str>, table: &str) -> Result<bool, DestinationError>;

    /// Write a relation into a table of the default namespace, returning the
    /// number of rows written
    fn write_relation(
        &self,
        table: &str,
        relation: &Relation,
        mode: WriteMode,
    ) -> Result<usize, DestinationError>;
}
