//! Target SQL dialects

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::ColumnType;

/// SQL dialect a MySQL script is translated into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetDialect {
    /// Microsoft SQL Server (T-SQL)
    #[default]
    SqlServer,
    /// DuckDB, used for staging and as the embedded destination
    DuckDb,
}

impl TargetDialect {
    /// Quote an identifier for this dialect
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            TargetDialect::SqlServer => format!("[{}]", name.replace(']', "]]")),
            TargetDialect::DuckDb => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Schema-qualified, quoted table reference
    pub fn qualified(&self, namespace: Option<&str>, table: &str) -> String {
        match namespace {
            Some(ns) => format!(
                "{}.{}",
                self.quote_identifier(ns),
                self.quote_identifier(table)
            ),
            None => self.quote_identifier(table),
        }
    }

    /// Whether multi-row `INSERT ... VALUES (..),(..)` must be split per row
    pub fn expands_multi_row_insert(&self) -> bool {
        matches!(self, TargetDialect::SqlServer)
    }

    /// Replacement for the MySQL `AUTO_INCREMENT` column marker
    pub fn identity_marker(&self) -> Option<&'static str> {
        match self {
            TargetDialect::SqlServer => Some("IDENTITY(1,1)"),
            TargetDialect::DuckDb => None,
        }
    }

    /// Bounded sample query over a table reference
    pub fn sample_query(&self, table_ref: &str, columns: &str, limit: usize) -> String {
        match self {
            TargetDialect::SqlServer => format!("SELECT TOP {limit} {columns} FROM {table_ref}"),
            TargetDialect::DuckDb => format!("SELECT {columns} FROM {table_ref} LIMIT {limit}"),
        }
    }

    /// Column type name used when writing relations
    pub fn column_type(&self, column_type: ColumnType) -> &'static str {
        match (self, column_type) {
            (TargetDialect::SqlServer, ColumnType::Boolean) => "BIT",
            (TargetDialect::SqlServer, ColumnType::Integer) => "BIGINT",
            (TargetDialect::SqlServer, ColumnType::Float) => "FLOAT",
            (TargetDialect::SqlServer, ColumnType::Text) => "NVARCHAR(MAX)",
            (TargetDialect::DuckDb, ColumnType::Boolean) => "BOOLEAN",
            (TargetDialect::DuckDb, ColumnType::Integer) => "BIGINT",
            (TargetDialect::DuckDb, ColumnType::Float) => "DOUBLE",
            (TargetDialect::DuckDb, ColumnType::Text) => "VARCHAR",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetDialect::SqlServer => "sqlserver",
            TargetDialect::DuckDb => "duckdb",
        }
    }
}

impl fmt::Display for TargetDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TargetDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlserver" | "mssql" | "tsql" => Ok(TargetDialect::SqlServer),
            "duckdb" => Ok(TargetDialect::DuckDb),
            _ => Err(format!(
                "Invalid target dialect: {}. Expected: sqlserver, duckdb",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_escapes() {
        assert_eq!(TargetDialect::SqlServer.quote_identifier("a]b"), "[a]]b]");
        assert_eq!(TargetDialect::DuckDb.quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_qualified() {
        assert_eq!(
            TargetDialect::DuckDb.qualified(Some("__stage_x"), "users"),
            "\"__stage_x\".\"users\""
        );
        assert_eq!(TargetDialect::SqlServer.qualified(None, "users"), "[users]");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("MSSQL".parse::<TargetDialect>(), Ok(TargetDialect::SqlServer));
        assert_eq!("duckdb".parse::<TargetDialect>(), Ok(TargetDialect::DuckDb));
        assert!("oracle".parse::<TargetDialect>().is_err());
    }
}
