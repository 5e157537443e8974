//! Throwaway namespaces for executing and previewing SQL scripts
//!
//! A [`StagingNamespace`] is a uniquely named schema in the destination. It is
//! dropped when the guard goes out of scope, on success, error return or
//! unwinding alike.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::Cell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::convert::TargetDialect;
use crate::convert::lexer::{Flavor, replace_in_code};
use crate::destination::Destination;
use crate::error::IngestError;
use crate::execute::{ExecutionReport, ScriptExecutor, TABLE_REF, unqualified_name};
use crate::models::Relation;

/// Default prefix of staging namespace names
pub const STAGING_PREFIX: &str = "__stage_";

/// Lifecycle position of a staging namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceState {
    Created,
    Populated,
    Queried,
    Dropped,
}

/// Scope guard over a staging schema
pub struct StagingNamespace<'d, D: Destination + ?Sized> {
    destination: &'d D,
    name: String,
    state: Cell<NamespaceState>,
}

impl<'d, D: Destination + ?Sized> StagingNamespace<'d, D> {
    /// Create a namespace named `__stage_<8 hex>`
    pub fn create(destination: &'d D) -> Result<Self, IngestError> {
        Self::create_with_prefix(destination, STAGING_PREFIX)
    }

    /// Create a namespace with a custom name prefix
    pub fn create_with_prefix(destination: &'d D, prefix: &str) -> Result<Self, IngestError> {
        let token = Uuid::new_v4().simple().to_string();
        let name = format!("{}{}", prefix, &token[..8]);
        destination.create_namespace(&name)?;
        info!(namespace = %name, "Staging namespace created");
        Ok(Self {
            destination,
            name,
            state: Cell::new(NamespaceState::Created),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> NamespaceState {
        self.state.get()
    }

    fn dialect(&self) -> TargetDialect {
        self.destination.dialect()
    }

    /// Quoted, namespace-qualified reference to a table
    pub fn qualify(&self, table: &str) -> String {
        self.dialect().qualified(Some(&self.name), table)
    }

    /// Run a script (already in the destination's dialect) inside the namespace
    pub fn populate(&self, script: &str) -> ExecutionReport {
        let scoped = qualify_script(script, &self.name, self.dialect());
        let report = ScriptExecutor::new(self.destination).execute(&scoped);
        self.state.set(NamespaceState::Populated);
        report
    }

    /// Tables present in the namespace
    pub fn tables(&self) -> Result<Vec<String>, IngestError> {
        Ok(self.destination.list_tables(Some(&self.name))?)
    }

    /// Actual name of a table, matched case-insensitively
    pub fn resolve(&self, table: &str) -> Result<Option<String>, IngestError> {
        if !self.destination.table_exists(Some(&self.name), table)? {
            return Ok(None);
        }
        Ok(self
            .tables()?
            .into_iter()
            .find(|t| t.eq_ignore_ascii_case(table)))
    }

    /// Up to `limit` rows of a table; `None` when the table does not exist
    pub fn sample(&self, table: &str, limit: usize) -> Result<Option<Relation>, IngestError> {
        let Some(actual) = self.resolve(table)? else {
            return Ok(None);
        };
        let sql = self.dialect().sample_query(&self.qualify(&actual), "*", limit);
        let relation = self.destination.query(&sql)?;
        self.state.set(NamespaceState::Queried);
        Ok(Some(relation))
    }

    /// Read a table, selecting only `columns` when non-empty
    pub fn read(&self, table: &str, columns: &[String]) -> Result<Option<Relation>, IngestError> {
        let Some(actual) = self.resolve(table)? else {
            return Ok(None);
        };
        let dialect = self.dialect();
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| dialect.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sql = format!("SELECT {} FROM {}", projection, self.qualify(&actual));
        let relation = self.destination.query(&sql)?;
        self.state.set(NamespaceState::Queried);
        Ok(Some(relation))
    }

    /// Drop the namespace now, reporting failure to the caller
    pub fn close(self) -> Result<(), IngestError> {
        let result = self.drop_namespace();
        self.state.set(NamespaceState::Dropped);
        result
    }

    fn drop_namespace(&self) -> Result<(), IngestError> {
        self.destination
            .drop_namespace(&self.name)
            .map_err(|e| IngestError::NamespaceCleanup {
                namespace: self.name.clone(),
                reason: e.to_string(),
            })?;
        debug!(namespace = %self.name, "Staging namespace dropped");
        Ok(())
    }
}

impl<D: Destination + ?Sized> Drop for StagingNamespace<'_, D> {
    fn drop(&mut self) {
        if self.state.get() == NamespaceState::Dropped {
            return;
        }
        if let Err(e) = self.drop_namespace() {
            warn!(namespace = %self.name, error = %e, "Staging namespace cleanup failed");
        }
        self.state.set(NamespaceState::Dropped);
    }
}

static TABLE_TARGETS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(CREATE\s+TABLE(?:\s+IF\s+NOT\s+EXISTS)?|INSERT\s+(?:IGNORE\s+)?INTO|DROP\s+TABLE(?:\s+IF\s+EXISTS)?|ALTER\s+TABLE|TRUNCATE\s+TABLE|REFERENCES|CREATE\s+(?:UNIQUE\s+)?INDEX\s+\S+\s+ON)\s+{TABLE_REF}"
    ))
    .unwrap()
});
static TRANSACTION_CONTROL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*((?:BEGIN|START)\s+TRANSACTION|COMMIT|ROLLBACK)[ \t]*;").unwrap()
});

/// Point every table a script creates, fills, alters or references at
/// `namespace`.
///
/// Transaction control statements are commented out: staged statements run
/// one by one and the namespace drop is the rollback.
pub fn qualify_script(script: &str, namespace: &str, dialect: TargetDialect) -> String {
    let scoped = replace_in_code(script, Flavor::Standard, &TABLE_TARGETS, |caps| {
        format!(
            "{} {}",
            &caps[1],
            dialect.qualified(Some(namespace), &unqualified_name(&caps[2]))
        )
    });
    replace_in_code(&scoped, Flavor::Standard, &TRANSACTION_CONTROL, |caps| {
        format!("-- {};", &caps[1])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_script() {
        let script = "DROP TABLE IF EXISTS \"users\";\nCREATE TABLE \"users\" (id int);\nINSERT INTO users VALUES (1);\nALTER TABLE [dbo].[users] ADD x int;";
        let out = qualify_script(script, "__stage_ab12cd34", TargetDialect::DuckDb);
        assert!(out.contains("DROP TABLE IF EXISTS \"__stage_ab12cd34\".\"users\";"));
        assert!(out.contains("CREATE TABLE \"__stage_ab12cd34\".\"users\" (id int);"));
        assert!(out.contains("INSERT INTO \"__stage_ab12cd34\".\"users\" VALUES (1);"));
        assert!(out.contains("ALTER TABLE \"__stage_ab12cd34\".\"users\" ADD x int;"));
    }

    #[test]
    fn test_qualify_script_comments_transactions() {
        let out = qualify_script(
            "BEGIN TRANSACTION;\nINSERT INTO t VALUES (1);\nCOMMIT;",
            "ns",
            TargetDialect::DuckDb,
        );
        assert!(out.starts_with("-- BEGIN TRANSACTION;"));
        assert!(out.ends_with("-- COMMIT;"));
    }

    #[test]
    fn test_qualify_references() {
        let out = qualify_script(
            "CREATE TABLE a (b_id int REFERENCES b(id));",
            "ns",
            TargetDialect::DuckDb,
        );
        assert!(out.contains("REFERENCES \"ns\".\"b\"(id)"));
    }

    #[test]
    fn test_qualify_script_leaves_literals() {
        let out = qualify_script(
            "INSERT INTO notes VALUES ('see references list and insert into box');\n-- alter table x\nINSERT INTO notes VALUES ('COMMIT;');",
            "ns",
            TargetDialect::DuckDb,
        );
        assert_eq!(
            out,
            "INSERT INTO \"ns\".\"notes\" VALUES ('see references list and insert into box');\n-- alter table x\nINSERT INTO \"ns\".\"notes\" VALUES ('COMMIT;');"
        );
    }

    #[cfg(feature = "duckdb-backend")]
    mod with_duckdb {
        use super::super::*;
        use crate::destination::DuckDbDestination;

        #[test]
        fn test_lifecycle() {
            let db = DuckDbDestination::memory().unwrap();
            let name;
            {
                let ns = StagingNamespace::create(&db).unwrap();
                name = ns.name().to_string();
                assert!(name.starts_with(STAGING_PREFIX));
                assert_eq!(name.len(), STAGING_PREFIX.len() + 8);
                assert_eq!(ns.state(), NamespaceState::Created);

                let report = ns.populate("CREATE TABLE t (id INTEGER);\nINSERT INTO t VALUES (1), (2);");
                assert!(report.is_success());
                assert_eq!(ns.state(), NamespaceState::Populated);

                let sample = ns.sample("T", 1).unwrap().unwrap();
                assert_eq!(sample.len(), 1);
                assert_eq!(ns.state(), NamespaceState::Queried);
                assert!(ns.sample("absent", 5).unwrap().is_none());
                assert!(db.namespace_exists(&name).unwrap());
                // nothing leaked into the default namespace
                assert!(db.list_tables(None).unwrap().is_empty());
            }
            assert!(!db.namespace_exists(&name).unwrap());
        }

        #[test]
        fn test_dropped_on_error_path() {
            let db = DuckDbDestination::memory().unwrap();

            fn failing(db: &DuckDbDestination) -> Result<String, IngestError> {
                let ns = StagingNamespace::create(db)?;
                ns.populate("CREATE TABLE t (id INTEGER);");
                Err(IngestError::UnknownTable(ns.name().to_string()))
            }

            let Err(IngestError::UnknownTable(name)) = failing(&db) else {
                panic!("expected failure");
            };
            assert!(!db.namespace_exists(&name).unwrap());
        }

        #[test]
        fn test_dropped_on_panic() {
            let db = DuckDbDestination::memory().unwrap();
            let name = std::sync::Mutex::new(String::new());
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let ns = StagingNamespace::create(&db).unwrap();
                *name.lock().unwrap() = ns.name().to_string();
                panic!("boom");
            }));
            assert!(result.is_err());
            let name = name.into_inner().unwrap();
            assert!(!db.namespace_exists(&name).unwrap());
        }

        #[test]
        fn test_close_is_explicit_drop() {
            let db = DuckDbDestination::memory().unwrap();
            let ns = StagingNamespace::create(&db).unwrap();
            let name = ns.name().to_string();
            ns.close().unwrap();
            assert!(!db.namespace_exists(&name).unwrap());
        }
    }
}
