//! Statement-by-statement script execution with partial failure

pub mod classify;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::convert::{split_statements, truncate_chars};
use crate::destination::Destination;

pub use classify::{ErrorKind, classify_error, extract_error_code, friendly_message};

/// Statement text kept in failure records
const STATEMENT_PREVIEW_CHARS: usize = 100;

/// One failed statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementFailure {
    /// Zero-based position in the script
    pub index: usize,
    /// Statement text, truncated
    pub statement: String,
    /// Raw database message
    pub error: String,
    /// `error` rewritten for a person
    pub message: String,
    pub kind: ErrorKind,
    pub suggestion: String,
}

/// Outcome of running a script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub total: usize,
    pub success: usize,
    pub failures: Vec<StatementFailure>,
    pub tables_created: Vec<String>,
    pub warnings: Vec<String>,
}

impl ExecutionReport {
    /// Every statement succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Nothing succeeded although there was something to run
    pub fn is_total_failure(&self) -> bool {
        self.total > 0 && self.success == 0
    }

    fn add_warning(&mut self, warning: &str) {
        if !self.warnings.iter().any(|w| w == warning) {
            self.warnings.push(warning.to_string());
        }
    }
}

/// Kind of statement, for bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    CreateTable(String),
    Insert(String),
    Other,
}

pub(crate) const TABLE_REF: &str = r#"((?:(?:\[[^\]]+\]|"[^"]+"|`[^`]+`|\w+)\.)?(?:\[[^\]]+\]|"[^"]+"|`[^`]+`|\w+))"#;

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{TABLE_REF}"
    ))
    .unwrap()
});
static INSERT_INTO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^\s*INSERT\s+(?:IGNORE\s+)?INTO\s+{TABLE_REF}")).unwrap()
});

impl StatementType {
    /// Detect CREATE TABLE and INSERT INTO statements and their target table
    pub fn detect(statement: &str) -> Self {
        if let Some(caps) = CREATE_TABLE.captures(statement) {
            return StatementType::CreateTable(unqualified_name(&caps[1]));
        }
        if let Some(caps) = INSERT_INTO.captures(statement) {
            return StatementType::Insert(unqualified_name(&caps[1]));
        }
        StatementType::Other
    }
}

/// Last part of a possibly schema-qualified name, without quotes
pub fn unqualified_name(reference: &str) -> String {
    let last = split_qualified(reference).pop().unwrap_or_default();
    strip_quotes(&last).to_string()
}

fn split_qualified(reference: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut closing: Option<char> = None;
    for c in reference.chars() {
        match closing {
            Some(close) if c == close => {
                closing = None;
                current.push(c);
            }
            Some(_) => current.push(c),
            None => match c {
                '[' => {
                    closing = Some(']');
                    current.push(c);
                }
                '"' | '`' => {
                    closing = Some(c);
                    current.push(c);
                }
                '.' => parts.push(std::mem::take(&mut current)),
                _ => current.push(c),
            },
        }
    }
    parts.push(current);
    parts
}

fn strip_quotes(name: &str) -> &str {
    let name = name.trim();
    for (open, close) in [('[', ']'), ('"', '"'), ('`', '`')] {
        if name.len() >= 2 && name.starts_with(open) && name.ends_with(close) {
            return &name[1..name.len() - 1];
        }
    }
    name
}

/// Runs scripts against a destination, one statement at a time.
///
/// Statements run in source order in autocommit mode; a failing statement is
/// recorded and execution continues with the next one.
pub struct ScriptExecutor<'d, D: Destination + ?Sized> {
    destination: &'d D,
}

impl<'d, D: Destination + ?Sized> ScriptExecutor<'d, D> {
    pub fn new(destination: &'d D) -> Self {
        Self { destination }
    }

    /// Execute every statement of a script
    pub fn execute(&self, script: &str) -> ExecutionReport {
        let statements = split_statements(script);
        let mut report = ExecutionReport {
            total: statements.len(),
            ..Default::default()
        };

        for (index, statement) in statements.iter().enumerate() {
            let statement_type = StatementType::detect(statement);
            match self.destination.execute(statement) {
                Ok(()) => {
                    report.success += 1;
                    if let StatementType::CreateTable(table) = &statement_type {
                        if !report.tables_created.contains(table) {
                            report.tables_created.push(table.clone());
                        }
                    }
                }
                Err(e) => {
                    let message = e.raw_message();
                    let kind = classify_error(&message);
                    error!(index, kind = %kind, error = %message, "Statement failed");
                    if let Some(warning) = kind.report_warning() {
                        report.add_warning(warning);
                    }
                    report.failures.push(StatementFailure {
                        index,
                        statement: truncate_chars(statement, STATEMENT_PREVIEW_CHARS),
                        message: friendly_message(&message),
                        error: message,
                        kind,
                        suggestion: kind.suggestion().to_string(),
                    });
                }
            }
            debug!(index, statement_type = ?statement_type, "Statement processed");
        }

        info!(
            total = report.total,
            success = report.success,
            failed = report.failures.len(),
            "Script executed"
        );
        report
    }
}
