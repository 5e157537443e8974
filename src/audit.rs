//! Audit records for direct SQL imports
//!
//! Records are returned to the caller; storing them is not this crate's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::convert::truncate_chars;
use crate::execute::ExecutionReport;
use crate::source::fingerprint;

/// Converted script characters kept in a record
pub const MAX_RECORDED_SCRIPT_CHARS: usize = 10_000;

/// Overall result of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Completed,
    CompletedWithErrors,
    Failed,
}

impl ImportStatus {
    /// Status for an execution report: nothing succeeded is a failure
    pub fn from_report(report: &ExecutionReport) -> Self {
        if report.is_success() {
            ImportStatus::Completed
        } else if report.is_total_failure() {
            ImportStatus::Failed
        } else {
            ImportStatus::CompletedWithErrors
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Completed => "completed",
            ImportStatus::CompletedWithErrors => "completed_with_errors",
            ImportStatus::Failed => "failed",
        }
    }
}

/// One direct SQL import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlImportRecord {
    pub file_name: String,
    /// Script size in bytes
    pub size: usize,
    /// SHA-256 of the original script
    pub fingerprint: String,
    pub imported_at: DateTime<Utc>,
    /// Whether the script carried MySQL-only syntax
    pub conversion_required: bool,
    pub total_statements: usize,
    pub successful_statements: usize,
    pub failed_statements: usize,
    pub tables_created: Vec<String>,
    /// `statement <index>: <message>` per failure
    pub errors: Vec<String>,
    pub status: ImportStatus,
    pub duration_ms: u64,
    /// Converted script, capped for storage
    pub converted_script: String,
}

impl SqlImportRecord {
    /// Build a record from a finished import
    pub fn new(
        file_name: &str,
        original: &str,
        converted: &str,
        conversion_required: bool,
        report: &ExecutionReport,
        imported_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        Self {
            file_name: file_name.to_string(),
            size: original.len(),
            fingerprint: fingerprint(original.as_bytes()),
            imported_at,
            conversion_required,
            total_statements: report.total,
            successful_statements: report.success,
            failed_statements: report.failures.len(),
            tables_created: report.tables_created.clone(),
            errors: report
                .failures
                .iter()
                .map(|f| format!("statement {}: {}", f.index + 1, f.error))
                .collect(),
            status: ImportStatus::from_report(report),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            converted_script: truncate_chars(converted, MAX_RECORDED_SCRIPT_CHARS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::{ErrorKind, StatementFailure};

    fn failure(index: usize) -> StatementFailure {
        StatementFailure {
            index,
            statement: "INSERT INTO x VALUES (1)".into(),
            error: "Table x does not exist".into(),
            message: "Table x does not exist".into(),
            kind: ErrorKind::ObjectNotFound,
            suggestion: ErrorKind::ObjectNotFound.suggestion().into(),
        }
    }

    #[test]
    fn test_status_from_report() {
        let mut report = ExecutionReport {
            total: 2,
            success: 2,
            ..Default::default()
        };
        assert_eq!(ImportStatus::from_report(&report), ImportStatus::Completed);

        report.success = 1;
        report.failures.push(failure(1));
        assert_eq!(ImportStatus::from_report(&report), ImportStatus::CompletedWithErrors);

        report.success = 0;
        report.failures.push(failure(0));
        assert_eq!(ImportStatus::from_report(&report), ImportStatus::Failed);
        assert_eq!(ImportStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_record() {
        let report = ExecutionReport {
            total: 2,
            success: 1,
            failures: vec![failure(1)],
            tables_created: vec!["t".into()],
            warnings: Vec::new(),
        };
        let converted = "x".repeat(12_000);
        let record = SqlImportRecord::new(
            "dump.sql",
            "CREATE TABLE `t` (id int);",
            &converted,
            true,
            &report,
            Utc::now(),
            Duration::from_millis(15),
        );
        assert_eq!(record.size, 26);
        assert_eq!(record.fingerprint.len(), 64);
        assert_eq!(record.errors, vec!["statement 2: Table x does not exist"]);
        assert_eq!(record.status, ImportStatus::CompletedWithErrors);
        assert_eq!(record.duration_ms, 15);
        assert_eq!(record.converted_script.chars().count(), MAX_RECORDED_SCRIPT_CHARS + 3);
    }
}
