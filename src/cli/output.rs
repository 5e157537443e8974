//! Output formatting for CLI

use serde::Serialize;

use crate::cli::error::CliError;
use crate::convert::{CompatibilityReport, ConversionPreview};
use crate::execute::ExecutionReport;
use crate::ingest::{CommitSummary, Preview};
use crate::process::ProcessRun;
use crate::source::CandidateTable;

/// Pretty-printed JSON of any serializable value
pub fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Format a compatibility report
pub fn format_compatibility(report: &CompatibilityReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("Compatibility: {}\n", report.level));
    output.push_str(&format!("Risky constructs: {}\n", report.total_occurrences));

    if !report.problems.is_empty() {
        output.push_str("\nProblems:\n");
        for problem in &report.problems {
            output.push_str(&format!(
                "  - [{:?}] {} (x{})\n",
                problem.severity, problem.description, problem.occurrences
            ));
        }
    }
    if !report.recommendations.is_empty() {
        output.push_str("\nRecommendations:\n");
        for recommendation in &report.recommendations {
            output.push_str(&format!("  - {}\n", recommendation));
        }
    }
    output
}

/// Format a conversion preview: the script followed by what changed
pub fn format_conversion(preview: &ConversionPreview) -> String {
    let mut output = String::new();
    output.push_str(&preview.converted);
    output.push('\n');

    if preview.truncated {
        output.push_str(&format!(
            "\n-- Output truncated: {} of {} characters shown\n",
            preview.converted.chars().count().saturating_sub(3),
            preview.converted_chars
        ));
    }
    if !preview.changes.is_empty() {
        output.push_str(&format!("\n-- Changes ({}):\n", preview.dialect));
        for change in &preview.changes {
            output.push_str(&format!("--   {}\n", change));
        }
    }
    if let Some(report) = &preview.compatibility {
        for line in format_compatibility(report).lines() {
            output.push_str(&format!("-- {}\n", line));
        }
    }
    for issue in &preview.syntax_issues {
        output.push_str(&format!(
            "-- Statement {} may not parse: {}\n",
            issue.index + 1,
            issue.message
        ));
    }
    output
}

/// Format discovered tables
pub fn format_tables(tables: &[CandidateTable]) -> String {
    let mut output = String::new();
    output.push_str(&format!("Found {} table(s):\n", tables.len()));
    for table in tables {
        let rows = table
            .row_count
            .map(|n| format!("{} rows", n))
            .unwrap_or_else(|| "rows unknown".to_string());
        output.push_str(&format!("\n  {} ({})\n", table.name, rows));
        output.push_str(&format!("    Columns: {}\n", table.columns.join(", ")));
    }
    output
}

/// Format a preview as a tab-separated grid
pub fn format_preview(preview: &Preview) -> String {
    let mut output = String::new();
    if let Some(warning) = &preview.warning {
        output.push_str(&format!("Warning: {}\n", warning));
    }
    if !preview.columns.is_empty() {
        output.push_str(&preview.columns.join("\t"));
        output.push('\n');
    }
    for row in &preview.rows {
        output.push_str(&row.join("\t"));
        output.push('\n');
    }
    output
}

/// Format a script execution report
pub fn format_execution(report: &ExecutionReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Executed {} statement(s): {} succeeded, {} failed\n",
        report.total,
        report.success,
        report.failures.len()
    ));
    if !report.tables_created.is_empty() {
        output.push_str(&format!(
            "Tables created: {}\n",
            report.tables_created.join(", ")
        ));
    }
    if !report.failures.is_empty() {
        output.push_str("\nFailures:\n");
        for failure in report.failures.iter().take(10) {
            output.push_str(&format!(
                "  - Statement {} ({}): {}\n    {}\n    Hint: {}\n",
                failure.index + 1,
                failure.kind,
                failure.message,
                failure.statement,
                failure.suggestion
            ));
        }
        if report.failures.len() > 10 {
            output.push_str(&format!("  ... and {} more\n", report.failures.len() - 10));
        }
    }
    for warning in &report.warnings {
        output.push_str(&format!("Warning: {}\n", warning));
    }
    output
}

/// Format a commit summary
pub fn format_commit(summary: &CommitSummary) -> String {
    let mut output = String::new();
    if let Some(report) = &summary.execution {
        output.push_str("Staging:\n");
        output.push_str(&format_execution(report));
        output.push('\n');
    }
    for outcome in &summary.outcomes {
        match (&outcome.rows_written, &outcome.error) {
            (Some(rows), _) => output.push_str(&format!(
                "  {} -> {}: {} row(s)\n",
                outcome.source_table, outcome.target_table, rows
            )),
            (None, error) => output.push_str(&format!(
                "  {} -> {}: failed: {}\n",
                outcome.source_table,
                outcome.target_table,
                error.as_deref().unwrap_or("unknown error")
            )),
        }
    }
    output.push_str(&format!(
        "\n{} table(s) written, {} row(s) total\n",
        summary.tables_written, summary.total_rows
    ));
    output
}

/// Format a process run log
pub fn format_process_run(run: &ProcessRun) -> String {
    let mut output = String::new();
    let status = if run.success { "succeeded" } else { "failed" };
    output.push_str(&format!("Process '{}' {}\n", run.process, status));
    output.push_str(&format!("  {}\n", run.message));
    output.push_str(&format!(
        "  Duration: {} ms\n",
        (run.finished_at - run.started_at).num_milliseconds()
    ));
    if !run.errors.is_empty() {
        output.push_str(&format!("\nErrors ({}):\n", run.errors.len()));
        for error in &run.errors {
            output.push_str(&format!("  - {}\n", error));
        }
    }
    output
}
