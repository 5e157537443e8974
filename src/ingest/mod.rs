//! Ingestion pipeline: discovery, preview and commit
//!
//! Each call opens the source afresh. SQL scripts are re-staged in a new
//! namespace per call and the namespace is gone before the call returns.

pub mod projection;
pub mod session;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use crate::audit::SqlImportRecord;
use crate::config::LoaderConfig;
use crate::convert::{DialectTranslator, needs_conversion, truncate_chars};
use crate::destination::Destination;
use crate::error::IngestError;
use crate::execute::{ExecutionReport, ScriptExecutor};
use crate::source::{
    CandidateTable, DelimitedReader, ScriptReader, SourceDescriptor, SourceKind,
    SpreadsheetReader, TableReader,
};

pub use projection::{
    ProjectionSpec, clamp_range, project, sanitize_table_name, unique_column_names,
};
pub use session::{IngestionSession, WizardStep};

/// Warning shown when a previewed table has nothing to show
pub const MISSING_TABLE_WARNING: &str = "The table appears to be missing or empty";

/// Bounded, stringified view of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub warning: Option<String>,
}

/// Tables to commit and the global normalization switch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitRequest {
    pub tables: Vec<ProjectionSpec>,
    pub normalize: bool,
}

impl CommitRequest {
    pub fn new(tables: Vec<ProjectionSpec>) -> Self {
        Self {
            tables,
            normalize: false,
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

/// Result of committing one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOutcome {
    pub source_table: String,
    pub target_table: String,
    pub rows_written: Option<usize>,
    /// Failure reason for a person
    pub error: Option<String>,
    /// Failure reason as the destination reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<String>,
}

impl TableOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-table outcomes plus totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub outcomes: Vec<TableOutcome>,
    pub tables_written: usize,
    pub total_rows: usize,
    /// Script execution behind the commit (SQL sources)
    pub execution: Option<ExecutionReport>,
}

impl CommitSummary {
    pub fn failed(&self) -> impl Iterator<Item = &TableOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    fn record(&mut self, outcome: TableOutcome) {
        if let Some(rows) = outcome.rows_written {
            self.tables_written += 1;
            self.total_rows += rows;
        }
        self.outcomes.push(outcome);
    }
}

/// An opened source
enum OpenSource<'d, D: Destination + ?Sized> {
    Spreadsheet(SpreadsheetReader),
    Delimited(DelimitedReader),
    Script(ScriptReader<'d, D>),
}

impl<D: Destination + ?Sized> OpenSource<'_, D> {
    fn reader(&self) -> &dyn TableReader {
        match self {
            OpenSource::Spreadsheet(r) => r,
            OpenSource::Delimited(r) => r,
            OpenSource::Script(r) => r,
        }
    }

    fn report(&self) -> Option<&ExecutionReport> {
        match self {
            OpenSource::Script(r) => Some(r.report()),
            _ => None,
        }
    }
}

/// Drives sources through discovery, preview and commit into a destination
pub struct IngestPipeline<'d, D: Destination + ?Sized> {
    destination: &'d D,
    config: LoaderConfig,
}

impl<'d, D: Destination + ?Sized> IngestPipeline<'d, D> {
    pub fn new(destination: &'d D) -> Self {
        Self::with_config(destination, LoaderConfig::default())
    }

    pub fn with_config(destination: &'d D, config: LoaderConfig) -> Self {
        Self {
            destination,
            config,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn open(&self, source: &SourceDescriptor) -> Result<OpenSource<'d, D>, IngestError> {
        Ok(match source.kind {
            SourceKind::Spreadsheet => OpenSource::Spreadsheet(SpreadsheetReader::from_bytes(
                &source.file_name,
                &source.bytes,
            )?),
            SourceKind::DelimitedText => {
                OpenSource::Delimited(DelimitedReader::new(source, self.config.raw_line_limit))
            }
            SourceKind::SqlScript => {
                let script = source.script.clone().unwrap_or_else(|| source.text());
                OpenSource::Script(ScriptReader::stage_with_prefix(
                    self.destination,
                    &script,
                    &self.config.staging_prefix,
                )?)
            }
        })
    }

    /// Start a session: accept the source and discover its tables
    pub fn begin(&self, source: SourceDescriptor) -> Result<IngestionSession, IngestError> {
        let discovered_tables = self.discover(&source)?;
        Ok(IngestionSession {
            step: WizardStep::SelectTables,
            source: Some(source),
            discovered_tables,
        })
    }

    /// Candidate tables of a source, in discovery order
    pub fn discover(&self, source: &SourceDescriptor) -> Result<Vec<CandidateTable>, IngestError> {
        let opened = self.open(source)?;
        let tables = opened.reader().describe()?;
        info!(file = %source.file_name, tables = tables.len(), "Tables discovered");
        Ok(tables)
    }

    /// First rows of one table, values stringified and cut to the display width
    pub fn preview(&self, source: &SourceDescriptor, table: &str) -> Result<Preview, IngestError> {
        let opened = self.open(source)?;
        let sample = opened.reader().sample(table, self.config.preview_rows)?;

        let Some(relation) = sample.filter(|r| !r.columns.is_empty()) else {
            warn!(table = %table, "Previewed table is missing or empty");
            return Ok(Preview {
                table: table.to_string(),
                columns: Vec::new(),
                rows: Vec::new(),
                warning: Some(MISSING_TABLE_WARNING.to_string()),
            });
        };

        let width = self.config.display_width;
        let rows = relation
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| truncate_chars(&cell.display(), width))
                    .collect()
            })
            .collect();
        Ok(Preview {
            table: table.to_string(),
            warning: relation
                .is_empty()
                .then(|| MISSING_TABLE_WARNING.to_string()),
            columns: relation.columns,
            rows,
        })
    }

    /// Preview a table of the session's source
    pub fn preview_session(
        &self,
        session: &IngestionSession,
        table: &str,
    ) -> Result<Preview, IngestError> {
        let source = session_source(session)?;
        if session.table(table).is_none() {
            return Err(IngestError::UnknownTable(table.to_string()));
        }
        self.preview(source, table)
    }

    /// Project and write every requested table.
    ///
    /// A failing table is recorded in its outcome and does not stop the
    /// others. Only source acquisition errors are returned.
    pub fn commit(
        &self,
        source: &SourceDescriptor,
        request: &CommitRequest,
    ) -> Result<CommitSummary, IngestError> {
        self.commit_inner(source, request, false)
    }

    /// Like [`IngestPipeline::commit`], but a failed statement while staging
    /// a SQL source aborts before anything is written
    pub fn commit_strict(
        &self,
        source: &SourceDescriptor,
        request: &CommitRequest,
    ) -> Result<CommitSummary, IngestError> {
        self.commit_inner(source, request, true)
    }

    fn commit_inner(
        &self,
        source: &SourceDescriptor,
        request: &CommitRequest,
        strict: bool,
    ) -> Result<CommitSummary, IngestError> {
        let opened = self.open(source)?;
        if strict {
            if let Some(failure) = opened.report().and_then(|r| r.failures.first()) {
                return Err(IngestError::StatementExecution {
                    index: failure.index,
                    statement: failure.statement.clone(),
                    message: failure.error.clone(),
                    kind: failure.kind,
                });
            }
        }
        let reader = opened.reader();
        let mut summary = CommitSummary {
            execution: opened.report().cloned(),
            ..Default::default()
        };

        for spec in &request.tables {
            let target_table = spec.destination_table();
            let outcome = match self.commit_table(reader, source.kind, spec, request.normalize) {
                Ok(rows) => {
                    info!(source = %spec.table, target = %target_table, rows, "Table committed");
                    TableOutcome {
                        source_table: spec.table.clone(),
                        target_table,
                        rows_written: Some(rows),
                        error: None,
                        raw_error: None,
                    }
                }
                Err(e) => {
                    warn!(source = %spec.table, target = %target_table, error = %e, "Table commit failed");
                    TableOutcome {
                        source_table: spec.table.clone(),
                        target_table,
                        rows_written: None,
                        error: Some(e.friendly_message()),
                        raw_error: Some(e.to_string()),
                    }
                }
            };
            summary.record(outcome);
        }

        info!(
            tables = summary.tables_written,
            rows = summary.total_rows,
            failed = summary.failed().count(),
            "Commit finished"
        );
        Ok(summary)
    }

    /// Commit the session's source and move the session to `Done`
    pub fn commit_session(
        &self,
        session: &mut IngestionSession,
        request: &CommitRequest,
    ) -> Result<CommitSummary, IngestError> {
        if session.step != WizardStep::SelectTables {
            return Err(IngestError::InvalidSession(format!(
                "cannot commit from step {:?}",
                session.step
            )));
        }
        let summary = self.commit(session_source(session)?, request)?;
        session.step = WizardStep::Done;
        Ok(summary)
    }

    fn commit_table(
        &self,
        reader: &dyn TableReader,
        kind: SourceKind,
        spec: &ProjectionSpec,
        normalize_cells: bool,
    ) -> Result<usize, IngestError> {
        let target = spec.destination_table();
        let failure = |reason: String| IngestError::CommitFailure {
            table: target.clone(),
            reason,
            cause: None,
        };

        let available = reader
            .sample(&spec.table, 0)?
            .map(|r| r.columns)
            .ok_or_else(|| IngestError::UnknownTable(spec.table.clone()))?;

        let mut columns = Vec::with_capacity(spec.columns.len());
        for wanted in &spec.columns {
            match available.iter().find(|c| c.eq_ignore_ascii_case(wanted)) {
                Some(actual) => columns.push(actual.clone()),
                None => warn!(table = %spec.table, column = %wanted, "Selected column not found, skipped"),
            }
        }
        if !spec.columns.is_empty() && columns.is_empty() {
            return Err(failure("none of the selected columns exist".to_string()));
        }

        let relation = reader
            .read(&spec.table, &columns)?
            .ok_or_else(|| IngestError::UnknownTable(spec.table.clone()))?;
        if kind == SourceKind::SqlScript && relation.is_empty() {
            return Err(failure("the staged table has no rows".to_string()));
        }

        let renames = spec
            .renames
            .iter()
            .map(|(from, to)| {
                let from = available
                    .iter()
                    .find(|c| c.eq_ignore_ascii_case(from))
                    .unwrap_or(from);
                (from.clone(), to.clone())
            })
            .collect();
        let resolved = ProjectionSpec {
            columns,
            renames,
            ..spec.clone()
        };
        let projected = project(relation, &resolved, normalize_cells);

        self.destination
            .write_relation(&target, &projected, spec.mode)
            .map_err(|e| IngestError::CommitFailure {
                table: target.clone(),
                reason: e.raw_message(),
                cause: Some(e),
            })
    }

    /// Translate a script for the destination and run it there directly
    pub fn import_script(&self, file_name: &str, script: &str) -> (ExecutionReport, SqlImportRecord) {
        let started = Instant::now();
        let imported_at = Utc::now();
        let translated = DialectTranslator::new(self.destination.dialect()).translate(script);
        let report = ScriptExecutor::new(self.destination).execute(&translated.script);

        let record = SqlImportRecord::new(
            file_name,
            script,
            &translated.script,
            needs_conversion(script),
            &report,
            imported_at,
            started.elapsed(),
        );
        info!(
            file = %file_name,
            status = record.status.as_str(),
            total = report.total,
            failed = report.failures.len(),
            "SQL import finished"
        );
        (report, record)
    }
}

fn session_source(session: &IngestionSession) -> Result<&SourceDescriptor, IngestError> {
    session
        .source
        .as_ref()
        .ok_or_else(|| IngestError::InvalidSession("no source selected".to_string()))
}
