//! Saved ingestion processes
//!
//! A process names a source, the tables to take from it and how to write
//! them, so the same load can be re-run (typically with append).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::LoaderConfig;
use crate::destination::{Destination, WriteMode};
use crate::error::IngestError;
use crate::ingest::{CommitRequest, CommitSummary, IngestPipeline, ProjectionSpec, TableOutcome};
use crate::source::SourceDescriptor;

/// File name given to inline SQL sources
const INLINE_SQL_NAME: &str = "inline.sql";

/// Where a process reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProcessSource {
    /// SQL text stored in the process itself
    Sql { text: String },
    /// A file on disk
    File { path: PathBuf },
}

/// What to do when part of a run fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Continue,
    Stop,
}

impl std::str::FromStr for OnError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" => Ok(OnError::Continue),
            "stop" => Ok(OnError::Stop),
            _ => Err(format!("Invalid error policy: {}. Expected: continue, stop", s)),
        }
    }
}

/// One source table and its destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMapping {
    pub source: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub mode: WriteMode,
}

/// A saved process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub name: String,
    pub source: ProcessSource,
    /// Tables to load; every discovered table when empty
    #[serde(default)]
    pub mappings: Vec<TableMapping>,
    #[serde(default)]
    pub on_error: OnError,
    #[serde(default)]
    pub normalize: bool,
}

impl ProcessConfig {
    /// Load a process from a `.toml` or `.json` file
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, IngestError> {
        toml::from_str(text).map_err(|e| IngestError::InvalidConfig(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, IngestError> {
        serde_json::from_str(text).map_err(|e| IngestError::InvalidConfig(e.to_string()))
    }

    fn acquire(&self) -> Result<SourceDescriptor, IngestError> {
        match &self.source {
            ProcessSource::Sql { text } => {
                SourceDescriptor::from_bytes(INLINE_SQL_NAME, text.as_bytes().to_vec())
            }
            ProcessSource::File { path } => {
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| IngestError::SourceNotFound(path.clone()))?;
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                SourceDescriptor::from_path(dir, file_name)
            }
        }
    }
}

/// Log of one process run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRun {
    pub process: String,
    pub success: bool,
    pub total_rows: usize,
    pub message: String,
    pub errors: Vec<String>,
    pub tables: Vec<TableOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Run a saved process against a destination
pub fn run_process<D: Destination + ?Sized>(
    destination: &D,
    process: &ProcessConfig,
    config: &LoaderConfig,
) -> ProcessRun {
    let started_at = Utc::now();
    info!(process = %process.name, "Process started");

    let outcome = execute_process(destination, process, config);
    let finished_at = Utc::now();

    let run = match outcome {
        Ok(summary) => {
            let mut errors: Vec<String> = summary
                .execution
                .iter()
                .flat_map(|r| r.failures.iter())
                .map(|f| format!("statement {}: {}", f.index + 1, f.message))
                .collect();
            errors.extend(summary.failed().map(|o| {
                format!(
                    "{}: {}",
                    o.source_table,
                    o.error.as_deref().unwrap_or_default()
                )
            }));
            let tables_failed = summary.failed().count();
            let success = match process.on_error {
                OnError::Stop => errors.is_empty(),
                OnError::Continue => tables_failed == 0,
            };
            ProcessRun {
                process: process.name.clone(),
                success,
                total_rows: summary.total_rows,
                message: format!(
                    "{} table(s) written, {} row(s), {} table(s) failed",
                    summary.tables_written, summary.total_rows, tables_failed
                ),
                errors,
                tables: summary.outcomes,
                started_at,
                finished_at,
            }
        }
        Err(e) => {
            error!(process = %process.name, error = %e, "Process aborted");
            ProcessRun {
                process: process.name.clone(),
                success: false,
                total_rows: 0,
                message: e.user_message(),
                errors: vec![e.friendly_message()],
                tables: Vec::new(),
                started_at,
                finished_at,
            }
        }
    };

    info!(
        process = %run.process,
        success = run.success,
        rows = run.total_rows,
        "Process finished"
    );
    run
}

fn execute_process<D: Destination + ?Sized>(
    destination: &D,
    process: &ProcessConfig,
    config: &LoaderConfig,
) -> Result<CommitSummary, IngestError> {
    let source = process.acquire()?;
    let pipeline = IngestPipeline::with_config(destination, config.clone());

    let specs = if process.mappings.is_empty() {
        pipeline
            .discover(&source)?
            .into_iter()
            .map(|t| ProjectionSpec::new(t.name))
            .collect()
    } else {
        process
            .mappings
            .iter()
            .map(|m| {
                let spec = ProjectionSpec::new(m.source.clone()).with_mode(m.mode);
                match &m.target {
                    Some(target) => spec.with_target(target.clone()),
                    None => spec,
                }
            })
            .collect()
    };

    let request = CommitRequest::new(specs).with_normalize(process.normalize);
    match process.on_error {
        OnError::Stop => pipeline.commit_strict(&source, &request),
        OnError::Continue => pipeline.commit(&source, &request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml() {
        let process = ProcessConfig::from_toml_str(
            r#"
name = "nightly"
on_error = "stop"

[source]
type = "file"
path = "exports/items.sql"

[[mappings]]
source = "items"
target = "items_archive"
mode = "append"

[[mappings]]
source = "users"
"#,
        )
        .unwrap();
        assert_eq!(process.on_error, OnError::Stop);
        assert_eq!(
            process.source,
            ProcessSource::File {
                path: PathBuf::from("exports/items.sql")
            }
        );
        assert_eq!(process.mappings[0].mode, WriteMode::Append);
        assert_eq!(process.mappings[1].mode, WriteMode::Replace);
        assert!(process.mappings[1].target.is_none());
    }

    #[test]
    fn test_from_json() {
        let process = ProcessConfig::from_json_str(
            r#"{"name": "p", "source": {"type": "sql", "text": "SELECT 1;"}}"#,
        )
        .unwrap();
        assert_eq!(process.on_error, OnError::Continue);
        assert!(process.mappings.is_empty());
    }

    #[test]
    fn test_invalid_process() {
        assert!(matches!(
            ProcessConfig::from_json_str("{\"name\": 1}"),
            Err(IngestError::InvalidConfig(_))
        ));
        assert_eq!("STOP".parse::<OnError>(), Ok(OnError::Stop));
        assert!("halt".parse::<OnError>().is_err());
    }

    #[cfg(feature = "duckdb-backend")]
    mod with_duckdb {
        use super::super::*;
        use crate::destination::DuckDbDestination;

        const SCRIPT: &str = "CREATE TABLE `items` (`id` int(11), `label` varchar(20));\n\
            INSERT INTO `items` VALUES (1, 'pen'), (2, 'ink');";

        fn process(on_error: OnError, script: &str) -> ProcessConfig {
            ProcessConfig {
                name: "items".into(),
                source: ProcessSource::Sql {
                    text: script.to_string(),
                },
                mappings: vec![TableMapping {
                    source: "items".into(),
                    target: Some("items_log".into()),
                    mode: WriteMode::Append,
                }],
                on_error,
                normalize: false,
            }
        }

        #[test]
        fn test_rerun_appends() {
            let db = DuckDbDestination::memory().unwrap();
            let config = LoaderConfig::default();
            let first = run_process(&db, &process(OnError::Continue, SCRIPT), &config);
            assert!(first.success, "{:?}", first.errors);
            assert_eq!(first.total_rows, 2);

            let second = run_process(&db, &process(OnError::Continue, SCRIPT), &config);
            assert!(second.success);
            assert_eq!(db.row_count("items_log").unwrap(), 4);
            assert!(second.finished_at >= second.started_at);
        }

        #[test]
        fn test_stop_aborts_before_commit() {
            let db = DuckDbDestination::memory().unwrap();
            let script = format!("{}\nINSERT INTO `missing` VALUES (1);", SCRIPT);
            let run = run_process(&db, &process(OnError::Stop, &script), &LoaderConfig::default());
            assert!(!run.success);
            assert!(run.tables.is_empty());
            assert!(!db.table_exists(None, "items_log").unwrap());

            let run = run_process(&db, &process(OnError::Continue, &script), &LoaderConfig::default());
            assert!(run.success);
            assert_eq!(run.errors.len(), 1);
        }

        #[test]
        fn test_missing_file() {
            let db = DuckDbDestination::memory().unwrap();
            let mut p = process(OnError::Continue, "");
            p.source = ProcessSource::File {
                path: PathBuf::from("/nonexistent/dir/items.sql"),
            };
            let run = run_process(&db, &p, &LoaderConfig::default());
            assert!(!run.success);
            assert!(run.message.contains("Hint:"));
        }
    }
}
