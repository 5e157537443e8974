//! tabload - ad-hoc tabular ingestion and MySQL dialect conversion
//!
//! Provides:
//! - Source reading for Excel workbooks, delimited text and SQL scripts
//! - Rule-based MySQL to SQL Server / DuckDB script translation
//! - Compatibility analysis of MySQL scripts
//! - Statement-by-statement execution with partial failure reporting
//! - Throwaway staging namespaces for previewing script output
//! - Column/row projection, renaming and normalization before commit

pub mod audit;
pub mod config;
pub mod convert;
pub mod destination;
pub mod error;
pub mod execute;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod process;
pub mod sniff;
pub mod source;
pub mod staging;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use audit::{ImportStatus, SqlImportRecord};
pub use config::LoaderConfig;
pub use convert::{
    CompatibilityLevel, CompatibilityReport, ConversionPreview, DialectTranslator, RewriteRule,
    TargetDialect, TranslationResult, preview_conversion, split_statements, translate,
};
pub use destination::{Destination, WriteMode};
#[cfg(feature = "duckdb-backend")]
pub use destination::DuckDbDestination;
pub use error::{DestinationError, IngestError};
pub use execute::{ErrorKind, ExecutionReport, ScriptExecutor, StatementFailure};
pub use ingest::{
    CommitRequest, CommitSummary, IngestPipeline, IngestionSession, Preview, ProjectionSpec,
    TableOutcome, WizardStep,
};
pub use models::{CellValue, ColumnType, Relation};
pub use normalize::normalize;
pub use process::{OnError, ProcessConfig, ProcessRun, TableMapping, run_process};
pub use sniff::{SniffError, SniffResult, sniff};
pub use source::{CandidateTable, SourceDescriptor, SourceKind, TableReader};
pub use staging::{NamespaceState, StagingNamespace};
