//! Error types for ingestion, conversion and destination operations

use std::path::PathBuf;
use thiserror::Error;

use crate::execute::{ErrorKind, classify_error};

/// Errors raised by a destination store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DestinationError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Relation without columns cannot be written
    #[error("Cannot write table {0}: the relation has no columns")]
    EmptyRelation(String),
}

impl DestinationError {
    /// Classification of the underlying database message
    pub fn kind(&self) -> ErrorKind {
        match self {
            DestinationError::Database(message) => classify_error(message),
            DestinationError::EmptyRelation(_) => ErrorKind::Unknown,
        }
    }

    /// Raw message without the variant prefix
    pub fn raw_message(&self) -> String {
        match self {
            DestinationError::Database(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Errors that can occur during ingestion
#[derive(Error, Debug)]
pub enum IngestError {
    /// Source file not found
    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    /// File extension is not one of the supported source formats
    #[error("Unsupported file format: {file_name}")]
    UnsupportedFormat { file_name: String },

    /// Source could not be parsed
    #[error("Could not parse {file_name}: {reason}")]
    ParseFailure { file_name: String, reason: String },

    /// A statement failed while the caller required all statements to succeed
    #[error("Statement {} failed ({kind}): {message}", .index + 1)]
    StatementExecution {
        index: usize,
        statement: String,
        message: String,
        kind: ErrorKind,
    },

    /// A staging namespace could not be dropped. Logged, never returned by
    /// the pipeline.
    #[error("Could not drop staging namespace {namespace}: {reason}")]
    NamespaceCleanup { namespace: String, reason: String },

    /// Writing a projected table failed. `cause` is set when the
    /// destination rejected the write.
    #[error("Could not write table {table}: {reason}")]
    CommitFailure {
        table: String,
        reason: String,
        #[source]
        cause: Option<DestinationError>,
    },

    /// Table is not among the source's candidate tables
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Operation does not fit the session's current step
    #[error("Invalid session state: {0}")]
    InvalidSession(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Destination error wrapper
    #[error(transparent)]
    Destination(#[from] DestinationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Machine-readable classification tag
    pub fn tag(&self) -> &'static str {
        match self {
            IngestError::SourceNotFound(_) => "source_not_found",
            IngestError::UnsupportedFormat { .. } => "unsupported_format",
            IngestError::ParseFailure { .. } => "parse_failure",
            IngestError::StatementExecution { kind, .. } => kind.as_str(),
            IngestError::NamespaceCleanup { .. } => "namespace_cleanup",
            IngestError::CommitFailure { .. } => "commit_failure",
            IngestError::UnknownTable(_) => "unknown_table",
            IngestError::InvalidSession(_) => "invalid_session",
            IngestError::InvalidConfig(_) => "invalid_config",
            IngestError::Destination(e) => e.kind().as_str(),
            IngestError::Io(_) => "io",
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            IngestError::SourceNotFound(path) => {
                format!(
                    "Source not found: {}\n\nHint: Check that the file exists and the path is correct.",
                    path.display()
                )
            }
            IngestError::UnsupportedFormat { file_name } => {
                format!(
                    "Unsupported file format: {file_name}\n\n\
                    Hint: Supported extensions are .xlsx, .xls, .csv, .txt and .sql."
                )
            }
            IngestError::ParseFailure { file_name, reason } => {
                format!(
                    "Could not read {file_name}\nReason: {reason}\n\n\
                    Hint: Check that the file is not corrupt and uses UTF-8 text."
                )
            }
            IngestError::StatementExecution {
                index,
                message,
                kind,
                ..
            } => {
                format!(
                    "Statement {} failed: {}\n\nHint: {}",
                    index + 1,
                    crate::execute::friendly_message(message),
                    kind.suggestion()
                )
            }
            IngestError::UnknownTable(name) => {
                format!(
                    "Unknown table: {name}\n\nHint: Use 'tabload tables <file>' to list the tables a source contains."
                )
            }
            IngestError::InvalidConfig(msg) => {
                format!("Invalid configuration: {msg}\n\nHint: Check your loader configuration file.")
            }
            IngestError::Destination(DestinationError::Database(_))
            | IngestError::CommitFailure { cause: Some(_), .. } => self.friendly_message(),
            _ => self.to_string(),
        }
    }

    /// Short message for a person, without hints. Database messages go
    /// through [`crate::execute::friendly_message`]; everything else is the
    /// display text.
    pub fn friendly_message(&self) -> String {
        match self {
            IngestError::Destination(DestinationError::Database(msg)) => {
                crate::execute::friendly_message(msg)
            }
            IngestError::CommitFailure {
                table,
                cause: Some(DestinationError::Database(msg)),
                ..
            } => format!(
                "Could not write table {table}: {}",
                crate::execute::friendly_message(msg)
            ),
            IngestError::StatementExecution { index, message, .. } => format!(
                "Statement {} failed: {}",
                index + 1,
                crate::execute::friendly_message(message)
            ),
            _ => self.to_string(),
        }
    }
}

#[cfg(feature = "duckdb-backend")]
impl From<duckdb::Error> for DestinationError {
    fn from(err: duckdb::Error) -> Self {
        DestinationError::Database(err.to_string())
    }
}

#[cfg(feature = "duckdb-backend")]
impl From<duckdb::Error> for IngestError {
    fn from(err: duckdb::Error) -> Self {
        IngestError::Destination(err.into())
    }
}
