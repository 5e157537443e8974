//! CLI error types

use std::path::PathBuf;
use thiserror::Error;

use crate::error::{DestinationError, IngestError};

/// Errors surfaced by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    /// Input file could not be read
    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    /// Invalid command-line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A saved process run did not succeed
    #[error("Process failed: {0}")]
    ProcessFailed(String),

    /// Output could not be serialized
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Ingestion error
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Destination error
    #[error(transparent)]
    Destination(#[from] DestinationError),
}

impl CliError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CliError::FileReadError(path, reason) => {
                format!(
                    "Failed to read {}: {}\n\nHint: Check that the file exists and is readable.",
                    path.display(),
                    reason
                )
            }
            CliError::InvalidArgument(msg) => {
                format!("Invalid argument: {msg}\n\nHint: Run with --help to see accepted values.")
            }
            CliError::Ingest(e) => e.user_message(),
            CliError::Destination(e) => IngestError::Destination(e.clone()).user_message(),
            CliError::ProcessFailed(name) => format!(
                "Process failed: {name}\n\nHint: Re-run with RUST_LOG=tabload=debug for statement details."
            ),
            CliError::SerializationError(_) => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::SerializationError(err.to_string())
    }
}
