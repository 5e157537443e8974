//! Source acquisition and table readers
//!
//! A [`SourceDescriptor`] classifies uploaded bytes by extension. Readers over
//! each kind implement [`TableReader`], which gives the pipeline one view of
//! "named tables with columns, a sampler and a full reader".

pub mod delimited;
pub mod script;
pub mod spreadsheet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

use crate::error::IngestError;
use crate::models::Relation;

pub use delimited::DelimitedReader;
pub use script::{ScriptReader, script_table_candidates};
pub use spreadsheet::SpreadsheetReader;

/// Kind of source, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Spreadsheet,
    DelimitedText,
    SqlScript,
}

impl SourceKind {
    /// Kind for a file name, or `None` for unsupported extensions
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" | "xls" => Some(SourceKind::Spreadsheet),
            "csv" | "txt" => Some(SourceKind::DelimitedText),
            "sql" => Some(SourceKind::SqlScript),
            _ => None,
        }
    }
}

/// An accepted source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// SHA-256 of the bytes, lowercase hex
    pub fingerprint: String,
    /// Sheet names in workbook order (spreadsheets)
    pub sheet_names: Vec<String>,
    /// Decoded script text (SQL scripts)
    pub script: Option<String>,
    /// Table names the script creates or fills (SQL scripts)
    pub sql_tables: Vec<String>,
}

impl SourceDescriptor {
    /// Accept a source from bytes and a file name
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Self, IngestError> {
        let kind =
            SourceKind::from_file_name(file_name).ok_or_else(|| IngestError::UnsupportedFormat {
                file_name: file_name.to_string(),
            })?;

        let mut descriptor = Self {
            kind,
            file_name: file_name.to_string(),
            fingerprint: fingerprint(&bytes),
            bytes,
            sheet_names: Vec::new(),
            script: None,
            sql_tables: Vec::new(),
        };

        match kind {
            SourceKind::Spreadsheet => {
                descriptor.sheet_names = spreadsheet::sheet_names(file_name, &descriptor.bytes)?;
            }
            SourceKind::SqlScript => {
                let text = descriptor.text();
                descriptor.sql_tables = script_table_candidates(&text);
                descriptor.script = Some(text);
            }
            SourceKind::DelimitedText => {}
        }

        info!(
            file = %descriptor.file_name,
            kind = ?descriptor.kind,
            bytes = descriptor.bytes.len(),
            "Source accepted"
        );
        Ok(descriptor)
    }

    /// Accept a source from a directory and a file name inside it
    pub fn from_path(dir: &Path, file_name: &str) -> Result<Self, IngestError> {
        let path = dir.join(file_name);
        if !path.is_file() {
            return Err(IngestError::SourceNotFound(path));
        }
        let bytes = std::fs::read(&path)?;
        Self::from_bytes(file_name, bytes)
    }

    /// Bytes decoded as UTF-8, replacing invalid sequences and dropping a BOM
    pub fn text(&self) -> String {
        let text = String::from_utf8_lossy(&self.bytes);
        text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
    }

    /// Lowercase file extension
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }
}

/// SHA-256 of a byte slice as lowercase hex
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A relation discovered inside a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTable {
    pub name: String,
    pub columns: Vec<String>,
    /// Row count when it is known without a full scan
    pub row_count: Option<usize>,
}

/// Uniform access to the tables of a source
pub trait TableReader {
    /// Candidate table names in discovery order
    fn table_names(&self) -> Result<Vec<String>, IngestError>;

    /// Up to `limit` rows; `None` when the table does not exist
    fn sample(&self, table: &str, limit: usize) -> Result<Option<Relation>, IngestError>;

    /// Every row, restricted to `columns` when non-empty; `None` when the
    /// table does not exist
    fn read(&self, table: &str, columns: &[String]) -> Result<Option<Relation>, IngestError>;

    /// Row count when cheap
    fn row_count(&self, _table: &str) -> Option<usize> {
        None
    }

    /// Columns and row count of every candidate table
    fn describe(&self) -> Result<Vec<CandidateTable>, IngestError> {
        let mut tables = Vec::new();
        for name in self.table_names()? {
            let columns = self
                .sample(&name, 1)?
                .map(|relation| relation.columns)
                .unwrap_or_default();
            let row_count = self.row_count(&name);
            tables.push(CandidateTable {
                name,
                columns,
                row_count,
            });
        }
        Ok(tables)
    }
}

/// Find a name in a list, ignoring ASCII case
pub(crate) fn find_table<'a>(names: impl IntoIterator<Item = &'a String>, table: &str) -> Option<&'a String> {
    names.into_iter().find(|n| n.eq_ignore_ascii_case(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(SourceKind::from_file_name("a.XLSX"), Some(SourceKind::Spreadsheet));
        assert_eq!(SourceKind::from_file_name("a.xls"), Some(SourceKind::Spreadsheet));
        assert_eq!(SourceKind::from_file_name("a.txt"), Some(SourceKind::DelimitedText));
        assert_eq!(SourceKind::from_file_name("dump.sql"), Some(SourceKind::SqlScript));
        assert_eq!(SourceKind::from_file_name("a.pdf"), None);
        assert_eq!(SourceKind::from_file_name("noext"), None);
    }

    #[test]
    fn test_unsupported_format() {
        let err = SourceDescriptor::from_bytes("report.pdf", vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
        assert_eq!(err.tag(), "unsupported_format");
    }

    #[test]
    fn test_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceDescriptor::from_path(dir.path(), "absent.csv").unwrap_err();
        assert!(matches!(err, IngestError::SourceNotFound(_)));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("people.csv"), "name,age\nAna,30\n").unwrap();
        let source = SourceDescriptor::from_path(dir.path(), "people.csv").unwrap();
        assert_eq!(source.kind, SourceKind::DelimitedText);
        assert_eq!(source.extension(), "csv");
        assert_eq!(source.fingerprint.len(), 64);
    }

    #[test]
    fn test_sql_source_candidates() {
        let script = "CREATE TABLE `users` (id int);\nINSERT INTO `orders` VALUES (1);";
        let source = SourceDescriptor::from_bytes("dump.sql", script.as_bytes().to_vec()).unwrap();
        assert_eq!(source.script.as_deref(), Some(script));
        assert_eq!(source.sql_tables, vec!["orders", "users"]);
    }

    #[test]
    fn test_text_drops_bom() {
        let source =
            SourceDescriptor::from_bytes("a.csv", b"\xef\xbb\xbfname\nAna\n".to_vec()).unwrap();
        assert_eq!(source.text(), "name\nAna\n");
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
