//! CSV and plain-text reader

use once_cell::sync::Lazy;
use regex::Regex;

use super::{SourceDescriptor, TableReader};
use crate::error::IngestError;
use crate::models::Relation;
use crate::sniff::{CSV_DELIMITERS, SniffResult, TXT_DELIMITERS, sniff_with_limit};

/// Table name used when the file stem has no word characters
pub const FALLBACK_TABLE_NAME: &str = "csv_table";

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// Exactly one table, named after the file
pub struct DelimitedReader {
    name: String,
    sniffed: SniffResult,
}

impl DelimitedReader {
    /// Sniff the delimiter of a `.csv` or `.txt` source
    pub fn new(source: &SourceDescriptor, raw_line_limit: usize) -> Self {
        let candidates = if source.extension() == "txt" {
            TXT_DELIMITERS
        } else {
            CSV_DELIMITERS
        };
        Self {
            name: table_name_for(&source.file_name),
            sniffed: sniff_with_limit(&source.text(), candidates, raw_line_limit),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepted delimiter, `None` for raw-line framing
    pub fn delimiter(&self) -> Option<u8> {
        self.sniffed.delimiter
    }

    fn table(&self, table: &str) -> Option<&Relation> {
        self.name
            .eq_ignore_ascii_case(table)
            .then_some(&self.sniffed.relation)
    }
}

impl TableReader for DelimitedReader {
    fn table_names(&self) -> Result<Vec<String>, IngestError> {
        Ok(vec![self.name.clone()])
    }

    fn sample(&self, table: &str, limit: usize) -> Result<Option<Relation>, IngestError> {
        Ok(self.table(table).map(|r| r.clone().head(limit)))
    }

    fn read(&self, table: &str, columns: &[String]) -> Result<Option<Relation>, IngestError> {
        Ok(self.table(table).map(|r| {
            if columns.is_empty() {
                r.clone()
            } else {
                r.project(columns)
            }
        }))
    }

    fn row_count(&self, table: &str) -> Option<usize> {
        self.table(table).map(Relation::len)
    }
}

/// Synthetic table name: the sanitized file stem
pub fn table_name_for(file_name: &str) -> String {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = NON_WORD.replace_all(stem, "_");
    let name = name.trim_matches('_');
    if name.is_empty() {
        FALLBACK_TABLE_NAME.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn reader(file_name: &str, text: &str) -> DelimitedReader {
        let source = SourceDescriptor::from_bytes(file_name, text.as_bytes().to_vec()).unwrap();
        DelimitedReader::new(&source, 1000)
    }

    #[test]
    fn test_table_name_for() {
        assert_eq!(table_name_for("people.csv"), "people");
        assert_eq!(table_name_for("Sales 2024 (Q1).csv"), "Sales_2024_Q1");
        assert_eq!(table_name_for("---.txt"), FALLBACK_TABLE_NAME);
    }

    #[test]
    fn test_csv_reader() {
        let r = reader("people.csv", "name;age\nAna;30\nLuis;25\n");
        assert_eq!(r.delimiter(), Some(b';'));
        assert_eq!(r.table_names().unwrap(), vec!["people"]);
        assert_eq!(r.row_count("PEOPLE"), Some(2));

        let ages = r.read("people", &["age".to_string()]).unwrap().unwrap();
        assert_eq!(ages.columns, vec!["age"]);
        assert_eq!(ages.rows[1], vec![CellValue::Integer(25)]);
        assert!(r.sample("other", 5).unwrap().is_none());
    }

    #[test]
    fn test_txt_prefers_tab() {
        let r = reader("log.txt", "a\tb,c\n1\t2,3\n");
        assert_eq!(r.delimiter(), Some(b'\t'));
        let tables = r.describe().unwrap();
        assert_eq!(tables[0].columns, vec!["a", "b,c"]);
        assert_eq!(tables[0].row_count, Some(1));
    }

    #[test]
    fn test_raw_lines() {
        let r = reader("notes.txt", "first line\nsecond line\n");
        assert_eq!(r.delimiter(), None);
        let sample = r.sample("notes", 10).unwrap().unwrap();
        assert_eq!(sample.columns, vec!["content"]);
        assert_eq!(sample.len(), 2);
    }
}
