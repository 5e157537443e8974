//! Excel workbook reader

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;
use tracing::debug;

use super::{TableReader, find_table};
use crate::error::IngestError;
use crate::models::{CellValue, Relation, dedupe_headers};

/// Sheet names of a workbook, in workbook order
pub fn sheet_names(file_name: &str, bytes: &[u8]) -> Result<Vec<String>, IngestError> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| {
        IngestError::ParseFailure {
            file_name: file_name.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(workbook.sheet_names())
}

/// One table per worksheet; the first row of a sheet is its header
pub struct SpreadsheetReader {
    sheets: Vec<(String, Relation)>,
}

impl SpreadsheetReader {
    /// Parse every worksheet of a workbook
    pub fn from_bytes(file_name: &str, bytes: &[u8]) -> Result<Self, IngestError> {
        let parse_failure = |reason: String| IngestError::ParseFailure {
            file_name: file_name.to_string(),
            reason,
        };

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| parse_failure(e.to_string()))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| parse_failure(format!("sheet {}: {}", name, e)))?;
            let relation = range_to_relation(range.rows());
            debug!(sheet = %name, rows = relation.len(), columns = relation.columns.len(), "Sheet read");
            sheets.push((name, relation));
        }
        Ok(Self { sheets })
    }

    fn sheet(&self, table: &str) -> Option<&Relation> {
        let name = find_table(self.sheets.iter().map(|(n, _)| n), table)?;
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, relation)| relation)
    }
}

impl TableReader for SpreadsheetReader {
    fn table_names(&self) -> Result<Vec<String>, IngestError> {
        Ok(self.sheets.iter().map(|(n, _)| n.clone()).collect())
    }

    fn sample(&self, table: &str, limit: usize) -> Result<Option<Relation>, IngestError> {
        Ok(self.sheet(table).map(|r| r.clone().head(limit)))
    }

    fn read(&self, table: &str, columns: &[String]) -> Result<Option<Relation>, IngestError> {
        Ok(self.sheet(table).map(|r| {
            if columns.is_empty() {
                r.clone()
            } else {
                r.project(columns)
            }
        }))
    }

    fn row_count(&self, table: &str) -> Option<usize> {
        self.sheet(table).map(Relation::len)
    }
}

/// Header row plus data rows, padded to the header width
fn range_to_relation<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> Relation {
    let Some(header) = rows.next() else {
        return Relation::default();
    };
    let columns = dedupe_headers(header.iter().map(|c| data_to_cell(c).display()));
    let width = columns.len();

    let data = rows
        .map(|row| {
            let mut cells: Vec<CellValue> = row.iter().take(width).map(data_to_cell).collect();
            cells.resize(width, CellValue::Null);
            cells
        })
        .collect();

    let mut relation = Relation::new(columns, data);
    relation.drop_empty_rows();
    relation
}

/// Workbook cell to cell value; integral floats become integers
fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::String(s) if s.trim().is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            CellValue::Integer(*f as i64)
        }
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        other => CellValue::Text(other.to_string()),
    }
}
