//! Delimiter sniffing for CSV and plain-text sources

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::debug;

use crate::models::{CellValue, Relation, dedupe_headers};

/// Candidate order for `.csv` files
pub const CSV_DELIMITERS: &[u8] = b",;\t|";

/// Candidate order for `.txt` files
pub const TXT_DELIMITERS: &[u8] = b"\t;|,";

/// Column name used when no delimiter splits the content
pub const RAW_LINE_COLUMN: &str = "content";

/// Default cap on raw-line fallback rows
pub const DEFAULT_RAW_LINE_LIMIT: usize = 1000;

/// Why a candidate delimiter was rejected
#[derive(Error, Debug)]
pub enum SniffError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// A record has more fields than the header
    #[error("line {line}: expected at most {expected} fields, found {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// Outcome of sniffing: the accepted delimiter (if any) and the parsed table
#[derive(Debug, Clone, PartialEq)]
pub struct SniffResult {
    pub delimiter: Option<u8>,
    pub relation: Relation,
}

impl SniffResult {
    /// Whether the content fell back to one-row-per-line framing
    pub fn is_raw_lines(&self) -> bool {
        self.delimiter.is_none()
    }
}

/// Try each candidate delimiter in order and keep the first that yields more
/// than one column. Falls back to a single `content` column of raw lines.
pub fn sniff(text: &str, candidates: &[u8]) -> SniffResult {
    sniff_with_limit(text, candidates, DEFAULT_RAW_LINE_LIMIT)
}

/// Same as [`sniff`] with an explicit cap on raw-line fallback rows
pub fn sniff_with_limit(text: &str, candidates: &[u8], raw_line_limit: usize) -> SniffResult {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    for &delimiter in candidates {
        match parse_delimited(text, delimiter) {
            Ok(relation) if relation.columns.len() > 1 => {
                debug!(
                    delimiter = %(delimiter as char).escape_default(),
                    columns = relation.columns.len(),
                    rows = relation.len(),
                    "Delimiter accepted"
                );
                return SniffResult {
                    delimiter: Some(delimiter),
                    relation,
                };
            }
            Ok(_) => {}
            Err(e) => {
                debug!(
                    delimiter = %(delimiter as char).escape_default(),
                    error = %e,
                    "Delimiter rejected"
                );
            }
        }
    }

    SniffResult {
        delimiter: None,
        relation: raw_lines(text, raw_line_limit),
    }
}

/// Parse text with a fixed delimiter; the first record is the header.
///
/// Short records are padded with nulls; a record longer than the header
/// rejects the delimiter.
pub fn parse_delimited(text: &str, delimiter: u8) -> Result<Relation, SniffError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = dedupe_headers(reader.headers()?.iter());
    let width = columns.len();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() > width {
            return Err(SniffError::TooManyFields {
                line: record.position().map_or(0, |p| p.line()),
                expected: width,
                found: record.len(),
            });
        }
        let mut row: Vec<CellValue> = record.iter().map(coerce_cell).collect();
        row.resize(width, CellValue::Null);
        rows.push(row);
    }

    let mut relation = Relation::new(columns, rows);
    relation.drop_empty_rows();
    Ok(relation)
}

/// Frame content as one trimmed, non-empty line per row
pub fn raw_lines(text: &str, limit: usize) -> Relation {
    let rows = text
        .lines()
        .take(limit)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| vec![CellValue::from(line)])
        .collect();
    Relation::new(vec![RAW_LINE_COLUMN.to_string()], rows)
}

/// Empty cells are null; exact numerals become numbers; everything else stays text
fn coerce_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return CellValue::Integer(n);
    }
    let numeric = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if numeric {
        if let Ok(x) = trimmed.parse::<f64>() {
            if x.is_finite() {
                return CellValue::Float(x);
            }
        }
    }
    CellValue::Text(raw.to_string())
}
