//! In-memory tabular relation

use serde::{Deserialize, Serialize};

use super::cell::CellValue;

/// Storage type inferred for a relation column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ColumnType {
    /// Infer the narrowest type that holds every non-null value.
    ///
    /// All-null columns are text. Integers widen to float when mixed with
    /// floats; anything mixed with text (or booleans mixed with numbers) is text.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let mut current: Option<ColumnType> = None;
        for value in values {
            let observed = match value {
                CellValue::Null => continue,
                CellValue::Bool(_) => ColumnType::Boolean,
                CellValue::Integer(_) => ColumnType::Integer,
                CellValue::Float(_) => ColumnType::Float,
                CellValue::Text(_) => return ColumnType::Text,
            };
            current = Some(match (current, observed) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::Integer), ColumnType::Float)
                | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
                _ => return ColumnType::Text,
            });
        }
        current.unwrap_or(ColumnType::Text)
    }
}

/// Ordered columns plus rows aligned with them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Relation {
    /// Create a relation from columns and rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Create a relation with columns and no rows
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Keep only the named columns, in the given order. Unknown names are skipped.
    pub fn project(&self, columns: &[String]) -> Relation {
        let indexes: Vec<(usize, &String)> = columns
            .iter()
            .filter_map(|name| self.column_index(name).map(|i| (i, name)))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indexes
                    .iter()
                    .map(|(i, _)| row.get(*i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Relation {
            columns: indexes.into_iter().map(|(_, n)| n.clone()).collect(),
            rows,
        }
    }

    /// Rows `[start, end)`; bounds must already be clamped
    pub fn slice(mut self, start: usize, end: usize) -> Relation {
        let end = end.min(self.rows.len());
        let start = start.min(end);
        self.rows.truncate(end);
        self.rows.drain(..start);
        self
    }

    /// Keep at most `limit` leading rows
    pub fn head(mut self, limit: usize) -> Relation {
        self.rows.truncate(limit);
        self
    }

    /// Remove rows whose every cell is blank
    pub fn drop_empty_rows(&mut self) {
        self.rows.retain(|row| !row.iter().all(CellValue::is_blank));
    }

    /// Apply a function to every cell
    pub fn map_cells(mut self, f: impl Fn(CellValue) -> CellValue) -> Relation {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                *cell = f(std::mem::take(cell));
            }
        }
        self
    }

    /// Inferred type of every column
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len())
            .map(|i| ColumnType::infer(self.rows.iter().filter_map(|row| row.get(i))))
            .collect()
    }

    /// Values of one column
    pub fn column_values(&self, name: &str) -> Option<Vec<&CellValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|row| row.get(index)).collect())
    }
}

/// Make header names usable as column names.
///
/// Blank headers become `Unnamed: <i>`; repeated names get `.1`, `.2`, ...
pub fn dedupe_headers<I, S>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: Vec<String> = Vec::new();
    for (i, header) in headers.into_iter().enumerate() {
        let header = header.as_ref().trim();
        let base = if header.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            header.to_string()
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        seen.push(name);
    }
    seen
}
