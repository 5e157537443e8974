//! Column/row projection and renaming before commit

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::destination::WriteMode;
use crate::models::Relation;
use crate::normalize::normalize;

/// Longest destination table name
pub const MAX_TABLE_NAME_LEN: usize = 60;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// What to take from one source table and where to write it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSpec {
    /// Source table name
    pub table: String,
    /// Columns to keep, in output order; empty keeps every column
    pub columns: Vec<String>,
    /// First row, inclusive
    pub row_start: Option<i64>,
    /// Last row, exclusive
    pub row_end: Option<i64>,
    /// Source column name to output column name
    pub renames: BTreeMap<String, String>,
    /// Destination table; the source table name when absent
    pub target_table: Option<String>,
    pub mode: WriteMode,
}

impl ProjectionSpec {
    /// Select a whole table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rows(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.row_start = start;
        self.row_end = end;
        self
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    pub fn with_target(mut self, table: impl Into<String>) -> Self {
        self.target_table = Some(table.into());
        self
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sanitized destination table name
    pub fn destination_table(&self) -> String {
        sanitize_table_name(self.target_table.as_deref().unwrap_or(&self.table))
    }
}

/// Clamp a requested row range to `[0, len]` with `end >= start`
pub fn clamp_range(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let start = start.unwrap_or(0).clamp(0, len_i);
    let end = end.unwrap_or(len_i).clamp(start, len_i);
    // both bounds are within 0..=len
    (start as usize, end as usize)
}

/// Replace runs of non-word characters with `_`
pub fn sanitize_identifier(name: &str) -> String {
    let cleaned = NON_WORD.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "column".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Sanitize names and make them unique with `_2`, `_3`, ... suffixes
pub fn unique_column_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let base = sanitize_identifier(name.as_ref());
        let mut candidate = base.clone();
        let mut n = 2;
        while out.iter().any(|existing| existing.eq_ignore_ascii_case(&candidate)) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// Destination table name: word characters only, at most 60 characters
pub fn sanitize_table_name(name: &str) -> String {
    let cleaned = NON_WORD.replace_all(name.trim(), "_");
    let cleaned: String = cleaned.trim_matches('_').chars().take(MAX_TABLE_NAME_LEN).collect();
    if cleaned.is_empty() {
        "imported_table".to_string()
    } else {
        cleaned
    }
}

/// Apply a projection to a materialized relation.
///
/// Column selection, row range, renaming and optional normalization, in that
/// order. Selected columns missing from the relation are skipped.
pub fn project(relation: Relation, spec: &ProjectionSpec, normalize_cells: bool) -> Relation {
    let relation = if spec.columns.is_empty() {
        relation
    } else {
        relation.project(&spec.columns)
    };

    let (start, end) = clamp_range(spec.row_start, spec.row_end, relation.len());
    let mut relation = relation.slice(start, end);

    relation.columns = unique_column_names(
        relation
            .columns
            .iter()
            .map(|c| spec.renames.get(c).filter(|r| !r.trim().is_empty()).unwrap_or(c)),
    );

    if normalize_cells {
        relation.map_cells(normalize)
    } else {
        relation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn numbered(rows: usize) -> Relation {
        Relation::new(
            vec!["n".into()],
            (0..rows as i64).map(|i| vec![CellValue::Integer(i)]).collect(),
        )
    }

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(Some(-5), Some(10_000), 20), (0, 20));
        assert_eq!(clamp_range(None, None, 7), (0, 7));
        assert_eq!(clamp_range(Some(8), Some(3), 20), (8, 8));
        assert_eq!(clamp_range(Some(50), None, 20), (20, 20));
    }

    #[test]
    fn test_row_clamp_keeps_all_rows() {
        let spec = ProjectionSpec::new("t").with_rows(Some(-5), Some(10_000));
        assert_eq!(project(numbered(20), &spec, false).len(), 20);

        let spec = ProjectionSpec::new("t").with_rows(Some(5), Some(8));
        let out = project(numbered(20), &spec, false);
        assert_eq!(out.rows, vec![
            vec![CellValue::Integer(5)],
            vec![CellValue::Integer(6)],
            vec![CellValue::Integer(7)],
        ]);
    }

    #[test]
    fn test_unique_column_names() {
        let names = unique_column_names(["A", "A", "a b"]);
        assert_eq!(names, vec!["A", "A_2", "a_b"]);
        let word = Regex::new(r"^\w+$").unwrap();
        assert!(names.iter().all(|n| word.is_match(n)));
    }

    #[test]
    fn test_unique_column_names_case_and_symbols() {
        assert_eq!(
            unique_column_names(["id", "ID", "  ", "%"]),
            vec!["id", "ID_2", "column", "column_2"]
        );
    }

    #[test]
    fn test_sanitize_table_name() {
        assert_eq!(sanitize_table_name("Sales Q1 (draft)"), "Sales_Q1_draft");
        assert_eq!(sanitize_table_name(&"x".repeat(80)).len(), MAX_TABLE_NAME_LEN);
        assert_eq!(sanitize_table_name("***"), "imported_table");
    }

    #[test]
    fn test_project_renames_and_normalizes() {
        let relation = Relation::new(
            vec!["name".into(), "age".into(), "note".into()],
            vec![
                vec![CellValue::from("Ana"), CellValue::from("30"), CellValue::from("x")],
                vec![CellValue::from("Sofia"), CellValue::from("N/A"), CellValue::from("y")],
            ],
        );
        let spec = ProjectionSpec::new("people")
            .with_columns(["age", "name", "missing"])
            .with_rename("age", "Age (years)");
        let out = project(relation, &spec, true);

        assert_eq!(out.columns, vec!["Age_years", "name"]);
        assert_eq!(out.rows[0], vec![CellValue::Integer(30), CellValue::from("Ana")]);
        assert_eq!(out.rows[1][0], CellValue::Null);
    }

    #[test]
    fn test_destination_table() {
        assert_eq!(ProjectionSpec::new("my sheet").destination_table(), "my_sheet");
        assert_eq!(
            ProjectionSpec::new("a").with_target("final-table").destination_table(),
            "final_table"
        );
    }
}
