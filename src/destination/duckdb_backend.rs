//! Embedded DuckDB destination

use chrono::{DateTime, NaiveTime, Utc};
use duckdb::types::{TimeUnit, Value};
use tracing::{debug, warn};

use super::{Destination, WriteMode};
use crate::convert::TargetDialect;
use crate::error::DestinationError;
use crate::models::{CellValue, ColumnType, Relation};

/// Schema holding tables written without a namespace
const DEFAULT_SCHEMA: &str = "main";

/// DuckDB-backed destination store
pub struct DuckDbDestination {
    conn: duckdb::Connection,
    path: Option<String>,
}

impl DuckDbDestination {
    /// Open or create a database at the given path
    pub fn open(path: &str) -> Result<Self, DestinationError> {
        let conn = duckdb::Connection::open(path)?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database
    pub fn memory() -> Result<Self, DestinationError> {
        let conn = duckdb::Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Get the database path (if not in-memory)
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Row count of a table in the default namespace
    pub fn row_count(&self, table: &str) -> Result<i64, DestinationError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.dialect().quote_identifier(table)
        );
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    fn write_rows(
        &self,
        target: &str,
        relation: &Relation,
        types: &[ColumnType],
        mode: WriteMode,
    ) -> Result<usize, DestinationError> {
        let dialect = self.dialect();
        let column_defs = relation
            .columns
            .iter()
            .zip(types)
            .map(|(name, t)| format!("{} {}", dialect.quote_identifier(name), dialect.column_type(*t)))
            .collect::<Vec<_>>()
            .join(", ");

        match mode {
            WriteMode::Replace => {
                self.conn
                    .execute_batch(&format!("DROP TABLE IF EXISTS {target}"))?;
                self.conn
                    .execute_batch(&format!("CREATE TABLE {target} ({column_defs})"))?;
            }
            WriteMode::Append => {
                self.conn
                    .execute_batch(&format!("CREATE TABLE IF NOT EXISTS {target} ({column_defs})"))?;
            }
        }

        let column_list = relation
            .columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; relation.columns.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO {target} ({column_list}) VALUES ({placeholders})"
        ))?;

        for row in &relation.rows {
            let values = types
                .iter()
                .enumerate()
                .map(|(i, t)| to_duckdb_value(row.get(i).unwrap_or(&CellValue::Null), *t));
            stmt.execute(duckdb::params_from_iter(values))?;
        }
        Ok(relation.rows.len())
    }
}

impl Destination for DuckDbDestination {
    fn dialect(&self) -> TargetDialect {
        TargetDialect::DuckDb
    }

    fn execute(&self, sql: &str) -> Result<(), DestinationError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn query(&self, sql: &str) -> Result<Relation, DestinationError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        // Get column names after query execution
        let column_count = rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                rows.as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut relation = Relation::empty(columns);
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value: Value = row.get(i)?;
                cells.push(from_duckdb_value(value));
            }
            relation.rows.push(cells);
        }
        Ok(relation)
    }

    fn create_namespace(&self, name: &str) -> Result<(), DestinationError> {
        let sql = format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            self.dialect().quote_identifier(name)
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    fn drop_namespace(&self, name: &str) -> Result<(), DestinationError> {
        let sql = format!(
            "DROP SCHEMA IF EXISTS {} CASCADE",
            self.dialect().quote_identifier(name)
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    fn namespace_exists(&self, name: &str) -> Result<bool, DestinationError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.schemata WHERE schema_name = ?",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_tables(&self, namespace: Option<&str>) -> Result<Vec<String>, DestinationError> {
        let schema = namespace.unwrap_or(DEFAULT_SCHEMA);
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = ? ORDER BY table_name",
        )?;
        let rows = stmt.query_map([schema], |row| row.get::<_, String>(0))?;
        let mut tables = Vec::new();
        for row in rows {
            tables.push(row?);
        }
        Ok(tables)
    }

    fn table_exists(&self, namespace: Option<&str>, table: &str) -> Result<bool, DestinationError> {
        let schema = namespace.unwrap_or(DEFAULT_SCHEMA);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND lower(table_name) = lower(?)",
            duckdb::params![schema, table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn write_relation(
        &self,
        table: &str,
        relation: &Relation,
        mode: WriteMode,
    ) -> Result<usize, DestinationError> {
        if relation.columns.is_empty() {
            return Err(DestinationError::EmptyRelation(table.to_string()));
        }

        let target = self.dialect().quote_identifier(table);
        let types = relation.column_types();

        self.conn.execute_batch("BEGIN TRANSACTION")?;
        match self.write_rows(&target, relation, &types, mode) {
            Ok(written) => {
                self.conn.execute_batch("COMMIT")?;
                debug!(table = %table, rows = written, mode = ?mode, "Relation written");
                Ok(written)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!(table = %table, error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

fn to_duckdb_value(cell: &CellValue, column_type: ColumnType) -> Value {
    match (cell, column_type) {
        (CellValue::Null, _) => Value::Null,
        (cell, ColumnType::Text) => Value::Text(cell.to_string()),
        (CellValue::Integer(n), ColumnType::Float) => Value::Double(*n as f64),
        (CellValue::Integer(n), _) => Value::BigInt(*n),
        (CellValue::Float(x), _) => Value::Double(*x),
        (CellValue::Bool(b), _) => Value::Boolean(*b),
        (CellValue::Text(s), _) => Value::Text(s.clone()),
    }
}

fn from_duckdb_value(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Boolean(b) => CellValue::Bool(b),
        Value::TinyInt(n) => CellValue::Integer(n.into()),
        Value::SmallInt(n) => CellValue::Integer(n.into()),
        Value::Int(n) => CellValue::Integer(n.into()),
        Value::BigInt(n) => CellValue::Integer(n),
        Value::UTinyInt(n) => CellValue::Integer(n.into()),
        Value::USmallInt(n) => CellValue::Integer(n.into()),
        Value::UInt(n) => CellValue::Integer(n.into()),
        Value::UBigInt(n) => i64::try_from(n)
            .map(CellValue::Integer)
            .unwrap_or_else(|_| CellValue::Text(n.to_string())),
        Value::HugeInt(n) => i64::try_from(n)
            .map(CellValue::Integer)
            .unwrap_or_else(|_| CellValue::Text(n.to_string())),
        Value::UHugeInt(n) => i64::try_from(n)
            .map(CellValue::Integer)
            .unwrap_or_else(|_| CellValue::Text(n.to_string())),
        Value::Float(f) => CellValue::Float(f.into()),
        Value::Double(f) => CellValue::Float(f),
        Value::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(CellValue::Float)
            .unwrap_or_else(|_| CellValue::Text(d.to_string())),
        Value::Text(s) | Value::Enum(s) => CellValue::Text(s),
        Value::Blob(bytes) => CellValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Date32(days) => temporal_text(
            DateTime::<Utc>::from_timestamp(i64::from(days) * 86_400, 0).map(|dt| dt.date_naive().to_string()),
            days,
        ),
        Value::Timestamp(unit, value) => temporal_text(
            DateTime::<Utc>::from_timestamp_micros(unit.to_micros(value)).map(|dt| dt.naive_utc().to_string()),
            value,
        ),
        Value::Time64(unit, value) => temporal_text(time_of_day(unit, value).map(|t| t.to_string()), value),
        other => CellValue::Text(format!("{:?}", other)),
    }
}

/// ISO-8601 text of a date/time value; the raw count when out of range
fn temporal_text(formatted: Option<String>, raw: impl ToString) -> CellValue {
    CellValue::Text(formatted.unwrap_or_else(|| raw.to_string()))
}

fn time_of_day(unit: TimeUnit, value: i64) -> Option<NaiveTime> {
    let micros = unit.to_micros(value);
    let secs = u32::try_from(micros.div_euclid(1_000_000)).ok()?;
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Relation {
        Relation::new(
            vec!["name".into(), "age".into()],
            vec![
                vec![CellValue::from("Ana"), CellValue::Integer(30)],
                vec![CellValue::from("Luis"), CellValue::Null],
            ],
        )
    }

    #[test]
    fn test_write_replace_and_query() {
        let db = DuckDbDestination::memory().unwrap();
        assert_eq!(db.write_relation("people", &people(), WriteMode::Replace).unwrap(), 2);
        assert_eq!(db.write_relation("people", &people(), WriteMode::Replace).unwrap(), 2);
        assert_eq!(db.row_count("people").unwrap(), 2);

        let back = db.query("SELECT name, age FROM people ORDER BY name").unwrap();
        assert_eq!(back.columns, vec!["name", "age"]);
        assert_eq!(back.rows[0], vec![CellValue::from("Ana"), CellValue::Integer(30)]);
        assert_eq!(back.rows[1][1], CellValue::Null);
    }

    #[test]
    fn test_write_append() {
        let db = DuckDbDestination::memory().unwrap();
        db.write_relation("people", &people(), WriteMode::Append).unwrap();
        db.write_relation("people", &people(), WriteMode::Append).unwrap();
        assert_eq!(db.row_count("people").unwrap(), 4);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let db = DuckDbDestination::memory().unwrap();
        db.write_relation("people", &people(), WriteMode::Replace).unwrap();
        let wrong = Relation::new(
            vec!["name".into(), "age".into()],
            vec![vec![CellValue::from("Sofia"), CellValue::from("unknown")]],
        );
        // age is BIGINT in the existing table
        assert!(db.write_relation("people", &wrong, WriteMode::Append).is_err());
        assert_eq!(db.row_count("people").unwrap(), 2);
    }

    #[test]
    fn test_empty_relation_rejected() {
        let db = DuckDbDestination::memory().unwrap();
        let err = db
            .write_relation("nothing", &Relation::default(), WriteMode::Replace)
            .unwrap_err();
        assert_eq!(err, DestinationError::EmptyRelation("nothing".into()));
    }

    #[test]
    fn test_temporal_and_unsigned_values() {
        let db = DuckDbDestination::memory().unwrap();
        db.execute(
            "CREATE TABLE ev (day DATE, at TIMESTAMP, t TIME, n UBIGINT, h HUGEINT, u UTINYINT);\n\
             INSERT INTO ev VALUES ('2024-03-15', '2024-03-15 10:30:00', '08:05:09', 7, 12, 3);",
        )
        .unwrap();

        let back = db.query("SELECT * FROM ev").unwrap();
        assert_eq!(
            back.rows[0],
            vec![
                CellValue::from("2024-03-15"),
                CellValue::from("2024-03-15 10:30:00"),
                CellValue::from("08:05:09"),
                CellValue::Integer(7),
                CellValue::Integer(12),
                CellValue::Integer(3),
            ]
        );
    }

    #[test]
    fn test_namespaces() {
        let db = DuckDbDestination::memory().unwrap();
        db.create_namespace("__stage_test").unwrap();
        assert!(db.namespace_exists("__stage_test").unwrap());
        db.execute("CREATE TABLE \"__stage_test\".\"Items\" (id INTEGER)").unwrap();
        assert_eq!(db.list_tables(Some("__stage_test")).unwrap(), vec!["Items"]);
        assert!(db.table_exists(Some("__stage_test"), "items").unwrap());
        assert!(!db.table_exists(None, "items").unwrap());

        db.drop_namespace("__stage_test").unwrap();
        assert!(!db.namespace_exists("__stage_test").unwrap());
        db.drop_namespace("__stage_test").unwrap();
    }
}
