//! Tabular data model shared by readers, the executor and destinations

pub mod cell;
pub mod relation;

pub use cell::CellValue;
pub use relation::{ColumnType, Relation, dedupe_headers};
