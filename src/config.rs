//! Loader configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::convert::{DEFAULT_PREVIEW_CHARS, TargetDialect};
use crate::error::IngestError;
use crate::sniff::DEFAULT_RAW_LINE_LIMIT;
use crate::staging::STAGING_PREFIX;

/// Settings shared by the pipeline and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Destination database path (in-memory when absent)
    pub database: Option<PathBuf>,
    /// Dialect used by `convert` and `analyze`
    pub dialect: TargetDialect,
    /// Rows shown in a table preview
    pub preview_rows: usize,
    /// Characters kept per previewed value
    pub display_width: usize,
    /// Row cap for raw-line framing of undelimited text
    pub raw_line_limit: usize,
    /// Characters of converted script kept for display
    pub conversion_preview_chars: usize,
    /// Prefix of staging namespace names
    pub staging_prefix: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            database: None,
            dialect: TargetDialect::default(),
            preview_rows: 25,
            display_width: 120,
            raw_line_limit: DEFAULT_RAW_LINE_LIMIT,
            conversion_preview_chars: DEFAULT_PREVIEW_CHARS,
            staging_prefix: STAGING_PREFIX.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, IngestError> {
        let config: Self =
            toml::from_str(text).map_err(|e| IngestError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.display_width == 0 {
            return Err(IngestError::InvalidConfig(
                "display_width must be greater than 0".to_string(),
            ));
        }
        if self.staging_prefix.is_empty()
            || !self
                .staging_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(IngestError::InvalidConfig(format!(
                "staging_prefix must be non-empty and contain only letters, digits and '_': {}",
                self.staging_prefix
            )));
        }
        Ok(())
    }

    /// Set the database path
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }

    /// Set the conversion dialect
    pub fn with_dialect(mut self, dialect: TargetDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the number of preview rows
    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Set the preview value width
    pub fn with_display_width(mut self, width: usize) -> Self {
        self.display_width = width;
        self
    }

    /// Set the raw-line cap
    pub fn with_raw_line_limit(mut self, limit: usize) -> Self {
        self.raw_line_limit = limit;
        self
    }

    /// Set the staging namespace prefix
    pub fn with_staging_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.staging_prefix = prefix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.preview_rows, 25);
        assert_eq!(config.display_width, 120);
        assert_eq!(config.raw_line_limit, 1000);
        assert_eq!(config.conversion_preview_chars, 50_000);
        assert_eq!(config.staging_prefix, "__stage_");
        assert!(config.database.is_none());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = LoaderConfig::from_toml_str(
            r#"
database = "warehouse.duckdb"
dialect = "duckdb"
preview_rows = 10
"#,
        )
        .unwrap();
        assert_eq!(config.database, Some(PathBuf::from("warehouse.duckdb")));
        assert_eq!(config.dialect, TargetDialect::DuckDb);
        assert_eq!(config.preview_rows, 10);
        assert_eq!(config.display_width, 120);
    }

    #[test]
    fn test_invalid_prefix() {
        let err = LoaderConfig::from_toml_str("staging_prefix = \"bad-prefix\"").unwrap_err();
        assert!(matches!(err, IngestError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabload.toml");
        std::fs::write(&path, "display_width = 40\n").unwrap();
        let config = LoaderConfig::load(&path).unwrap();
        assert_eq!(config.display_width, 40);
        let config = config
            .with_preview_rows(5)
            .with_database("x.duckdb")
            .with_dialect(TargetDialect::DuckDb)
            .with_raw_line_limit(10)
            .with_staging_prefix("__tmp_");
        assert_eq!(config.preview_rows, 5);
        assert_eq!(config.raw_line_limit, 10);
        assert_eq!(config.staging_prefix, "__tmp_");
        assert!(config.validate().is_ok());
    }
}
