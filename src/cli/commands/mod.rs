//! CLI command implementations

pub mod convert;
pub mod load;
pub mod process;

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::config::LoaderConfig;
use crate::destination::DuckDbDestination;

/// Load input content from file or stdin, decoded the way sources are:
/// invalid UTF-8 is replaced and a leading BOM dropped
pub(crate) fn load_input(input: &str) -> Result<String, CliError> {
    let bytes = if input == "-" {
        let mut content = Vec::new();
        std::io::stdin()
            .read_to_end(&mut content)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        content
    } else {
        let path = PathBuf::from(input);
        std::fs::read(&path).map_err(|e| CliError::FileReadError(path, e.to_string()))?
    };
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

/// Open the configured destination database, in memory when none is set
pub(crate) fn open_destination(config: &LoaderConfig) -> Result<DuckDbDestination, CliError> {
    match &config.database {
        Some(path) => Ok(DuckDbDestination::open(&path.display().to_string())?),
        None => Ok(DuckDbDestination::memory()?),
    }
}

/// Split a source path into its directory and file name
pub(crate) fn split_source_path(path: &Path) -> Result<(PathBuf, String), CliError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::InvalidArgument(format!("Not a file: {}", path.display())))?;
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, file_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_input_accepts_latin1() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xef\xbb\xbfINSERT INTO t VALUES ('caf\xe9');").unwrap();
        let text = load_input(file.path().to_str().unwrap()).unwrap();
        assert_eq!(text, "INSERT INTO t VALUES ('caf\u{fffd}');");
    }

    #[test]
    fn test_load_input_missing_file() {
        assert!(matches!(
            load_input("/nonexistent/dump.sql"),
            Err(CliError::FileReadError(..))
        ));
    }
}
