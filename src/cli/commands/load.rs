//! CLI commands for discovering, previewing and loading sources

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cli::commands::{load_input, open_destination, split_source_path};
use crate::cli::error::CliError;
use crate::cli::output::{format_commit, format_execution, format_preview, format_tables, to_json};
use crate::config::LoaderConfig;
use crate::destination::WriteMode;
use crate::ingest::{CommitRequest, IngestPipeline, ProjectionSpec};
use crate::source::SourceDescriptor;

/// Arguments for the `tables` command
pub struct TablesArgs {
    pub source: PathBuf,
    pub json: bool,
}

/// Arguments for the `preview` command
pub struct PreviewArgs {
    pub source: PathBuf,
    pub table: String,
    pub json: bool,
}

/// Arguments for the `load` command
pub struct LoadArgs {
    pub source: PathBuf,
    /// Tables to load; every table when empty
    pub tables: Vec<String>,
    /// Columns to keep (applied to every table)
    pub columns: Vec<String>,
    pub row_start: Option<i64>,
    pub row_end: Option<i64>,
    /// `old=new` column renames
    pub renames: Vec<String>,
    /// Destination table (only with a single source table)
    pub target: Option<String>,
    pub mode: WriteMode,
    pub normalize: bool,
    pub json: bool,
}

/// Arguments for the `import-sql` command
pub struct ImportSqlArgs {
    /// Script path, or `-` for stdin
    pub input: String,
    pub json: bool,
}

fn acquire(source: &Path) -> Result<SourceDescriptor, CliError> {
    let (dir, file_name) = split_source_path(source)?;
    Ok(SourceDescriptor::from_path(&dir, &file_name)?)
}

/// Parse `old=new` pairs
fn parse_renames(pairs: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(from, to)| (from.trim().to_string(), to.trim().to_string()))
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!("Rename must be old=new: {}", pair))
                })
        })
        .collect()
}

/// Handle the `tables` command
pub fn handle_tables(args: &TablesArgs, config: &LoaderConfig) -> Result<(), CliError> {
    let source = acquire(&args.source)?;
    let db = open_destination(config)?;
    let tables = IngestPipeline::with_config(&db, config.clone()).discover(&source)?;

    if args.json {
        println!("{}", to_json(&tables)?);
    } else {
        print!("{}", format_tables(&tables));
    }
    Ok(())
}

/// Handle the `preview` command
pub fn handle_preview(args: &PreviewArgs, config: &LoaderConfig) -> Result<(), CliError> {
    let source = acquire(&args.source)?;
    let db = open_destination(config)?;
    let preview = IngestPipeline::with_config(&db, config.clone()).preview(&source, &args.table)?;

    if args.json {
        println!("{}", to_json(&preview)?);
    } else {
        print!("{}", format_preview(&preview));
    }
    Ok(())
}

/// Handle the `load` command
pub fn handle_load(args: &LoadArgs, config: &LoaderConfig) -> Result<(), CliError> {
    let renames = parse_renames(&args.renames)?;
    let source = acquire(&args.source)?;
    let db = open_destination(config)?;
    let pipeline = IngestPipeline::with_config(&db, config.clone());

    let tables = if args.tables.is_empty() {
        pipeline
            .discover(&source)?
            .into_iter()
            .map(|t| t.name)
            .collect()
    } else {
        args.tables.clone()
    };
    if args.target.is_some() && tables.len() > 1 {
        return Err(CliError::InvalidArgument(
            "--target needs exactly one source table".to_string(),
        ));
    }

    let specs = tables
        .into_iter()
        .map(|table| {
            let mut spec = ProjectionSpec::new(table)
                .with_columns(args.columns.iter().cloned())
                .with_rows(args.row_start, args.row_end)
                .with_mode(args.mode);
            spec.renames = renames.clone();
            spec.target_table = args.target.clone();
            spec
        })
        .collect();

    let request = CommitRequest::new(specs).with_normalize(args.normalize);
    let summary = pipeline.commit(&source, &request)?;

    if args.json {
        println!("{}", to_json(&summary)?);
    } else {
        print!("{}", format_commit(&summary));
    }
    Ok(())
}

/// Handle the `import-sql` command
pub fn handle_import_sql(args: &ImportSqlArgs, config: &LoaderConfig) -> Result<(), CliError> {
    let script = load_input(&args.input)?;
    let file_name = if args.input == "-" {
        "stdin.sql".to_string()
    } else {
        split_source_path(&PathBuf::from(&args.input))?.1
    };

    let db = open_destination(config)?;
    let (report, record) = IngestPipeline::with_config(&db, config.clone())
        .import_script(&file_name, &script);

    if args.json {
        println!("{}", to_json(&record)?);
    } else {
        print!("{}", format_execution(&report));
        println!("Status: {}", record.status.as_str());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_renames() {
        let renames = parse_renames(&["a = b".to_string(), "x=y".to_string()]).unwrap();
        assert_eq!(renames.get("a").map(String::as_str), Some("b"));
        assert_eq!(renames.len(), 2);
        assert!(parse_renames(&["nope".to_string()]).is_err());
    }
}
