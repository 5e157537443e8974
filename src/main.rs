//! tabload - load spreadsheets, delimited text and MySQL scripts into a database

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabload::cli::CliError;
use tabload::cli::commands::convert::{AnalyzeArgs, ConvertArgs, handle_analyze, handle_convert};
use tabload::cli::commands::load::{
    ImportSqlArgs, LoadArgs, PreviewArgs, TablesArgs, handle_import_sql, handle_load,
    handle_preview, handle_tables,
};
use tabload::cli::commands::process::{RunProcessArgs, handle_run_process};
use tabload::{LoaderConfig, TargetDialect, WriteMode};

/// Default log filter when RUST_LOG is unset
const DEFAULT_LOG_FILTER: &str = "tabload=info";

#[derive(Parser, Debug)]
#[command(name = "tabload", version, about)]
struct Cli {
    /// Loader configuration file (TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Destination DuckDB database; overrides the config file
    #[arg(long, short, global = true)]
    database: Option<PathBuf>,

    /// Print JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a MySQL script to another dialect
    Convert {
        /// Script path, or - for stdin
        input: String,
        /// Target dialect (sqlserver, duckdb)
        #[arg(long)]
        dialect: Option<TargetDialect>,
        /// Also report compatibility problems and unparsable statements
        #[arg(long)]
        analyze: bool,
        /// Characters of converted script to print
        #[arg(long)]
        max_chars: Option<usize>,
    },
    /// Score a MySQL script for portability
    Analyze {
        /// Script path, or - for stdin
        input: String,
    },
    /// List the tables a source contains
    Tables { source: PathBuf },
    /// Show the first rows of one table
    Preview { source: PathBuf, table: String },
    /// Load tables from a source into the destination
    Load {
        source: PathBuf,
        /// Source tables to load (all when omitted)
        #[arg(long = "table")]
        tables: Vec<String>,
        /// Columns to keep
        #[arg(long = "column")]
        columns: Vec<String>,
        /// First row, inclusive
        #[arg(long, allow_hyphen_values = true)]
        row_start: Option<i64>,
        /// Last row, exclusive
        #[arg(long, allow_hyphen_values = true)]
        row_end: Option<i64>,
        /// Column rename as old=new
        #[arg(long = "rename")]
        renames: Vec<String>,
        /// Destination table name
        #[arg(long)]
        target: Option<String>,
        /// Write mode (replace, append)
        #[arg(long, default_value = "replace")]
        mode: WriteMode,
        /// Normalize cell values before writing
        #[arg(long)]
        normalize: bool,
    },
    /// Convert a MySQL script and run it directly against the destination
    ImportSql {
        /// Script path, or - for stdin
        input: String,
    },
    /// Run a saved process definition
    RunProcess { process: PathBuf },
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<LoaderConfig> {
    let mut config = match &cli.config {
        Some(path) => LoaderConfig::load(path).map_err(|e| anyhow::anyhow!(e.user_message()))?,
        None => LoaderConfig::default(),
    };
    if let Some(database) = &cli.database {
        config = config.with_database(database);
    }
    Ok(config)
}

fn run(cli: Cli, config: LoaderConfig) -> Result<(), CliError> {
    let json = cli.json;
    match cli.command {
        Command::Convert {
            input,
            dialect,
            analyze,
            max_chars,
        } => handle_convert(&ConvertArgs {
            input,
            dialect: dialect.unwrap_or(config.dialect),
            analyze,
            max_chars: max_chars.unwrap_or(config.conversion_preview_chars),
            json,
        }),
        Command::Analyze { input } => handle_analyze(&AnalyzeArgs { input, json }),
        Command::Tables { source } => handle_tables(&TablesArgs { source, json }, &config),
        Command::Preview { source, table } => {
            handle_preview(&PreviewArgs { source, table, json }, &config)
        }
        Command::Load {
            source,
            tables,
            columns,
            row_start,
            row_end,
            renames,
            target,
            mode,
            normalize,
        } => handle_load(
            &LoadArgs {
                source,
                tables,
                columns,
                row_start,
                row_end,
                renames,
                target,
                mode,
                normalize,
                json,
            },
            &config,
        ),
        Command::ImportSql { input } => handle_import_sql(&ImportSqlArgs { input, json }, &config),
        Command::RunProcess { process } => {
            handle_run_process(&RunProcessArgs { process, json }, &config)
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Err(e) = run(cli, config) {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}
