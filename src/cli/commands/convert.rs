//! CLI commands for script conversion and analysis

use crate::cli::commands::load_input;
use crate::cli::error::CliError;
use crate::cli::output::{format_compatibility, format_conversion, to_json};
use crate::convert::{TargetDialect, analyze, preview_conversion};

/// Arguments for the `convert` command
pub struct ConvertArgs {
    /// Script path, or `-` for stdin
    pub input: String,
    /// Target dialect
    pub dialect: TargetDialect,
    /// Also score compatibility and parse the output
    pub analyze: bool,
    /// Characters of converted script to print
    pub max_chars: usize,
    /// Print JSON instead of SQL
    pub json: bool,
}

/// Arguments for the `analyze` command
pub struct AnalyzeArgs {
    /// Script path, or `-` for stdin
    pub input: String,
    /// Print JSON instead of text
    pub json: bool,
}

/// Handle the `convert` command
pub fn handle_convert(args: &ConvertArgs) -> Result<(), CliError> {
    let script = load_input(&args.input)?;
    let preview = preview_conversion(&script, args.dialect, args.analyze, args.max_chars);

    if args.json {
        println!("{}", to_json(&preview)?);
    } else {
        print!("{}", format_conversion(&preview));
    }
    Ok(())
}

/// Handle the `analyze` command
pub fn handle_analyze(args: &AnalyzeArgs) -> Result<(), CliError> {
    let script = load_input(&args.input)?;
    let report = analyze(&script);

    if args.json {
        println!("{}", to_json(&report)?);
    } else {
        print!("{}", format_compatibility(&report));
    }
    Ok(())
}
