//! CLI module for the tabload binary

pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
