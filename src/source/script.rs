//! SQL script reader backed by a staging namespace

use once_cell::sync::Lazy;
use regex::Regex;

use super::TableReader;
use crate::convert::DialectTranslator;
use crate::destination::Destination;
use crate::error::IngestError;
use crate::execute::{ExecutionReport, TABLE_REF, unqualified_name};
use crate::models::Relation;
use crate::staging::StagingNamespace;

static CREATE_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\bCREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{TABLE_REF}"
    ))
    .unwrap()
});
static INSERT_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\bINSERT\s+(?:IGNORE\s+)?INTO\s+{TABLE_REF}")).unwrap()
});

/// Tables a script creates or inserts into, deduplicated ignoring case and sorted
pub fn script_table_candidates(script: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in CREATE_TARGET
        .captures_iter(script)
        .chain(INSERT_TARGET.captures_iter(script))
    {
        let name = unqualified_name(&caps[1]);
        if !name.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    }
    names.sort();
    names
}

/// Tables produced by running a script in a staging namespace.
///
/// The namespace lives exactly as long as the reader.
pub struct ScriptReader<'d, D: Destination + ?Sized> {
    namespace: StagingNamespace<'d, D>,
    candidates: Vec<String>,
    report: ExecutionReport,
}

impl<'d, D: Destination + ?Sized> ScriptReader<'d, D> {
    /// Translate a script for the destination and run it in a fresh namespace
    pub fn stage(destination: &'d D, script: &str) -> Result<Self, IngestError> {
        Self::stage_with_prefix(destination, script, crate::staging::STAGING_PREFIX)
    }

    /// Same as [`ScriptReader::stage`] with a custom namespace prefix
    pub fn stage_with_prefix(
        destination: &'d D,
        script: &str,
        prefix: &str,
    ) -> Result<Self, IngestError> {
        let translated = DialectTranslator::new(destination.dialect()).translate(script);
        let namespace = StagingNamespace::create_with_prefix(destination, prefix)?;
        let report = namespace.populate(&translated.script);
        Ok(Self {
            namespace,
            candidates: script_table_candidates(script),
            report,
        })
    }

    /// Outcome of running the script
    pub fn report(&self) -> &ExecutionReport {
        &self.report
    }

    pub fn namespace(&self) -> &StagingNamespace<'d, D> {
        &self.namespace
    }

    /// Drop the namespace now, reporting a cleanup failure
    pub fn close(self) -> Result<(), IngestError> {
        self.namespace.close()
    }
}

impl<D: Destination + ?Sized> TableReader for ScriptReader<'_, D> {
    /// Declared targets plus anything else the script left in the namespace
    fn table_names(&self) -> Result<Vec<String>, IngestError> {
        let mut names = self.candidates.clone();
        for table in self.namespace.tables()? {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&table)) {
                names.push(table);
            }
        }
        names.sort();
        Ok(names)
    }

    fn sample(&self, table: &str, limit: usize) -> Result<Option<Relation>, IngestError> {
        self.namespace.sample(table, limit)
    }

    fn read(&self, table: &str, columns: &[String]) -> Result<Option<Relation>, IngestError> {
        self.namespace.read(table, columns)
    }
}
