//! Wizard state carried between ingestion calls

use serde::{Deserialize, Serialize};

use crate::source::{CandidateTable, SourceDescriptor};

/// Position in the ingestion wizard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    SelectSource,
    SelectTables,
    Done,
}

/// State of one ingestion, owned by the caller between requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionSession {
    pub step: WizardStep,
    pub source: Option<SourceDescriptor>,
    pub discovered_tables: Vec<CandidateTable>,
}

impl IngestionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the discovered tables, in discovery order
    pub fn table_names(&self) -> Vec<&str> {
        self.discovered_tables
            .iter()
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Discovered table by name, ignoring case
    pub fn table(&self, name: &str) -> Option<&CandidateTable> {
        self.discovered_tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_serde() {
        let session = IngestionSession {
            step: WizardStep::SelectTables,
            source: None,
            discovered_tables: vec![CandidateTable {
                name: "people".into(),
                columns: vec!["name".into()],
                row_count: Some(3),
            }],
        };
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"select_tables\""));

        let back: IngestionSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.step, WizardStep::SelectTables);
        assert_eq!(back.table_names(), vec!["people"]);
        assert!(back.table("PEOPLE").is_some());
    }
}
