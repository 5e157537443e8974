//! Portability analysis of MySQL scripts

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlparser::dialect::{Dialect, DuckDbDialect, MsSqlDialect};
use sqlparser::parser::Parser;
use std::fmt;

use super::dialect::TargetDialect;
use super::lexer::split_statements;
use super::truncate_chars;

/// How much effort a construct takes to port
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Overall compatibility of a script with the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityLevel {
    High,
    Medium,
    Low,
}

impl CompatibilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityLevel::High => "high",
            CompatibilityLevel::Medium => "medium",
            CompatibilityLevel::Low => "low",
        }
    }
}

impl fmt::Display for CompatibilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected risky construct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityIssue {
    pub description: String,
    pub occurrences: usize,
    pub severity: Severity,
    pub recommendation: String,
}

/// Result of [`analyze`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub total_occurrences: usize,
    pub level: CompatibilityLevel,
    pub problems: Vec<CompatibilityIssue>,
    pub recommendations: Vec<String>,
}

struct RiskPattern {
    regex: Regex,
    description: &'static str,
    recommendation: &'static str,
    severity: Severity,
}

static RISK_PATTERNS: Lazy<Vec<RiskPattern>> = Lazy::new(|| {
    [
        (
            r"\bLIMIT\s+\d+",
            "LIMIT clause is not supported by SQL Server",
            "Replace LIMIT with TOP or OFFSET ... FETCH NEXT",
            Severity::High,
        ),
        (
            r"\bAUTO_INCREMENT\b",
            "AUTO_INCREMENT columns",
            "Use IDENTITY(1,1)",
            Severity::Medium,
        ),
        (
            r"\bENGINE\s*=",
            "Storage ENGINE clause",
            "Remove the ENGINE clause",
            Severity::Low,
        ),
        (
            r"\bUNSIGNED\b",
            "UNSIGNED numeric types",
            "Use a wider signed type or add a CHECK constraint",
            Severity::Medium,
        ),
        (
            r"\bNOW\(\)",
            "NOW() function",
            "Use GETDATE() or SYSDATETIME()",
            Severity::Low,
        ),
        (
            r"\bCONCAT_WS\(",
            "CONCAT_WS() function",
            "Use CONCAT with COALESCE for null handling",
            Severity::Medium,
        ),
        (
            r"\bON\s+DUPLICATE\s+KEY\s+UPDATE\b",
            "ON DUPLICATE KEY UPDATE upserts",
            "Rewrite as a MERGE statement",
            Severity::High,
        ),
        (
            r"\bGROUP_CONCAT\(",
            "GROUP_CONCAT() aggregate",
            "Use STRING_AGG()",
            Severity::Medium,
        ),
        (
            r"\bIFNULL\(",
            "IFNULL() function",
            "Use ISNULL() or COALESCE()",
            Severity::Low,
        ),
        (
            r"\bINSERT\s+IGNORE\b",
            "INSERT IGNORE statements",
            "Filter duplicates with NOT EXISTS or use MERGE",
            Severity::High,
        ),
    ]
    .into_iter()
    .map(|(pattern, description, recommendation, severity)| RiskPattern {
        regex: Regex::new(&format!("(?i){pattern}")).unwrap(),
        description,
        recommendation,
        severity,
    })
    .collect()
});

/// Score a script for portability.
///
/// Any high-severity problem makes the level `low`; more than two
/// medium-severity problem types, or more than five total occurrences, make
/// it `medium`; otherwise it is `high`.
pub fn analyze(script: &str) -> CompatibilityReport {
    let mut problems = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();
    let mut total_occurrences = 0;

    for pattern in RISK_PATTERNS.iter() {
        let occurrences = pattern.regex.find_iter(script).count();
        if occurrences == 0 {
            continue;
        }
        total_occurrences += occurrences;
        problems.push(CompatibilityIssue {
            description: pattern.description.to_string(),
            occurrences,
            severity: pattern.severity,
            recommendation: pattern.recommendation.to_string(),
        });
        if !recommendations.iter().any(|r| r == pattern.recommendation) {
            recommendations.push(pattern.recommendation.to_string());
        }
    }

    let high = problems.iter().filter(|p| p.severity == Severity::High).count();
    let medium = problems.iter().filter(|p| p.severity == Severity::Medium).count();
    let level = if high > 0 {
        CompatibilityLevel::Low
    } else if medium > 2 || total_occurrences > 5 {
        CompatibilityLevel::Medium
    } else {
        CompatibilityLevel::High
    };

    CompatibilityReport {
        total_occurrences,
        level,
        problems,
        recommendations,
    }
}

/// A translated statement the target parser rejects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub index: usize,
    pub statement: String,
    pub message: String,
}

/// Parse each statement with the target dialect's grammar and report the ones
/// that fail. Advisory only: engines accept constructs the parser does not.
pub fn check_statements(script: &str, dialect: TargetDialect) -> Vec<ParseIssue> {
    let grammar: Box<dyn Dialect> = match dialect {
        TargetDialect::SqlServer => Box::new(MsSqlDialect {}),
        TargetDialect::DuckDb => Box::new(DuckDbDialect {}),
    };

    split_statements(script)
        .into_iter()
        .enumerate()
        .filter_map(|(index, statement)| {
            Parser::parse_sql(grammar.as_ref(), &statement)
                .err()
                .map(|e| ParseIssue {
                    index,
                    statement: truncate_chars(&statement, 100),
                    message: e.to_string(),
                })
        })
        .collect()
}
