//! MySQL script conversion
//!
//! Rewrites MySQL-flavored scripts (phpMyAdmin and mysqldump exports) into a
//! target dialect with a fixed, ordered list of textual rewrite rules. The
//! translation is best-effort; [`compat`] reports what it cannot fix.

pub mod compat;
pub mod dialect;
pub mod lexer;
pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use compat::{
    CompatibilityIssue, CompatibilityLevel, CompatibilityReport, ParseIssue, Severity, analyze,
    check_statements,
};
pub use dialect::TargetDialect;
pub use lexer::split_statements;
pub use rules::RewriteRule;

/// Default display cap for converted scripts
pub const DEFAULT_PREVIEW_CHARS: usize = 50_000;

/// Translated script plus the rules that changed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub script: String,
    pub dialect: TargetDialect,
    pub applied: Vec<RewriteRule>,
}

impl TranslationResult {
    /// Descriptions of every rule that fired, in application order
    pub fn change_summary(&self) -> Vec<&'static str> {
        self.applied.iter().map(RewriteRule::description).collect()
    }

    pub fn fired(&self, rule: RewriteRule) -> bool {
        self.applied.contains(&rule)
    }
}

/// Applies the rewrite rules for one target dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct DialectTranslator {
    dialect: TargetDialect,
}

impl DialectTranslator {
    pub fn new(dialect: TargetDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> TargetDialect {
        self.dialect
    }

    /// Run every rule in order, then lay the script out one statement per block
    pub fn translate(&self, script: &str) -> TranslationResult {
        let mut current = script.to_string();
        let mut applied = Vec::new();

        for rule in RewriteRule::ALL {
            let next = rule.apply(&current, self.dialect);
            if next != current {
                debug!(rule = ?rule, dialect = %self.dialect, "Rewrite rule applied");
                applied.push(rule);
                current = next;
            }
        }

        TranslationResult {
            script: rules::statement_layout(&current),
            dialect: self.dialect,
            applied,
        }
    }
}

/// Translate a MySQL script to SQL Server syntax
pub fn translate(script: &str) -> String {
    DialectTranslator::new(TargetDialect::SqlServer)
        .translate(script)
        .script
}

/// Whether a script shows MySQL-only markers (backticks or an ENGINE clause)
pub fn needs_conversion(script: &str) -> bool {
    script.contains('`') || script.to_ascii_uppercase().contains("ENGINE=")
}

/// Display-ready conversion output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionPreview {
    pub dialect: TargetDialect,
    /// Converted script, truncated for display
    pub converted: String,
    pub truncated: bool,
    pub original_chars: usize,
    pub converted_chars: usize,
    pub needs_conversion: bool,
    pub changes: Vec<String>,
    pub compatibility: Option<CompatibilityReport>,
    pub syntax_issues: Vec<ParseIssue>,
}

/// Translate a script and package it for display.
///
/// With `analyze`, the original script is scored for portability and every
/// translated statement is parsed in the target dialect.
pub fn preview_conversion(
    script: &str,
    dialect: TargetDialect,
    analyze_script: bool,
    max_chars: usize,
) -> ConversionPreview {
    let result = DialectTranslator::new(dialect).translate(script);
    let converted_chars = result.script.chars().count();
    let truncated = converted_chars > max_chars;

    let (compatibility, syntax_issues) = if analyze_script {
        (
            Some(analyze(script)),
            check_statements(&result.script, dialect),
        )
    } else {
        (None, Vec::new())
    };

    ConversionPreview {
        dialect,
        converted: truncate_chars(&result.script, max_chars),
        truncated,
        original_chars: script.chars().count(),
        converted_chars,
        needs_conversion: needs_conversion(script),
        changes: result
            .change_summary()
            .into_iter()
            .map(str::to_string)
            .collect(),
        compatibility,
        syntax_issues,
    }
}

/// Cut text to `max` characters, appending `...` when anything was removed
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_translation() {
        let out = translate("CREATE TABLE `t` (`id` int(11) AUTO_INCREMENT) ENGINE=InnoDB;");
        assert!(out.contains("[t]"));
        assert!(out.contains("[id]"));
        assert!(out.contains(" int "));
        assert!(out.contains("IDENTITY(1,1)"));
        assert!(!out.contains("ENGINE="));
        assert!(!out.contains('`'));
    }

    #[test]
    fn test_multi_row_insert_expansion() {
        let out = translate("INSERT INTO [t] (a,b) VALUES (1,2),(3,4);");
        let statements = split_statements(&out);
        assert_eq!(statements.len(), 2);
        for statement in &statements {
            assert!(statement.starts_with("INSERT INTO [t] (a,b) VALUES"));
        }
        assert!(statements[0].ends_with("(1,2)"));
        assert!(statements[1].ends_with("(3,4)"));
    }

    #[test]
    fn test_phpmyadmin_export() {
        let dump = "SET SQL_MODE = \"NO_AUTO_VALUE_ON_ZERO\";\n\
            START TRANSACTION;\n\
            SET time_zone = \"+00:00\";\n\
            \n\
            -- Table structure for `users`\n\
            CREATE TABLE `users` (\n\
            \x20 `id` int(11) NOT NULL,\n\
            \x20 `name` varchar(100) DEFAULT NULL,\n\
            \x20 `bio` text\n\
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;\n\
            \n\
            INSERT INTO `users` (`id`, `name`, `bio`) VALUES\n\
            (1, 'Ana', 'It\\'s me'),\n\
            (2, 'Luis', NULL);\n\
            COMMIT;\n";
        let result = DialectTranslator::new(TargetDialect::SqlServer).translate(dump);
        let out = &result.script;

        assert!(out.starts_with("-- SET SQL_MODE"));
        assert!(out.contains("BEGIN TRANSACTION;"));
        assert!(out.contains("-- Table structure for `users`\nCREATE TABLE [users] ("));
        assert!(out.contains("[name] nvarchar(100) DEFAULT NULL,"));
        assert!(out.contains("[bio] nvarchar(max)\n);"));
        assert!(out.contains("VALUES (1, 'Ana', 'It''s me');"));
        assert!(out.contains("VALUES (2, 'Luis', NULL);"));
        assert!(result.fired(RewriteRule::InsertExpansion));
        assert!(result.fired(RewriteRule::TypeMappings));
        assert!(!result.fired(RewriteRule::ProcedureBodies));
    }

    #[test]
    fn test_duckdb_translation() {
        let sql = "CREATE TABLE `t` (`id` int(11) NOT NULL AUTO_INCREMENT, `v` longtext) ENGINE=InnoDB;\nINSERT INTO `t` VALUES (1,'a'),(2,'b');";
        let out = DialectTranslator::new(TargetDialect::DuckDb).translate(sql).script;
        assert!(out.contains("CREATE TABLE \"t\" (\"id\" int NOT NULL, \"v\" text);"));
        assert!(out.contains("INSERT INTO \"t\" VALUES (1,'a'),(2,'b');"));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let sql = "CREATE TABLE `a` (`x` int(3));";
        assert_eq!(translate(sql), translate(sql));
    }

    #[test]
    fn test_change_summary_follows_rule_order() {
        let result = DialectTranslator::default().translate("CREATE TABLE `a` (`x` int(3)) ENGINE=MyISAM;");
        assert_eq!(
            result.applied,
            vec![
                RewriteRule::IdentifierQuoting,
                RewriteRule::TableOptions,
                RewriteRule::TypeMappings
            ]
        );
        assert_eq!(result.change_summary().len(), 3);
    }

    #[test]
    fn test_needs_conversion() {
        assert!(needs_conversion("CREATE TABLE `a` (x int);"));
        assert!(needs_conversion("CREATE TABLE a (x int) engine=InnoDB;"));
        assert!(!needs_conversion("CREATE TABLE a (x int);"));
    }

    #[test]
    fn test_preview_truncates() {
        let sql = "INSERT INTO t VALUES (1);\n".repeat(100);
        let preview = preview_conversion(&sql, TargetDialect::SqlServer, false, 40);
        assert!(preview.truncated);
        assert_eq!(preview.converted.chars().count(), 43);
        assert!(preview.converted.ends_with("..."));
        assert!(preview.compatibility.is_none());
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("ñandú", 3), "ñan...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
