//! Integration tests for MySQL script conversion and analysis

use tabload::convert::{
    CompatibilityLevel, DialectTranslator, RewriteRule, TargetDialect, analyze, preview_conversion,
    split_statements, translate,
};

const MYSQLDUMP: &str = r#"/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;
LOCK TABLES `accounts` WRITE;
DROP TABLE IF EXISTS `accounts`;
CREATE TABLE `accounts` (
  `id` bigint(20) unsigned NOT NULL AUTO_INCREMENT,
  `email` varchar(255) NOT NULL,
  `bio` longtext,
  `avatar` mediumblob,
  `score` double DEFAULT '0',
  `updated` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
  PRIMARY KEY (`id`),
  UNIQUE KEY `uq_email` (`email`),
  KEY `idx_score` (`score`) USING BTREE
) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;
INSERT INTO `accounts` (`id`, `email`) VALUES (1,'a@x.io'),(2,'it''s `fine`; really');
UNLOCK TABLES;
"#;

#[test]
fn test_sqlserver_dump_conversion() {
    let result = DialectTranslator::new(TargetDialect::SqlServer).translate(MYSQLDUMP);
    let sql = &result.script;

    assert!(sql.contains("CREATE TABLE [accounts]"));
    assert!(sql.contains("[id] bigint NOT NULL IDENTITY(1,1)"));
    assert!(sql.contains("nvarchar(255)"));
    assert!(sql.contains("[bio] nvarchar(max)"));
    assert!(sql.contains("[avatar] varbinary(max)"));
    assert!(sql.contains("[score] float"));
    assert!(sql.contains("CONSTRAINT [uq_email] UNIQUE ([email])"));
    assert!(!sql.contains("idx_score"));
    assert!(!sql.contains("ENGINE"));
    assert!(!sql.contains("unsigned"));
    assert!(!sql.contains("ON UPDATE"));
    assert!(!sql.contains("/*!"));
    assert!(sql.contains("-- LOCK TABLES"));

    // expanded rows keep the column list; literal contents untouched
    assert!(sql.contains("INSERT INTO [accounts] ([id], [email]) VALUES (1,'a@x.io');"));
    assert!(sql.contains("INSERT INTO [accounts] ([id], [email]) VALUES (2,'it''s `fine`; really');"));

    assert!(result.fired(RewriteRule::InsertExpansion));
    assert!(result.fired(RewriteRule::SessionDirectives));
    assert!(!result.fired(RewriteRule::ProcedureBodies));
}

#[test]
fn test_translation_is_deterministic() {
    assert_eq!(translate(MYSQLDUMP), translate(MYSQLDUMP));
}

#[test]
fn test_duckdb_dump_conversion() {
    let sql = DialectTranslator::new(TargetDialect::DuckDb)
        .translate(MYSQLDUMP)
        .script;
    assert!(sql.contains("CREATE TABLE \"accounts\""));
    assert!(!sql.contains("IDENTITY"));
    assert!(!sql.contains("AUTO_INCREMENT"));
    assert!(sql.contains("VALUES (1,'a@x.io'),(2,'it''s `fine`; really');"));
}

#[test]
fn test_statements_after_translation() {
    let sql = translate(MYSQLDUMP);
    let statements = split_statements(&sql);
    assert_eq!(statements.len(), 4);
    assert!(statements[0].starts_with("DROP TABLE IF EXISTS [accounts]"));
    assert!(statements[1].starts_with("CREATE TABLE [accounts]"));
}

#[test]
fn test_procedure_conversion() {
    let script = "DELIMITER $$\n\
        CREATE PROCEDURE bump(IN n INT)\n\
        BEGIN\n\
          UPDATE counters SET value = value + n;\n\
          SELECT value FROM counters;\n\
        END$$\n\
        DELIMITER ;\n";
    let result = DialectTranslator::new(TargetDialect::SqlServer).translate(script);
    assert!(!result.script.contains("DELIMITER"));
    assert!(result.script.contains("END;"));
    assert!(result.fired(RewriteRule::ProcedureBodies));
    assert_eq!(split_statements(&result.script).len(), 1);
}

#[test]
fn test_compatibility_levels() {
    let upsert = analyze("INSERT INTO t (a) VALUES (1) ON DUPLICATE KEY UPDATE a = 2;");
    assert_eq!(upsert.level, CompatibilityLevel::Low);

    let plain = analyze("CREATE TABLE t (id int);");
    assert_eq!(plain.level, CompatibilityLevel::High);
    assert!(plain.problems.is_empty());
}

#[test]
fn test_preview_conversion_with_analysis() {
    let preview = preview_conversion(MYSQLDUMP, TargetDialect::SqlServer, true, 40);
    assert!(preview.truncated);
    assert!(preview.needs_conversion);
    assert_eq!(preview.converted.chars().count(), 43);
    assert!(preview.compatibility.is_some());
    assert!(!preview.changes.is_empty());
}
