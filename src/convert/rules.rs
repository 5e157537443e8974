//! Ordered MySQL rewrite rules
//!
//! Each rule is a plain `&str -> String` transform. Rules that change types,
//! options or keywords only touch code segments (see [`super::lexer`]).

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::dialect::TargetDialect;
use super::lexer::{Flavor, SegmentKind, code_ranges, in_code, map_code, replace_in_code, segments};

/// A tagged rewrite pass, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteRule {
    SessionDirectives,
    TransactionKeyword,
    StringLiterals,
    IdentifierQuoting,
    TableOptions,
    TypeMappings,
    AutoIncrement,
    KeyClauses,
    InsertExpansion,
    ProcedureBodies,
    ProcedureClosers,
}

impl RewriteRule {
    /// All rules in the order they are applied
    pub const ALL: [RewriteRule; 11] = [
        RewriteRule::SessionDirectives,
        RewriteRule::TransactionKeyword,
        RewriteRule::StringLiterals,
        RewriteRule::IdentifierQuoting,
        RewriteRule::TableOptions,
        RewriteRule::TypeMappings,
        RewriteRule::AutoIncrement,
        RewriteRule::KeyClauses,
        RewriteRule::InsertExpansion,
        RewriteRule::ProcedureBodies,
        RewriteRule::ProcedureClosers,
    ];

    /// Apply this rule to a script
    pub fn apply(&self, sql: &str, dialect: TargetDialect) -> String {
        match self {
            RewriteRule::SessionDirectives => session_directives(sql),
            RewriteRule::TransactionKeyword => transaction_keyword(sql),
            RewriteRule::StringLiterals => string_literals(sql),
            RewriteRule::IdentifierQuoting => identifier_quoting(sql, dialect),
            RewriteRule::TableOptions => table_options(sql),
            RewriteRule::TypeMappings => type_mappings(sql, dialect),
            RewriteRule::AutoIncrement => auto_increment(sql, dialect),
            RewriteRule::KeyClauses => key_clauses(sql),
            RewriteRule::InsertExpansion => insert_expansion(sql, dialect),
            RewriteRule::ProcedureBodies => procedure_bodies(sql),
            RewriteRule::ProcedureClosers => procedure_closers(sql),
        }
    }

    /// Human-readable change description
    pub fn description(&self) -> &'static str {
        match self {
            RewriteRule::SessionDirectives => "Session settings (SQL_MODE, time_zone, SET NAMES) commented out",
            RewriteRule::TransactionKeyword => "START TRANSACTION replaced with BEGIN TRANSACTION",
            RewriteRule::StringLiterals => "String literals rewritten to standard single-quote escaping",
            RewriteRule::IdentifierQuoting => "Backtick identifiers requoted for the target",
            RewriteRule::TableOptions => "ENGINE, CHARSET and COLLATE table options removed",
            RewriteRule::TypeMappings => "Data types mapped (int(n), varchar(n), text, unsigned)",
            RewriteRule::AutoIncrement => "AUTO_INCREMENT columns converted",
            RewriteRule::KeyClauses => "UNIQUE KEY and secondary index definitions rewritten",
            RewriteRule::InsertExpansion => "Multi-row INSERT statements split into one row each",
            RewriteRule::ProcedureBodies => "Stored routine bodies and DELIMITER directives adjusted",
            RewriteRule::ProcedureClosers => "Routine END markers normalized",
        }
    }
}

static SESSION_SET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(SET\s+(?:SQL_MODE|time_zone|NAMES|FOREIGN_KEY_CHECKS|UNIQUE_CHECKS|AUTOCOMMIT|@@?\w+)\b[^;\n]*;)",
    )
    .unwrap()
});
static LOCK_TABLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*((?:UN)?LOCK\s+TABLES\b[^;\n]*;)").unwrap());
static VERSIONED_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*!\d*.*?\*/[ \t]*;?").unwrap());

fn session_directives(sql: &str) -> String {
    let sql = VERSIONED_COMMENT.replace_all(sql, "");
    let sql = SESSION_SET.replace_all(&sql, "-- $1");
    LOCK_TABLES.replace_all(&sql, "-- $1").into_owned()
}

static START_TRANSACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSTART\s+TRANSACTION\b").unwrap());

fn transaction_keyword(sql: &str) -> String {
    map_code(sql, Flavor::MySql, |code| {
        START_TRANSACTION
            .replace_all(code, "BEGIN TRANSACTION")
            .into_owned()
    })
}

/// MySQL string literals to standard form: double-quoted strings become
/// single-quoted, and backslash escapes for quotes and backslashes are undone.
fn string_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    for segment in segments(sql, Flavor::MySql) {
        match segment.kind {
            SegmentKind::SingleQuoted | SegmentKind::DoubleQuoted => {
                out.push_str(&standard_literal(segment.text))
            }
            _ => out.push_str(segment.text),
        }
    }
    out
}

fn standard_literal(literal: &str) -> String {
    let Some(quote) = literal.chars().next() else {
        return String::new();
    };
    if literal.len() < 2 || !literal.ends_with(quote) {
        return literal.to_string();
    }
    let inner = &literal[1..literal.len() - 1];

    let mut out = String::with_capacity(literal.len());
    out.push('\'');
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push_str("''"),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '\'' => {
                if quote == '\'' {
                    chars.next();
                }
                out.push_str("''");
            }
            '"' if quote == '"' => {
                chars.next();
                out.push('"');
            }
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

fn identifier_quoting(sql: &str, dialect: TargetDialect) -> String {
    let mut out = String::with_capacity(sql.len());
    for segment in segments(sql, Flavor::Standard) {
        if segment.kind == SegmentKind::Backtick && segment.text.len() >= 2 {
            let inner = segment.text[1..segment.text.len() - 1].replace("``", "`");
            out.push_str(&dialect.quote_identifier(&inner));
        } else {
            out.push_str(segment.text);
        }
    }
    out
}

static TABLE_OPTIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\s*\bENGINE\s*=\s*\w+",
        r"(?i)\s*\b(?:DEFAULT\s+)?(?:CHARSET|CHARACTER\s+SET)\s*=?\s*\w+",
        r"(?i)\s*\b(?:DEFAULT\s+)?COLLATE\s*=?\s*\w+",
        r"(?i)\s*\bAUTO_INCREMENT\s*=\s*\d+",
        r"(?i)\s*\bROW_FORMAT\s*=\s*\w+",
        r"(?i)\s+ON\s+UPDATE\s+CURRENT_TIMESTAMP(?:\s*\(\s*\d*\s*\))?",
        r"(?i)\s+USING\s+(?:BTREE|HASH)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static SPACE_BEFORE_SEMICOLON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\)[ \t]+;").unwrap());

fn table_options(sql: &str) -> String {
    map_code(sql, Flavor::Standard, |code| {
        let mut code = code.to_string();
        for re in TABLE_OPTIONS.iter() {
            code = re.replace_all(&code, "").into_owned();
        }
        SPACE_BEFORE_SEMICOLON.replace_all(&code, ");").into_owned()
    })
}

static INT_WIDTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(tinyint|smallint|mediumint|bigint|integer|int)\s*\(\s*\d+\s*\)").unwrap()
});
static MEDIUMINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmediumint\b").unwrap());
static UNSIGNED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+(?:unsigned|zerofill)\b").unwrap());
static VARCHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bvarchar\s*\(\s*(\d+)\s*\)").unwrap());
static TEXT_TYPES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:tiny|medium|long)?text\b").unwrap());
static DOUBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bdouble(?:\s+precision)?(?:\s*\(\s*\d+\s*,\s*\d+\s*\))?").unwrap()
});
static BLOB_TYPES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:tiny|medium|long)?blob\b").unwrap());

fn type_mappings(sql: &str, dialect: TargetDialect) -> String {
    let (varchar, text, double, blob) = match dialect {
        TargetDialect::SqlServer => ("nvarchar(${1})", "nvarchar(max)", "float", "varbinary(max)"),
        TargetDialect::DuckDb => ("varchar(${1})", "text", "double", "blob"),
    };
    map_code(sql, Flavor::Standard, |code| {
        let code = INT_WIDTH.replace_all(code, |caps: &Captures| {
            if caps[1].eq_ignore_ascii_case("mediumint") {
                "int".to_string()
            } else {
                caps[1].to_string()
            }
        });
        let code = MEDIUMINT.replace_all(&code, "int");
        let code = UNSIGNED.replace_all(&code, "");
        let code = VARCHAR.replace_all(&code, varchar);
        let code = TEXT_TYPES.replace_all(&code, text);
        let code = DOUBLE.replace_all(&code, double);
        BLOB_TYPES.replace_all(&code, blob).into_owned()
    })
}

static AUTO_INCREMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bAUTO_INCREMENT\b").unwrap());
static AUTO_INCREMENT_WITH_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\bAUTO_INCREMENT\b").unwrap());

fn auto_increment(sql: &str, dialect: TargetDialect) -> String {
    map_code(sql, Flavor::Standard, |code| match dialect.identity_marker() {
        Some(marker) => AUTO_INCREMENT.replace_all(code, marker).into_owned(),
        None => AUTO_INCREMENT_WITH_SPACE.replace_all(code, "").into_owned(),
    })
}

const IDENT: &str = r#"(?:\[[^\]]+\]|"[^"]+"|\w+)"#;

static UNIQUE_NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\bUNIQUE\s+(?:KEY|INDEX)\s+({IDENT})\s*\(")).unwrap()
});
static UNIQUE_UNNAMED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bUNIQUE\s+(?:KEY|INDEX)\s*\(").unwrap());
static SECONDARY_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i),\s*(?:FULLTEXT\s+|SPATIAL\s+)?(?:KEY|INDEX)\s+{IDENT}\s*\((?:[^()]|\([^()]*\))*\)"
    ))
    .unwrap()
});

fn key_clauses(sql: &str) -> String {
    let sql = replace_in_code(sql, Flavor::Standard, &UNIQUE_NAMED, |caps| {
        format!("CONSTRAINT {} UNIQUE (", &caps[1])
    });
    let sql = replace_in_code(&sql, Flavor::Standard, &UNIQUE_UNNAMED, |_| {
        "UNIQUE (".to_string()
    });
    replace_in_code(&sql, Flavor::Standard, &SECONDARY_INDEX, |_| String::new())
}

static INSERT_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\bINSERT\s+INTO\s+({IDENT}(?:\.{IDENT})?)\s*(\([^()]*\))?\s*VALUES\s*"
    ))
    .unwrap()
});

fn insert_expansion(sql: &str, dialect: TargetDialect) -> String {
    if !dialect.expands_multi_row_insert() {
        return sql.to_string();
    }

    let code = code_ranges(sql, Flavor::Standard);
    let mut out = String::with_capacity(sql.len());
    let mut pos = 0;
    while let Some(caps) = INSERT_HEAD.captures_at(sql, pos) {
        let Some(head) = caps.get(0) else { break };
        if !in_code(&code, head.start()) {
            out.push_str(&sql[pos..head.end()]);
            pos = head.end();
            continue;
        }
        match scan_value_tuples(&sql[head.end()..]) {
            Some((tuples, consumed)) if tuples.len() > 1 => {
                out.push_str(&sql[pos..head.start()]);
                let table = &caps[1];
                let columns = caps
                    .get(2)
                    .map(|m| format!(" {}", m.as_str()))
                    .unwrap_or_default();
                let rows: Vec<String> = tuples
                    .iter()
                    .map(|tuple| format!("INSERT INTO {table}{columns} VALUES ({tuple});"))
                    .collect();
                out.push_str(&rows.join("\n"));
                pos = head.end() + consumed;
            }
            _ => {
                out.push_str(&sql[pos..head.end()]);
                pos = head.end();
            }
        }
    }
    out.push_str(&sql[pos..]);
    out
}

/// Parse `(..), (..) ;` returning each tuple body and the bytes consumed.
///
/// Returns `None` when the values list is followed by anything other than a
/// terminator (for example an upsert clause).
fn scan_value_tuples(text: &str) -> Option<(Vec<&str>, usize)> {
    let bytes = text.as_bytes();
    let mut tuples = Vec::new();
    let mut i = 0;
    loop {
        i = skip_whitespace(bytes, i);
        if bytes.get(i) != Some(&b'(') {
            return None;
        }
        let close = matching_paren(bytes, i)?;
        tuples.push(&text[i + 1..close]);
        i = skip_whitespace(bytes, close + 1);
        match bytes.get(i) {
            Some(b',') => i += 1,
            Some(b';') => return Some((tuples, i + 1)),
            None => return Some((tuples, i)),
            Some(_) => return None,
        }
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}

fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(j);
                }
            }
            b'\'' => {
                j += 1;
                while j < bytes.len() {
                    if bytes[j] == b'\'' {
                        if bytes.get(j + 1) == Some(&b'\'') {
                            j += 1;
                        } else {
                            break;
                        }
                    }
                    j += 1;
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

static ROUTINE_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)(\bCREATE\s+(?:DEFINER\s*=\s*\S+\s+)?(?:PROCEDURE|FUNCTION)\b.*?\bBEGIN\b)(.*?)(\bEND\b)",
    )
    .unwrap()
});
static DELIMITER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*DELIMITER[ \t]+\S+[ \t]*(?:\r?\n|$)").unwrap());

fn procedure_bodies(sql: &str) -> String {
    let sql = ROUTINE_BODY.replace_all(sql, |caps: &Captures| {
        format!("{}{}{}", &caps[1], caps[2].replace(';', ""), &caps[3])
    });
    DELIMITER_LINE.replace_all(&sql, "").into_owned()
}

static END_CUSTOM_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)\bEND[ \t]*(?:\$\$|//|;;)[ \t]*$").unwrap());
static END_SPACED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bEND[ \t]+;").unwrap());

fn procedure_closers(sql: &str) -> String {
    let sql = END_CUSTOM_DELIMITER.replace_all(sql, "END;");
    END_SPACED.replace_all(&sql, "END;").into_owned()
}

/// A source line for layout purposes. Newlines inside literals and block
/// comments do not end a line.
struct LayoutLine {
    text: String,
    /// Last code on the line is a semicolon
    terminated: bool,
    /// Nothing but comments
    comment: bool,
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<LayoutLine>,
    text: String,
    terminated: bool,
    has_code: bool,
}

impl LineBuilder {
    fn push(&mut self, text: &str, kind: SegmentKind) {
        self.text.push_str(text);
        let trimmed = text.trim_end();
        if trimmed.is_empty() || kind.is_comment() {
            return;
        }
        self.has_code = true;
        self.terminated = kind == SegmentKind::Code && trimmed.ends_with(';');
    }

    fn end_line(&mut self) {
        let text = self.text.trim();
        if !text.is_empty() {
            self.lines.push(LayoutLine {
                text: text.to_string(),
                terminated: self.terminated,
                comment: !self.has_code,
            });
        }
        self.text.clear();
        self.terminated = false;
        self.has_code = false;
    }
}

fn layout_lines(sql: &str) -> Vec<LayoutLine> {
    let mut builder = LineBuilder::default();
    for segment in segments(sql, Flavor::Standard) {
        if segment.kind != SegmentKind::Code {
            builder.push(segment.text, segment.kind);
            continue;
        }
        let mut parts = segment.text.split('\n');
        if let Some(first) = parts.next() {
            builder.push(first, SegmentKind::Code);
        }
        for part in parts {
            builder.end_line();
            builder.push(part, SegmentKind::Code);
        }
    }
    builder.end_line();
    builder.lines
}

/// Re-split into statements: lines are trimmed, blank lines dropped, comment
/// lines attached to the statement that follows them, and statements joined
/// by a blank line. Literal contents are never touched.
pub fn statement_layout(sql: &str) -> String {
    let mut statements: Vec<String> = Vec::new();
    let mut preamble: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in layout_lines(sql) {
        if current.is_empty() && line.comment {
            preamble.push(line.text);
            continue;
        }
        current.push(line.text);
        if line.terminated {
            let mut block = std::mem::take(&mut preamble);
            block.append(&mut current);
            statements.push(block.join("\n"));
        }
    }

    if !preamble.is_empty() || !current.is_empty() {
        preamble.append(&mut current);
        statements.push(preamble.join("\n"));
    }
    statements.join("\n\n")
}
