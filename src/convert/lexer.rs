//! Literal-aware segmentation of SQL text
//!
//! The rewrite passes only touch plain code; string literals, quoted
//! identifiers and comments are carried through verbatim.

use regex::{Captures, Regex};
use std::ops::Range;

/// Kind of a contiguous run of SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    SingleQuoted,
    DoubleQuoted,
    Backtick,
    Bracket,
    LineComment,
    BlockComment,
}

impl SegmentKind {
    pub fn is_comment(self) -> bool {
        matches!(self, SegmentKind::LineComment | SegmentKind::BlockComment)
    }
}

/// Literal escaping rules to scan with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Backslash escapes inside quoted strings
    MySql,
    /// Only doubled quotes escape
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
}

/// Split SQL text into code, literal, identifier and comment segments.
///
/// Unterminated literals and comments run to the end of the input.
pub fn segments(sql: &str, flavor: Flavor) -> Vec<Segment<'_>> {
    let bytes = sql.as_bytes();
    let backslash = flavor == Flavor::MySql;
    let mut out = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let (kind, end) = match bytes[i] {
            b'\'' => (SegmentKind::SingleQuoted, scan_quoted(bytes, i, b'\'', backslash)),
            b'"' => (SegmentKind::DoubleQuoted, scan_quoted(bytes, i, b'"', backslash)),
            b'`' => (SegmentKind::Backtick, scan_quoted(bytes, i, b'`', false)),
            b'[' => (SegmentKind::Bracket, scan_quoted(bytes, i, b']', false)),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |p| i + p);
                (SegmentKind::LineComment, end)
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = sql[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                (SegmentKind::BlockComment, end)
            }
            _ => {
                i += 1;
                continue;
            }
        };

        if code_start < i {
            out.push(Segment {
                kind: SegmentKind::Code,
                text: &sql[code_start..i],
            });
        }
        out.push(Segment {
            kind,
            text: &sql[i..end],
        });
        i = end;
        code_start = end;
    }

    if code_start < bytes.len() {
        out.push(Segment {
            kind: SegmentKind::Code,
            text: &sql[code_start..],
        });
    }
    out
}

/// Index just past the closing delimiter of a quoted run starting at `open`
fn scan_quoted(bytes: &[u8], open: usize, close: u8, backslash: bool) -> usize {
    let mut j = open + 1;
    while j < bytes.len() {
        let b = bytes[j];
        if backslash && b == b'\\' {
            j += 2;
            continue;
        }
        if b == close {
            if close != b']' && bytes.get(j + 1) == Some(&close) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

/// Rewrite only the code segments, leaving everything else verbatim
pub fn map_code(sql: &str, flavor: Flavor, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(sql.len());
    for segment in segments(sql, flavor) {
        if segment.kind == SegmentKind::Code {
            out.push_str(&f(segment.text));
        } else {
            out.push_str(segment.text);
        }
    }
    out
}

/// Byte ranges of the code segments of `sql`
pub fn code_ranges(sql: &str, flavor: Flavor) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut offset = 0;
    for segment in segments(sql, flavor) {
        let end = offset + segment.text.len();
        if segment.kind == SegmentKind::Code {
            ranges.push(offset..end);
        }
        offset = end;
    }
    ranges
}

/// Whether byte `pos` lies in one of `ranges`
pub fn in_code(ranges: &[Range<usize>], pos: usize) -> bool {
    ranges.iter().any(|r| r.contains(&pos))
}

/// Replace the matches of `re` that start in code.
///
/// A match may run on into quoted identifiers (`INSERT INTO "t"`); matches
/// starting inside a literal or comment are kept verbatim.
pub fn replace_in_code(
    sql: &str,
    flavor: Flavor,
    re: &Regex,
    mut f: impl FnMut(&Captures) -> String,
) -> String {
    let code = code_ranges(sql, flavor);
    re.replace_all(sql, |caps: &Captures| match caps.get(0) {
        Some(m) if in_code(&code, m.start()) => f(caps),
        Some(m) => m.as_str().to_string(),
        None => String::new(),
    })
    .into_owned()
}

/// Split a script into statements on semicolons outside literals and comments.
///
/// Comments before a statement are dropped, comment-only and blank segments
/// are skipped, and the terminating semicolon is not included.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_content = false;

    let mut finish = |current: &mut String, has_content: &mut bool| {
        if *has_content {
            statements.push(current.trim().to_string());
        }
        current.clear();
        *has_content = false;
    };

    for segment in segments(script, Flavor::Standard) {
        match segment.kind {
            SegmentKind::Code => {
                let mut parts = segment.text.split(';');
                if let Some(first) = parts.next() {
                    push_code(&mut current, &mut has_content, first);
                }
                for part in parts {
                    finish(&mut current, &mut has_content);
                    push_code(&mut current, &mut has_content, part);
                }
            }
            kind if kind.is_comment() => {
                if has_content {
                    current.push_str(segment.text);
                }
            }
            _ => {
                current.push_str(segment.text);
                has_content = true;
            }
        }
    }
    finish(&mut current, &mut has_content);
    statements
}

fn push_code(current: &mut String, has_content: &mut bool, text: &str) {
    if !text.trim().is_empty() {
        *has_content = true;
    }
    if *has_content {
        current.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str, flavor: Flavor) -> Vec<SegmentKind> {
        segments(sql, flavor).iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_segments_cover_input() {
        let sql = "SELECT 'a;b', `c`, [d] -- tail\n/* block */ FROM t";
        let joined: String = segments(sql, Flavor::MySql).iter().map(|s| s.text).collect();
        assert_eq!(joined, sql);
        assert_eq!(
            kinds(sql, Flavor::MySql),
            vec![
                SegmentKind::Code,
                SegmentKind::SingleQuoted,
                SegmentKind::Code,
                SegmentKind::Backtick,
                SegmentKind::Code,
                SegmentKind::Bracket,
                SegmentKind::Code,
                SegmentKind::LineComment,
                SegmentKind::Code,
                SegmentKind::BlockComment,
                SegmentKind::Code,
            ]
        );
    }

    #[test]
    fn test_backslash_escapes_depend_on_flavor() {
        let sql = r"'it\'s' x";
        let mysql = segments(sql, Flavor::MySql);
        assert_eq!(mysql[0].text, r"'it\'s'");
        let standard = segments(r"'C:\' x", Flavor::Standard);
        assert_eq!(standard[0].text, r"'C:\'");
    }

    #[test]
    fn test_doubled_quotes_stay_inside_literal() {
        let segs = segments("'O''Brien' y", Flavor::Standard);
        assert_eq!(segs[0].text, "'O''Brien'");
    }

    #[test]
    fn test_map_code_skips_literals() {
        let out = map_code("text 'text' `text`", Flavor::MySql, |c| c.replace("text", "X"));
        assert_eq!(out, "X 'text' `text`");
    }

    #[test]
    fn test_replace_in_code_skips_literals() {
        let re = Regex::new(r#"(?i)\bINSERT\s+INTO\s+("\w+"|\w+)"#).unwrap();
        let out = replace_in_code(
            "INSERT INTO \"t\" VALUES ('insert into box'); -- insert into note",
            Flavor::Standard,
            &re,
            |caps| format!("INSERT INTO s.{}", &caps[1]),
        );
        assert_eq!(
            out,
            "INSERT INTO s.\"t\" VALUES ('insert into box'); -- insert into note"
        );
        assert_eq!(code_ranges("a 'b' c", Flavor::Standard), vec![0..2, 5..7]);
    }

    #[test]
    fn test_split_statements() {
        let script = "-- header\nCREATE TABLE a (x int);\n\nINSERT INTO a VALUES ('1;2');\n-- only a comment;\n ; SELECT 1";
        let statements = split_statements(script);
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE a (x int)",
                "INSERT INTO a VALUES ('1;2')",
                "SELECT 1",
            ]
        );
    }
}
