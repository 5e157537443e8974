//! Classification of database error messages

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable reason a statement failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Permission,
    ObjectNotFound,
    Syntax,
    TypeConversion,
    DuplicateObject,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::Permission => "permission",
            ErrorKind::ObjectNotFound => "object_not_found",
            ErrorKind::Syntax => "syntax",
            ErrorKind::TypeConversion => "type_conversion",
            ErrorKind::DuplicateObject => "duplicate_object",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Suggested remedy shown next to a failed statement
    pub fn suggestion(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "Check the destination credentials and that the login is enabled",
            ErrorKind::Permission => "Ask an administrator for the permissions this statement needs",
            ErrorKind::ObjectNotFound => {
                "Check that referenced tables and columns exist and are quoted for the target (brackets, not backticks)"
            }
            ErrorKind::Syntax => "Review MySQL-specific syntax the translation could not rewrite",
            ErrorKind::TypeConversion => "Check that values match the column types; the target converts types strictly",
            ErrorKind::DuplicateObject => "Drop the existing object first or load into a fresh namespace",
            ErrorKind::Unknown => "Review the statement and the raw error message",
        }
    }

    /// Warning added to an execution report when this kind occurs
    pub fn report_warning(&self) -> Option<&'static str> {
        match self {
            ErrorKind::Syntax => Some(
                "Syntax errors detected: the script may contain MySQL-specific syntax the target does not support",
            ),
            ErrorKind::TypeConversion => Some(
                "Type conversion errors detected: the target handles data types more strictly than MySQL",
            ),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static MESSAGE_PATTERNS: Lazy<Vec<(Regex, ErrorKind)>> = Lazy::new(|| {
    [
        (
            r"login failed|authentication failed|password authentication|access denied for user|login timeout expired",
            ErrorKind::Auth,
        ),
        (
            r"permission (?:was )?denied|not have permission|insufficient privileges|read-only",
            ErrorKind::Permission,
        ),
        (
            r"there is already an object named|already exists",
            ErrorKind::DuplicateObject,
        ),
        (
            r#"cannot find the object|invalid (?:column|object) name|is not a recognized built-in function name|does not exist|no such table|referenced column .* not found"#,
            ErrorKind::ObjectNotFound,
        ),
        (
            r"conversion failed|conversion error|could not convert|error converting data type|invalid input syntax",
            ErrorKind::TypeConversion,
        ),
        (
            r"incorrect syntax near|syntax error|parser error",
            ErrorKind::Syntax,
        ),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(&format!("(?i){pattern}")).unwrap(), kind))
    .collect()
});

static ERROR_CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)\berror (\d+)", r"\[(\d+)\]", r"(?i)error code (\d+)"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

/// Server error number embedded in a message, if any
pub fn extract_error_code(message: &str) -> Option<u32> {
    ERROR_CODE_PATTERNS
        .iter()
        .find_map(|re| re.captures(message))
        .and_then(|caps| caps[1].parse().ok())
}

fn kind_for_code(code: u32) -> Option<ErrorKind> {
    match code {
        18456 | 18452 | 4064 => Some(ErrorKind::Auth),
        229 | 262 | 297 => Some(ErrorKind::Permission),
        208 | 4060 => Some(ErrorKind::ObjectNotFound),
        2714 => Some(ErrorKind::DuplicateObject),
        102 | 156 => Some(ErrorKind::Syntax),
        245 | 8114 => Some(ErrorKind::TypeConversion),
        _ => None,
    }
}

/// Classify a raw database error message
pub fn classify_error(message: &str) -> ErrorKind {
    if let Some(kind) = extract_error_code(message).and_then(kind_for_code) {
        return kind;
    }
    MESSAGE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(message))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

/// Translate a raw database error into guidance for a person
pub fn friendly_message(message: &str) -> String {
    let code = extract_error_code(message);
    let lower = message.to_lowercase();

    let guidance = match code {
        Some(18456) => Some("Login failed: the user name or password is incorrect"),
        Some(18452) => Some("Login failed: the login is not associated with a trusted connection"),
        Some(4064) => Some("Cannot open the user's default database"),
        Some(4060) => Some("Cannot open the requested database; check that it exists"),
        Some(229) | Some(262) | Some(297) => {
            Some("Permission denied: the account lacks rights for this operation")
        }
        Some(208) => Some("Invalid object name: the table or view does not exist"),
        Some(2714) => Some("An object with this name already exists"),
        Some(156) | Some(102) => Some("Incorrect syntax near a keyword"),
        _ => None,
    }
    .or_else(|| {
        if lower.contains("login timeout expired") {
            Some("Connection timed out: check that the server is reachable")
        } else if lower.contains("network-related") {
            Some("Network error: the server could not be reached")
        } else if lower.contains("incorrect syntax") || lower.contains("syntax error") {
            Some("The statement has a syntax error")
        } else {
            None
        }
    });

    match (guidance, code) {
        (Some(text), Some(code)) => format!("{text} (error {code})"),
        (Some(text), None) => text.to_string(),
        // Classified messages are already specific; the kind's suggestion
        // travels separately.
        (None, _) if classify_error(message) != ErrorKind::Unknown => message.to_string(),
        (None, _) => format!("Database error: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlserver_messages() {
        assert_eq!(
            classify_error("Incorrect syntax near 'LIMIT'."),
            ErrorKind::Syntax
        );
        assert_eq!(
            classify_error("Invalid column name 'foo'."),
            ErrorKind::ObjectNotFound
        );
        assert_eq!(
            classify_error("Conversion failed when converting the varchar value 'x' to data type int."),
            ErrorKind::TypeConversion
        );
        assert_eq!(
            classify_error("There is already an object named 'users' in the database."),
            ErrorKind::DuplicateObject
        );
        assert_eq!(
            classify_error("'GROUP_CONCAT' is not a recognized built-in function name."),
            ErrorKind::ObjectNotFound
        );
    }

    #[test]
    fn test_duckdb_messages() {
        assert_eq!(
            classify_error("Catalog Error: Table with name nope does not exist!"),
            ErrorKind::ObjectNotFound
        );
        assert_eq!(
            classify_error("Parser Error: syntax error at or near \"SELEC\""),
            ErrorKind::Syntax
        );
        assert_eq!(
            classify_error("Conversion Error: Could not convert string 'abc' to INT32"),
            ErrorKind::TypeConversion
        );
        assert_eq!(
            classify_error("Catalog Error: Table with name \"t\" already exists!"),
            ErrorKind::DuplicateObject
        );
        assert_eq!(classify_error("something odd"), ErrorKind::Unknown);
    }

    #[test]
    fn test_error_codes_take_priority() {
        assert_eq!(extract_error_code("[Microsoft][SQL Server] [18456] Login failed"), Some(18456));
        assert_eq!(classify_error("Error 2714: name clash"), ErrorKind::DuplicateObject);
        assert_eq!(classify_error("error code 229"), ErrorKind::Permission);
    }

    #[test]
    fn test_friendly_message() {
        assert_eq!(
            friendly_message("Error 208: Invalid object name 'x'"),
            "Invalid object name: the table or view does not exist (error 208)"
        );
        assert_eq!(
            friendly_message("Login timeout expired"),
            "Connection timed out: check that the server is reachable"
        );
        assert_eq!(
            friendly_message("Catalog Error: Table with name x does not exist!"),
            "Catalog Error: Table with name x does not exist!"
        );
        assert_eq!(friendly_message("boom"), "Database error: boom");
    }
}
