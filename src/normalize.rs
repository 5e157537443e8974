//! Cell normalization heuristics applied at commit time

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::CellValue;

/// Leading optional sign followed by digits
static LEADING_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+").unwrap());

/// Text tokens treated as missing values (compared case-insensitively)
const NULL_TOKENS: &[&str] = &["n/a", "na", "none", "null"];

/// Normalize a single cell.
///
/// Non-text values pass through. Text is trimmed; empty text and null tokens
/// become `Null`; text starting with an integer becomes that integer
/// (`"15 days"` becomes `15`). Anything else is returned untrimmed.
pub fn normalize(value: CellValue) -> CellValue {
    let CellValue::Text(text) = value else {
        return value;
    };

    let trimmed = text.trim();
    if trimmed.is_empty() || NULL_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t)) {
        return CellValue::Null;
    }

    if let Some(m) = LEADING_INTEGER.find(trimmed) {
        if let Ok(n) = m.as_str().parse::<i64>() {
            return CellValue::Integer(n);
        }
    }

    CellValue::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_tokens() {
        for token in ["", "   ", "N/A", "na", "None", "NULL"] {
            assert_eq!(normalize(CellValue::from(token)), CellValue::Null, "{token:?}");
        }
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(normalize(CellValue::from(" 15 days")), CellValue::Integer(15));
        assert_eq!(normalize(CellValue::from("-4")), CellValue::Integer(-4));
        assert_eq!(normalize(CellValue::from("+8kg")), CellValue::Integer(8));
        assert_eq!(normalize(CellValue::from("3.75")), CellValue::Integer(3));
    }

    #[test]
    fn test_other_text_untouched() {
        assert_eq!(normalize(CellValue::from("  abc ")), CellValue::from("  abc "));
        assert_eq!(normalize(CellValue::from("nan")), CellValue::from("nan"));
    }

    #[test]
    fn test_non_text_passthrough() {
        assert_eq!(normalize(CellValue::Float(2.5)), CellValue::Float(2.5));
        assert_eq!(normalize(CellValue::Bool(true)), CellValue::Bool(true));
        assert_eq!(normalize(CellValue::Null), CellValue::Null);
    }

    #[test]
    fn test_overflowing_digits_keep_text() {
        let huge = "99999999999999999999999 units";
        assert_eq!(normalize(CellValue::from(huge)), CellValue::from(huge));
    }

    #[test]
    fn test_idempotent() {
        for input in ["15 days", "n/a", " x ", "007", ""] {
            let once = normalize(CellValue::from(input));
            assert_eq!(normalize(once.clone()), once);
        }
    }
}
