use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Cell;

/// Plain decimal literal: optional sign, digits with an optional fraction
/// (either side of the point may be empty but not both), optional exponent.
static DECIMAL_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid decimal pattern")
});

/// Trims surrounding whitespace and removes every double-quote character.
pub fn clean_field(raw: &str) -> String {
    raw.trim().replace('"', "").trim().to_string()
}

pub fn is_null_token(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("na")
}

/// Finite decimal value of `value`, if the whole string is one.
pub fn parse_decimal(value: &str) -> Option<f64> {
    if !DECIMAL_LITERAL.is_match(value) {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Types an already-cleaned field.
pub fn infer_cell(value: &str) -> Cell {
    if is_null_token(value) {
        Cell::Null
    } else if let Some(n) = parse_decimal(value) {
        Cell::Number(n)
    } else {
        Cell::Text(value.to_string())
    }
}

/// Cleans then types one raw field.
pub fn parse_field(raw: &str) -> Cell {
    infer_cell(&clean_field(raw))
}

/// File name with its last extension removed.
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_tokens_are_case_insensitive() {
        for v in ["", "null", "NULL", "Null", "na", "NA", "nA"] {
            assert_eq!(parse_field(v), Cell::Null, "{v:?} should be null");
        }
        assert_eq!(parse_field("  \"NA\" "), Cell::Null);
    }

    #[test]
    fn decimal_literals_become_numbers() {
        assert_eq!(parse_field("42"), Cell::Number(42.0));
        assert_eq!(parse_field(" -3.5 "), Cell::Number(-3.5));
        assert_eq!(parse_field("+.5"), Cell::Number(0.5));
        assert_eq!(parse_field("5."), Cell::Number(5.0));
        assert_eq!(parse_field("1e3"), Cell::Number(1000.0));
        assert_eq!(parse_field("\"7\""), Cell::Number(7.0));
    }

    #[test]
    fn non_finite_and_partial_numbers_stay_text() {
        for v in ["inf", "NaN", "infinity", "1e999", "12abc", "0x10", "1,5", "--1", "."] {
            assert!(matches!(parse_field(v), Cell::Text(_)), "{v:?} should be text");
        }
    }

    #[test]
    fn quotes_are_stripped_everywhere() {
        assert_eq!(clean_field(r#" "he said ""hi""" "#), "he said hi");
        assert_eq!(parse_field(r#""red""#), Cell::Text("red".into()));
    }

    #[test]
    fn extension_is_stripped_once() {
        assert_eq!(strip_extension("sales.csv"), "sales");
        assert_eq!(strip_extension("sales.2024.csv"), "sales.2024");
        assert_eq!(strip_extension("README"), "README");
        assert_eq!(strip_extension(".csv"), ".csv");
    }
}
