//! Value normalizer: turns one raw cell into a payload-safe scalar.
//!
//! | Input | Output |
//! |-------|--------|
//! | `Null`, NaN | `Null` |
//! | text shaped like `[...]` that parses | items joined with `", "` |
//! | text shaped like `[...]` that does not parse | the original text |
//! | other text | unchanged |
//! | list / n-d array | items joined with `", "` (arrays flattened row-major) |
//! | other scalars | unchanged |
//!
//! Normalization never fails. A list-shaped string that cannot be parsed
//! degrades to its original text; [`normalize_traced`] reports when that
//! happened.

use crate::error::LiteralError;
use crate::literal;
use crate::models::{CellValue, RawValue};

/// Separator used when flattening lists into text.
pub const LIST_SEPARATOR: &str = ", ";

/// A list-shaped string that was kept verbatim because it did not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDegradation {
    pub original: String,
    pub error: LiteralError,
}

/// Normalizes one cell.
pub fn normalize(raw: &RawValue) -> CellValue {
    normalize_traced(raw).0
}

/// Normalizes one cell and reports whether list parsing degraded.
pub fn normalize_traced(raw: &RawValue) -> (CellValue, Option<ParseDegradation>) {
    match raw {
        RawValue::Null => (CellValue::Null, None),
        RawValue::Float(f) if f.is_nan() => (CellValue::Null, None),
        RawValue::Text(s) => normalize_text(s),
        RawValue::List(items) => (CellValue::Text(join_items(items.iter())), None),
        RawValue::Array(array) => (CellValue::Text(join_items(array.iter())), None),
        other => (to_scalar(other), None),
    }
}

/// Converts a raw cell to a scalar without parsing text.
///
/// Used for columns that are not the normalization target: lists are
/// still flattened so no record ever holds a nested value, but strings
/// are kept exactly as read.
pub fn to_scalar(raw: &RawValue) -> CellValue {
    match raw {
        RawValue::Null => CellValue::Null,
        RawValue::Bool(b) => CellValue::Bool(*b),
        RawValue::Int(i) => CellValue::Int(*i),
        RawValue::Float(f) if !f.is_finite() => CellValue::Null,
        RawValue::Float(f) => CellValue::Float(*f),
        RawValue::Text(s) => CellValue::Text(s.clone()),
        RawValue::List(items) => CellValue::Text(join_items(items.iter())),
        RawValue::Array(array) => CellValue::Text(join_items(array.iter())),
    }
}

fn normalize_text(s: &str) -> (CellValue, Option<ParseDegradation>) {
    let trimmed = s.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return (CellValue::Text(s.to_string()), None);
    }
    match literal::parse_list(trimmed) {
        Ok(items) => (CellValue::Text(join_items(items.iter())), None),
        Err(error) => (
            CellValue::Text(s.to_string()),
            Some(ParseDegradation {
                original: s.to_string(),
                error,
            }),
        ),
    }
}

fn join_items<'a>(items: impl Iterator<Item = &'a RawValue>) -> String {
    items.map(item_text).collect::<Vec<_>>().join(LIST_SEPARATOR)
}

/// String form of one list element.
///
/// Matches how catalog exports print list items: floats keep their
/// fractional part, keywords are `None`/`True`/`False`, and nested
/// sequences show their strings quoted.
fn item_text(item: &RawValue) -> String {
    match item {
        RawValue::Text(s) => s.clone(),
        other => item_repr(other),
    }
}

/// Literal form of a value nested inside a list.
fn item_repr(item: &RawValue) -> String {
    match item {
        RawValue::Null => "None".to_string(),
        RawValue::Bool(true) => "True".to_string(),
        RawValue::Bool(false) => "False".to_string(),
        RawValue::Int(i) => i.to_string(),
        RawValue::Float(f) => float_text(*f),
        RawValue::Text(s) => quote(s),
        RawValue::List(inner) => nested(inner.iter()),
        RawValue::Array(inner) => nested(inner.iter()),
    }
}

fn nested<'a>(items: impl Iterator<Item = &'a RawValue>) -> String {
    let inner: Vec<String> = items.map(item_repr).collect();
    format!("[{}]", inner.join(LIST_SEPARATOR))
}

/// Shortest round-trip float text, always with a fraction or exponent.
fn float_text(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let text = format!("{:?}", f);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

/// Quotes a string with `'`, switching to `"` when only `'` appears inside.
fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, ArrayD};

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn out(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_null_and_nan_become_null() {
        assert_eq!(normalize(&RawValue::Null), CellValue::Null);
        assert_eq!(normalize(&RawValue::Float(f64::NAN)), CellValue::Null);
    }

    #[test]
    fn test_list_literal_string_is_joined() {
        assert_eq!(normalize(&text("[1, 2, 3]")), out("1, 2, 3"));
        assert_eq!(normalize(&text("['red','blue']")), out("red, blue"));
        assert_eq!(normalize(&text("  ['black']  ")), out("black"));
        assert_eq!(normalize(&text("[]")), out(""));
    }

    #[test]
    fn test_malformed_list_literal_passes_through() {
        let (value, degraded) = normalize_traced(&text("[1, 2"));
        assert_eq!(value, CellValue::Text("[1, 2".to_string()));
        // Not list-shaped (no closing bracket), so no parse was attempted.
        assert!(degraded.is_none());

        let (value, degraded) = normalize_traced(&text("[red, blue]"));
        assert_eq!(value, out("[red, blue]"));
        let degraded = degraded.expect("bare words should degrade");
        assert_eq!(degraded.original, "[red, blue]");
    }

    #[test]
    fn test_plain_string_is_unchanged() {
        assert_eq!(normalize(&text("crimson")), out("crimson"));
        assert_eq!(normalize(&text("[draft")), out("[draft"));
    }

    #[test]
    fn test_native_list_preserves_order() {
        let raw = RawValue::List(vec![RawValue::Int(1), text("a"), RawValue::Float(2.5)]);
        assert_eq!(normalize(&raw), out("1, a, 2.5"));
    }

    #[test]
    fn test_element_string_forms() {
        let cases = [
            ("[1.0, 2.0]", "1.0, 2.0"),
            ("[10.0, 10.5]", "10.0, 10.5"),
            ("[1e20, 1.5e-7]", "1e+20, 1.5e-07"),
            ("['a', None, True, False]", "a, None, True, False"),
            ("[['s', 'm'], 'l']", "['s', 'm'], l"),
            ("[[\"it's\"], 'x']", "[\"it's\"], x"),
            ("[-3, 0.25]", "-3, 0.25"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize(&text(input)), out(expected), "input {}", input);
        }
    }

    #[test]
    fn test_nested_text_is_escaped() {
        let raw = RawValue::List(vec![RawValue::List(vec![
            text("a\\b"),
            text("tab\there"),
            text("both ' and \""),
        ])]);
        assert_eq!(
            normalize(&raw),
            out(r#"['a\\b', 'tab\there', 'both \' and "']"#)
        );
    }

    #[test]
    fn test_native_float_items_keep_fraction() {
        let raw = RawValue::List(vec![RawValue::Float(3.0), RawValue::Float(f64::NAN)]);
        assert_eq!(normalize(&raw), out("3.0, nan"));
    }

    #[test]
    fn test_multidimensional_array_is_flattened() {
        let grid: ArrayD<RawValue> = arr2(&[
            [RawValue::Int(1), RawValue::Int(2)],
            [RawValue::Int(3), RawValue::Int(4)],
        ])
        .into_dyn();
        assert_eq!(normalize(&RawValue::Array(grid)), out("1, 2, 3, 4"));
    }

    #[test]
    fn test_scalars_are_unchanged() {
        assert_eq!(normalize(&RawValue::Int(42)), CellValue::Int(42));
        assert_eq!(normalize(&RawValue::Float(0.5)), CellValue::Float(0.5));
        assert_eq!(normalize(&RawValue::Bool(false)), CellValue::Bool(false));
    }

    #[test]
    fn test_to_scalar_does_not_parse_text() {
        assert_eq!(to_scalar(&text("['a']")), out("['a']"));
        assert_eq!(to_scalar(&RawValue::Float(f64::INFINITY)), CellValue::Null);
        assert_eq!(
            to_scalar(&RawValue::List(vec![text("x"), text("y")])),
            out("x, y")
        );
    }
}
