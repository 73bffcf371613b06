//! Lenient coercion of free-text cell values.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

const TRUE_WORDS: [&str; 4] = ["yes", "true", "1", "да"];
const FALSE_WORDS: [&str; 4] = ["no", "false", "0", "нет"];

/// Truthiness of a raw value: empty strings, zero, `NaN` and `null` are
/// false, everything else is true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Boolean coercion for yes/no cells.
///
/// Recognized words (`yes`, `true`, `1`, `Да` and their negatives) are
/// matched case-insensitively after trimming; anything else falls back to
/// [`truthy`].
pub fn coerce_bool(value: &Value) -> bool {
    let word = match value {
        Value::String(s) => s.trim().to_lowercase(),
        Value::Number(n) => n.to_string(),
        _ => return truthy(value),
    };
    if TRUE_WORDS.contains(&word.as_str()) {
        true
    } else if FALSE_WORDS.contains(&word.as_str()) {
        false
    } else {
        truthy(value)
    }
}

/// Keep only digits, `.` and `-`.
fn numeric_chars(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

/// Numeric coercion: strip everything but digits, `.` and `-`, then parse.
/// Unparseable or non-finite results are 0.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => numeric_chars(s).parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Money coercion with the same stripping rule as [`coerce_number`], but
/// parsed as an exact decimal.
pub fn coerce_amount(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64))
            .unwrap_or(Decimal::ZERO),
        Value::String(s) => Decimal::from_str(&numeric_chars(s)).unwrap_or(Decimal::ZERO),
        Value::Bool(true) => Decimal::ONE,
        _ => Decimal::ZERO,
    }
}

/// Text content of a cell, trimmed. Numbers and booleans are rendered,
/// `null` and containers are empty.
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognized_yes_no_words() {
        for v in [json!(true), json!("yes"), json!("true"), json!("1"), json!("Да"), json!(" да "), json!(1)] {
            assert!(coerce_bool(&v), "{v}");
        }
        for v in [json!(false), json!("no"), json!("false"), json!("0"), json!("Нет"), json!(0)] {
            assert!(!coerce_bool(&v), "{v}");
        }
    }

    #[test]
    fn unrecognized_values_use_truthiness() {
        assert!(coerce_bool(&json!("maybe")));
        assert!(!coerce_bool(&json!("")));
        assert!(!coerce_bool(&Value::Null));
        assert!(coerce_bool(&json!(2)));
        assert!(coerce_bool(&json!([])));
    }

    #[test]
    fn numbers_are_stripped_then_parsed() {
        assert_eq!(coerce_number(&json!("1 290 ₽")), 1290.0);
        assert_eq!(coerce_number(&json!("-12.5 шт")), -12.5);
        assert_eq!(coerce_number(&json!("abc")), 0.0);
        assert_eq!(coerce_number(&json!("1-2")), 0.0);
        assert_eq!(coerce_number(&json!(4)), 4.0);
        assert_eq!(coerce_number(&Value::Null), 0.0);
    }

    #[test]
    fn amounts_are_exact() {
        assert_eq!(coerce_amount(&json!("1 490,00")), Decimal::from(149000));
        assert_eq!(coerce_amount(&json!("104.50")), Decimal::new(10450, 2));
        assert_eq!(coerce_amount(&json!(890)), Decimal::from(890));
        assert_eq!(coerce_amount(&json!("n/a")), Decimal::ZERO);
    }

    #[test]
    fn text_of_scalars() {
        assert_eq!(coerce_text(&json!("  Mira ")), "Mira");
        assert_eq!(coerce_text(&json!(4510)), "4510");
        assert_eq!(coerce_text(&Value::Null), "");
    }
}
