//! Loose JSON field readers. Clients send numbers either as JSON numbers or
//! as numeric strings from form inputs; a blank string means "not given".

use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberField {
    Absent,
    Number(f64),
    Invalid,
}

pub fn number_field(value: Option<&Value>) -> NumberField {
    match value {
        None | Some(Value::Null) => NumberField::Absent,
        Some(Value::Number(n)) => n.as_f64().map_or(NumberField::Invalid, NumberField::Number),
        Some(Value::String(s)) if s.trim().is_empty() => NumberField::Absent,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map_or(NumberField::Invalid, NumberField::Number),
        Some(_) => NumberField::Invalid,
    }
}

/// A required finite number greater than zero.
pub fn positive_number(value: Option<&Value>, message: &str) -> Result<f64, AppError> {
    match number_field(value) {
        NumberField::Number(n) if n > 0.0 => Ok(n),
        _ => Err(AppError::invalid(message)),
    }
}

/// An optional finite number greater than zero; absent gives `None`.
pub fn optional_positive(value: Option<&Value>, message: &str) -> Result<Option<f64>, AppError> {
    match number_field(value) {
        NumberField::Absent => Ok(None),
        NumberField::Number(n) if n > 0.0 => Ok(Some(n)),
        _ => Err(AppError::invalid(message)),
    }
}

/// An optional finite number that is zero or more; absent gives `None`.
pub fn optional_non_negative(
    value: Option<&Value>,
    message: &str,
) -> Result<Option<f64>, AppError> {
    match number_field(value) {
        NumberField::Absent => Ok(None),
        NumberField::Number(n) if n >= 0.0 => Ok(Some(n)),
        _ => Err(AppError::invalid(message)),
    }
}

/// The trimmed string value, or `None` for missing, non-string or blank.
pub fn trimmed_string(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_and_numeric_strings_are_accepted() {
        assert_eq!(number_field(Some(&json!(150))), NumberField::Number(150.0));
        assert_eq!(number_field(Some(&json!(" 12.5 "))), NumberField::Number(12.5));
        assert_eq!(number_field(Some(&json!(""))), NumberField::Absent);
        assert_eq!(number_field(Some(&json!(null))), NumberField::Absent);
        assert_eq!(number_field(None), NumberField::Absent);
        assert_eq!(number_field(Some(&json!("12g"))), NumberField::Invalid);
        assert_eq!(number_field(Some(&json!("inf"))), NumberField::Invalid);
        assert_eq!(number_field(Some(&json!(true))), NumberField::Invalid);
        assert_eq!(number_field(Some(&json!([1]))), NumberField::Invalid);
    }

    #[test]
    fn positive_rejects_zero_negative_and_missing() {
        let msg = "weightGrams must be a positive number";
        assert_eq!(positive_number(Some(&json!("180")), msg).unwrap(), 180.0);
        for bad in [json!(0), json!(-1), json!(""), json!("abc")] {
            let err = positive_number(Some(&bad), msg).unwrap_err();
            assert_eq!(err.to_string(), msg);
        }
        assert!(positive_number(None, msg).is_err());
    }

    #[test]
    fn optional_readers_allow_absent() {
        assert_eq!(optional_positive(None, "m").unwrap(), None);
        assert_eq!(optional_positive(Some(&json!(4)), "m").unwrap(), Some(4.0));
        assert!(optional_positive(Some(&json!(0)), "m").is_err());
        assert_eq!(optional_non_negative(Some(&json!(0)), "m").unwrap(), Some(0.0));
        assert_eq!(optional_non_negative(Some(&json!("  ")), "m").unwrap(), None);
        assert!(optional_non_negative(Some(&json!(-0.5)), "m").is_err());
    }

    #[test]
    fn trimmed_string_drops_blank_and_non_strings() {
        assert_eq!(trimmed_string(Some(&json!("  Chili "))), Some("Chili"));
        assert_eq!(trimmed_string(Some(&json!("   "))), None);
        assert_eq!(trimmed_string(Some(&json!(42))), None);
        assert_eq!(trimmed_string(None), None);
    }
}
