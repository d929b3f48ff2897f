//! Type inference for raw CSV cells.
//!
//! A column's type is decided by its first populated value only. Later
//! values are not scanned for conflicts; reconciliation against the expected
//! schema is what catches a column that drifts.

use log::debug;

use crate::{
    data::Value,
    rows::RowBatch,
    schema::{ColumnType, Schema},
};

/// Classifies a single raw value as int64, float64 or string.
pub fn determine_type(value: &str) -> ColumnType {
    // Plain digit runs (including leading zeros) are integers before any
    // float parsing gets a say.
    if is_ascii_digits(value) {
        return ColumnType::Integer;
    }
    if value.trim().parse::<f64>().is_err() {
        return ColumnType::String;
    }
    if value.contains(['.', 'e', 'E']) {
        ColumnType::Float
    } else if value.strip_prefix('-').is_some_and(is_ascii_digits) {
        ColumnType::Integer
    } else {
        ColumnType::String
    }
}

fn is_ascii_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn cell_type(cell: &Value) -> Option<ColumnType> {
    match cell {
        Value::Text(s) if s.is_empty() => None,
        Value::Text(s) => Some(determine_type(s)),
        Value::Integer(_) => Some(ColumnType::Integer),
        Value::Float(_) => Some(ColumnType::Float),
        Value::Null => None,
    }
}

/// Builds the extracted schema for `batch`, one entry per header in header
/// order. Columns with no populated value default to string.
pub fn infer_schema(batch: &RowBatch) -> Schema {
    let mut schema = Schema::new();
    for header in &batch.headers {
        let inferred = batch
            .rows
            .iter()
            .filter_map(|row| row.get(header))
            .find_map(cell_type);
        let datatype = inferred.unwrap_or_else(|| {
            debug!("Column '{header}' has no populated values; defaulting to string");
            ColumnType::String
        });
        schema.set(header.as_str(), datatype);
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn determine_type_handles_basic_tokens() {
        assert_eq!(determine_type("123"), ColumnType::Integer);
        assert_eq!(determine_type("007"), ColumnType::Integer);
        assert_eq!(determine_type("123.45"), ColumnType::Float);
        assert_eq!(determine_type("abc"), ColumnType::String);
        assert_eq!(determine_type("-123"), ColumnType::Integer);
        assert_eq!(determine_type("-123.45"), ColumnType::Float);
    }

    #[test]
    fn determine_type_treats_blank_and_mixed_as_string() {
        assert_eq!(determine_type(""), ColumnType::String);
        assert_eq!(determine_type("   "), ColumnType::String);
        assert_eq!(determine_type("123abc"), ColumnType::String);
        assert_eq!(determine_type("--5"), ColumnType::String);
    }

    #[test]
    fn determine_type_requires_a_marker_for_float() {
        assert_eq!(determine_type("1e5"), ColumnType::Float);
        assert_eq!(determine_type("2.5E-3"), ColumnType::Float);
        assert_eq!(determine_type(" 1.5 "), ColumnType::Float);
        // Parseable but neither marked nor a plain signed digit run.
        assert_eq!(determine_type("+5"), ColumnType::String);
        assert_eq!(determine_type("inf"), ColumnType::String);
        assert_eq!(determine_type("nan"), ColumnType::String);
        assert_eq!(determine_type(" 12 "), ColumnType::String);
    }

    #[test]
    fn determine_type_accepts_only_ascii_digit_runs() {
        assert_eq!(determine_type("\u{661}\u{662}\u{663}"), ColumnType::String);
        assert_eq!(determine_type("\u{ff11}\u{ff12}"), ColumnType::String);
        assert_eq!(determine_type("1_000"), ColumnType::String);
        assert_eq!(determine_type("1_000.5"), ColumnType::String);
    }

    proptest! {
        #[test]
        fn digit_strings_are_integers(value in "[0-9]{1,24}") {
            prop_assert_eq!(determine_type(&value), ColumnType::Integer);
        }

        #[test]
        fn fractional_and_exponent_numbers_are_floats(
            value in "-?[0-9]{1,8}(\\.[0-9]{1,6}|[eE]-?[0-9]{1,2}|\\.[0-9]{1,4}[eE][0-9]{1,2})"
        ) {
            prop_assert_eq!(determine_type(&value), ColumnType::Float);
        }

        #[test]
        fn letters_after_digits_stay_strings(value in "[0-9]{1,6}[a-df-zA-DF-Z]{1,4}") {
            prop_assert_eq!(determine_type(&value), ColumnType::String);
        }
    }
}
