//! Typed predicates the canonical-contract validator runs against a cell.

use chrono::NaiveDate;

#[must_use]
pub fn parses_as_int(value: &str) -> bool {
    value.trim().parse::<i64>().is_ok()
}

#[must_use]
pub fn parses_as_float(value: &str) -> bool {
    let normalized = value.trim().replace(',', ".");
    normalized.parse::<f64>().is_ok()
}

#[must_use]
pub fn parses_as_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "false" | "0" | "1" | "yes" | "no")
}

#[must_use]
pub fn parses_as_date(value: &str) -> bool {
    let trimmed = value.trim();
    chrono::DateTime::parse_from_rfc3339(trimmed).is_ok() || NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok()
}

#[must_use]
pub fn parses_as_datetime(value: &str) -> bool {
    let trimmed = value.trim();
    chrono::DateTime::parse_from_rfc3339(trimmed).is_ok()
        || chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").is_ok()
        || parses_as_date(trimmed)
}

#[must_use]
pub fn parses_as_json(value: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(value.trim()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_predicate() {
        assert!(parses_as_int("42"));
        assert!(!parses_as_int("4.2"));
    }

    #[test]
    fn float_predicate_normalizes_comma() {
        assert!(parses_as_float("4,2"));
        assert!(parses_as_float("4.2"));
        assert!(!parses_as_float("abc"));
    }

    #[test]
    fn bool_predicate_is_case_insensitive() {
        assert!(parses_as_bool("YES"));
        assert!(parses_as_bool("0"));
        assert!(!parses_as_bool("maybe"));
    }

    #[test]
    fn date_and_datetime_predicates() {
        assert!(parses_as_date("2024-01-05"));
        assert!(!parses_as_date("not-a-date"));
        assert!(parses_as_datetime("2024-01-05T10:00:00Z"));
    }

    #[test]
    fn json_predicate() {
        assert!(parses_as_json(r#"{"a": 1}"#));
        assert!(!parses_as_json("{not json"));
    }
}
