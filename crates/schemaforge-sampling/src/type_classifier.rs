//! C3: pure classification of a trimmed cell into one of the five closed
//! type buckets.

use std::sync::OnceLock;

use regex::Regex;
use schemaforge_types::TypeBucket;

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{1,4}[./-]\d{1,2}[./-]\d{1,4}\b").unwrap())
}

fn int_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?\d+$").unwrap())
}

fn float_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(?:\d+[.,]\d+|\d+\.\d*|\d*[.,]\d+)$").unwrap())
}

/// Classifies a raw cell value. Buckets are closed and exhaustive: date
/// takes priority over integer/float so that day-month-year triples with
/// all-digit separators aren't mistaken for numbers.
#[must_use]
pub fn classify_value(value: &str) -> TypeBucket {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        return TypeBucket::Empty;
    }
    if date_pattern().is_match(cleaned) {
        return TypeBucket::Date;
    }
    if int_pattern().is_match(cleaned) {
        return TypeBucket::Integer;
    }
    let normalized = cleaned.replace(',', ".");
    if float_pattern().is_match(&normalized) {
        return TypeBucket::Float;
    }
    TypeBucket::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_empty() {
        assert_eq!(classify_value("   "), TypeBucket::Empty);
    }

    #[test]
    fn plain_integer() {
        assert_eq!(classify_value("-42"), TypeBucket::Integer);
    }

    #[test]
    fn comma_decimal_is_float() {
        assert_eq!(classify_value("3,14"), TypeBucket::Float);
    }

    #[test]
    fn date_separator_pattern_wins_over_integer_like_digits() {
        assert_eq!(classify_value("2024-01-05"), TypeBucket::Date);
        assert_eq!(classify_value("05.01.2024"), TypeBucket::Date);
    }

    #[test]
    fn free_text_falls_through() {
        assert_eq!(classify_value("hello world"), TypeBucket::Text);
    }
}
