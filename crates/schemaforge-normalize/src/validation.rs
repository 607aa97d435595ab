//! C12: the validation tracker. Normalizes arbitrary-width rows to the
//! schema's expected width, and, when a canonical contract is configured,
//! checks required/typed column constraints.

use schemaforge_types::{CanonicalSchema, ValidationSummary};

use crate::type_predicates::{parses_as_bool, parses_as_date, parses_as_datetime, parses_as_float, parses_as_int, parses_as_json};

/// Normalizes rows to `expected_columns` width and, optionally, validates
/// them against a [`CanonicalSchema`] contract.
pub struct ValidationTracker {
    expected_columns: usize,
    summary: ValidationSummary,
    contract: Option<CanonicalSchema>,
}

impl ValidationTracker {
    #[must_use]
    pub fn new(expected_columns: usize, contract: Option<CanonicalSchema>) -> Self {
        Self {
            expected_columns: expected_columns.max(1),
            summary: ValidationSummary::default(),
            contract,
        }
    }

    /// Pads/truncates `values` to `expected_columns`, updating counters, and
    /// runs the canonical contract (if any) against the result.
    pub fn normalize(&mut self, values: &[String]) -> Vec<String> {
        let mut normalized = values.to_vec();
        let is_blank = !normalized.iter().any(|value| !value.trim().is_empty());
        if is_blank {
            self.summary.empty_rows += 1;
        }
        let length = normalized.len();
        if length < self.expected_columns {
            self.summary.short_rows += 1;
            normalized.resize(self.expected_columns, String::new());
        } else if length > self.expected_columns {
            self.summary.long_rows += 1;
            normalized.truncate(self.expected_columns);
        }
        self.summary.total_rows += 1;
        self.validate_contract(&normalized);
        normalized
    }

    fn validate_contract(&mut self, values: &[String]) {
        let Some(contract) = &self.contract else {
            return;
        };
        for (index, column) in contract.columns.iter().enumerate() {
            let value = values.get(index).map(String::as_str).unwrap_or("");
            let blank = value.trim().is_empty();
            if column.required && blank {
                self.summary.missing_required += 1;
                continue;
            }
            if blank {
                continue;
            }
            if !Self::type_matches(column.data_type.as_deref(), value) {
                self.summary.type_mismatches += 1;
                continue;
            }
            if let Some(allowed) = &column.allowed_values {
                if !allowed.iter().any(|candidate| candidate == value) {
                    self.summary.type_mismatches += 1;
                    continue;
                }
            }
            if let Ok(numeric) = value.trim().replace(',', ".").parse::<f64>() {
                if column.min_value.is_some_and(|min| numeric < min) || column.max_value.is_some_and(|max| numeric > max) {
                    self.summary.type_mismatches += 1;
                }
            }
        }
    }

    fn type_matches(data_type: Option<&str>, value: &str) -> bool {
        match data_type {
            None => true,
            Some("int") => parses_as_int(value),
            Some("float") | Some("decimal") => parses_as_float(value),
            Some("bool") => parses_as_bool(value),
            Some("date") => parses_as_date(value),
            Some("datetime") => parses_as_datetime(value),
            Some("json") => parses_as_json(value),
            Some(_) => true,
        }
    }

    #[must_use]
    pub fn summary(&self) -> ValidationSummary {
        self.summary.clone()
    }
}
