//! Candidate validators applied after a pattern matches.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// Capability every validator kind implements.
///
/// Implementations must be pure: the same trimmed candidate always gives the
/// same answer.
pub trait FieldValidator: Send + Sync {
    /// Whether the trimmed candidate is an acceptable value.
    fn accepts(&self, candidate: &str) -> bool;
}

impl<F> FieldValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn accepts(&self, candidate: &str) -> bool {
        self(candidate)
    }
}

/// A validator for one field.
#[derive(Clone)]
pub enum Validator {
    /// Candidate must match the expression (no implicit anchoring or flags).
    Regex(Regex),
    /// Candidate must parse as a number within `min..=max`.
    NumericRange { min: f64, max: f64 },
    /// Candidate must parse as a calendar date in the given `chrono` format.
    Date { format: String },
    /// Any other predicate.
    Custom(Arc<dyn FieldValidator>),
}

impl Validator {
    /// Build a regex validator.
    pub fn regex(field: &str, pattern: &str) -> Result<Self, PatternError> {
        Regex::new(pattern)
            .map(Validator::Regex)
            .map_err(|e| PatternError::InvalidValidator {
                field: field.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn numeric_range(min: f64, max: f64) -> Self {
        Validator::NumericRange { min, max }
    }

    pub fn date(format: impl Into<String>) -> Self {
        Validator::Date { format: format.into() }
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Validator::Custom(Arc::new(predicate))
    }
}

impl FieldValidator for Validator {
    fn accepts(&self, candidate: &str) -> bool {
        match self {
            Validator::Regex(re) => re.is_match(candidate),
            Validator::NumericRange { min, max } => candidate
                .replace(',', ".")
                .parse::<f64>()
                .map(|n| n >= *min && n <= *max)
                .unwrap_or(false),
            Validator::Date { format } => NaiveDate::parse_from_str(candidate, format).is_ok(),
            Validator::Custom(predicate) => predicate.accepts(candidate),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            Validator::NumericRange { min, max } => f
                .debug_struct("NumericRange")
                .field("min", min)
                .field("max", max)
                .finish(),
            Validator::Date { format } => f.debug_struct("Date").field("format", format).finish(),
            Validator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Declarative validator, as written in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidatorSpec {
    Regex { pattern: String },
    NumericRange { min: f64, max: f64 },
    Date { format: String },
}

impl ValidatorSpec {
    /// Compile the declaration for a field.
    pub fn build(&self, field: &str) -> Result<Validator, PatternError> {
        match self {
            ValidatorSpec::Regex { pattern } => Validator::regex(field, pattern),
            ValidatorSpec::NumericRange { min, max } => {
                if min > max {
                    return Err(PatternError::InvalidValidator {
                        field: field.to_string(),
                        reason: format!("empty range {}..={}", min, max),
                    });
                }
                Ok(Validator::numeric_range(*min, *max))
            }
            ValidatorSpec::Date { format } => {
                if format.trim().is_empty() {
                    return Err(PatternError::InvalidValidator {
                        field: field.to_string(),
                        reason: "empty date format".to_string(),
                    });
                }
                Ok(Validator::date(format.clone()))
            }
        }
    }
}

/// Validators for one label, keyed by field. A field without one accepts every candidate.
#[derive(Debug, Clone, Default)]
pub struct ValidatorSet {
    validators: HashMap<String, Validator>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, validator: Validator) -> Self {
        self.insert(field, validator);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, validator: Validator) {
        self.validators.insert(field.into(), validator);
    }

    pub fn get(&self, field: &str) -> Option<&Validator> {
        self.validators.get(field)
    }

    /// Apply the field's validator, or accept when it has none.
    pub fn accepts(&self, field: &str, candidate: &str) -> bool {
        self.validators
            .get(field)
            .map(|v| v.accepts(candidate))
            .unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
