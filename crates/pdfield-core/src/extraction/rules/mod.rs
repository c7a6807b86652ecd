//! Pattern banks, validators and the label registry.

pub mod patterns;
pub mod registry;
pub mod validators;

pub use patterns::{CARTEIRA_OAB, TELA_SISTEMA};
pub use registry::{LabelDefinition, LabelProfile, LabelRegistry};
pub use validators::{FieldValidator, Validator, ValidatorSet, ValidatorSpec};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// Compile a field pattern with the flags every bank pattern uses:
/// case-insensitive, `^`/`$` per line, `.` matching newlines.
///
/// The pattern must have at least one capture group; the first one carries the value.
pub fn compile_pattern(field: &str, pattern: &str) -> Result<Regex, PatternError> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| PatternError::InvalidRegex {
            field: field.to_string(),
            reason: e.to_string(),
        })?;

    // captures_len counts the implicit whole-match group
    if regex.captures_len() < 2 {
        return Err(PatternError::MissingCaptureGroup {
            field: field.to_string(),
            pattern: pattern.to_string(),
        });
    }

    Ok(regex)
}

/// Ordered candidate patterns for one field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: String,
    /// Tried in this order; never reordered.
    pub patterns: Vec<Regex>,
}

/// Field → ordered patterns for one label, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PatternBank {
    rules: Vec<FieldRule>,
}

impl PatternBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field with its patterns, compiling them now.
    pub fn with_field<S: AsRef<str>>(mut self, field: &str, patterns: &[S]) -> Result<Self, PatternError> {
        self.insert(field, patterns)?;
        Ok(self)
    }

    /// Add or replace a field's patterns.
    pub fn insert<S: AsRef<str>>(&mut self, field: &str, patterns: &[S]) -> Result<(), PatternError> {
        let compiled = patterns
            .iter()
            .map(|p| compile_pattern(field, p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        match self.rules.iter_mut().find(|r| r.field == field) {
            Some(rule) => rule.patterns = compiled,
            None => self.rules.push(FieldRule {
                field: field.to_string(),
                patterns: compiled,
            }),
        }
        Ok(())
    }

    /// Patterns for a field; empty when the bank has no entry for it.
    pub fn patterns(&self, field: &str) -> &[Regex] {
        self.rules
            .iter()
            .find(|r| r.field == field)
            .map(|r| r.patterns.as_slice())
            .unwrap_or(&[])
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.field.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Declarative rule for one field, as written in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRuleDef {
    pub field: String,
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorSpec>,
}
