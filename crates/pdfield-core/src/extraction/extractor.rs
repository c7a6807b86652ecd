//! Deterministic extraction: ordered patterns, first accepted match wins.

use std::time::Instant;

use regex::Regex;
use tracing::{debug, trace};

use super::rules::{LabelProfile, PatternBank, ValidatorSet};
use crate::models::field::{normalize, FieldValue, FieldValues};

/// Applies a label's pattern bank to plain document text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicExtractor;

impl DeterministicExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every field the bank defines, not only the requested ones.
    ///
    /// For each field the patterns are tried in declared order; a match is
    /// trimmed, validated, and the first accepted one is kept. A field
    /// without an accepted match is absent.
    pub fn extract(&self, text: &str, bank: &PatternBank, validators: &ValidatorSet) -> FieldValues {
        let start = Instant::now();
        let mut values = FieldValues::new();

        for rule in bank.rules() {
            let value = self.extract_field(text, &rule.field, &rule.patterns, validators);
            values.insert(rule.field.clone(), value);
        }

        debug!(
            "Pattern pass resolved {}/{} fields in {}us",
            values.iter().filter(|(_, v)| v.is_some()).count(),
            values.len(),
            start.elapsed().as_micros()
        );

        values
    }

    /// Convenience over [`extract`](Self::extract) for a compiled label profile.
    pub fn extract_profile(&self, text: &str, profile: &LabelProfile) -> FieldValues {
        self.extract(text, &profile.bank, &profile.validators)
    }

    fn extract_field(
        &self,
        text: &str,
        field: &str,
        patterns: &[Regex],
        validators: &ValidatorSet,
    ) -> FieldValue {
        for (index, pattern) in patterns.iter().enumerate() {
            let Some(candidate) = first_capture(pattern, text) else {
                trace!("{}: pattern #{} did not match", field, index);
                continue;
            };

            if validators.accepts(field, candidate) {
                trace!("{}: pattern #{} accepted {:?}", field, index, candidate);
                return normalize(Some(candidate));
            }

            trace!("{}: pattern #{} rejected {:?}", field, index, candidate);
        }

        None
    }
}

/// First capture group of the leftmost match, trimmed. A group that did not
/// take part in the match counts as no match.
fn first_capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}
