//! Combining pattern results with fallback results.

use crate::models::field::{is_absent, normalize, FieldValues};
use crate::models::ExtractionSchema;

/// Merges deterministic and fallback values.
///
/// Fallback values only fill slots: an absent or `"NULL"` fallback value never
/// replaces what the pattern pass produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger;

impl ResultMerger {
    pub fn new() -> Self {
        Self
    }

    /// Start from the deterministic values and overwrite each slot for which
    /// the fallback carries a real value.
    pub fn merge(&self, deterministic: &FieldValues, fallback: &FieldValues) -> FieldValues {
        let mut merged = deterministic.clone();
        for (field, value) in fallback.iter() {
            if !is_absent(value) {
                merged.insert(field, value.map(str::to_string));
            }
        }
        merged
    }

    /// Keep exactly the requested fields, in schema order. Requested fields
    /// missing from `values` come out absent, and so does a leftover sentinel.
    pub fn restrict(&self, values: &FieldValues, requested: &ExtractionSchema) -> FieldValues {
        requested
            .field_names()
            .map(|field| (field, normalize(values.get(field))))
            .collect()
    }

    /// [`merge`](Self::merge) followed by [`restrict`](Self::restrict).
    pub fn merge_for(&self, deterministic: &FieldValues, fallback: &FieldValues, requested: &ExtractionSchema) -> FieldValues {
        self.restrict(&self.merge(deterministic, fallback), requested)
    }
}
