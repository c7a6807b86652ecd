//! Completion gate: which requested fields still need the fallback.

use crate::models::field::{is_absent, FieldValues};
use crate::models::ExtractionSchema;

/// Decides completeness over the requested fields only; extra bank fields never count.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionGate;

impl CompletionGate {
    pub fn new() -> Self {
        Self
    }

    /// Whether a requested field counts as missing: not in the map, absent,
    /// or carrying the `"NULL"` sentinel.
    pub fn is_missing(&self, values: &FieldValues, field: &str) -> bool {
        is_absent(values.get(field))
    }

    /// Whether every requested field is resolved.
    pub fn is_complete(&self, values: &FieldValues, requested: &ExtractionSchema) -> bool {
        !requested.field_names().any(|field| self.is_missing(values, field))
    }

    /// Missing requested fields with the caller's descriptors, in schema order.
    pub fn missing_fields(&self, values: &FieldValues, requested: &ExtractionSchema) -> ExtractionSchema {
        requested
            .iter()
            .filter(|f| self.is_missing(values, &f.name))
            .map(|f| (f.name.clone(), f.description.clone()))
            .collect()
    }
}
