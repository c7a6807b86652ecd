//! Field values and the ordered field map shared by every pipeline stage.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Literal text some producers use to say "not found".
pub const ABSENT_SENTINEL: &str = "NULL";

/// A field value: `Some` when populated, `None` when the field was not found.
pub type FieldValue = Option<String>;

/// Whether a raw value means "not found".
///
/// Native absence, blank text and the case-sensitive `"NULL"` sentinel are
/// all equivalent.
pub fn is_absent(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(s) => s.trim().is_empty() || s == ABSENT_SENTINEL,
    }
}

/// Normalize a raw value into a [`FieldValue`], collapsing every absence encoding to `None`.
pub fn normalize(raw: Option<&str>) -> FieldValue {
    if is_absent(raw) {
        None
    } else {
        raw.map(|s| s.to_string())
    }
}

/// Field name → value map that keeps insertion order.
///
/// Serialized as a JSON object whose keys follow insertion order; absent
/// values serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    entries: Vec<(String, FieldValue)>,
}

impl FieldValues {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Replacing keeps the original position.
    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((field, value)),
        }
    }

    /// Value of a field; `None` both when the field is absent and when it is not in the map.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.slot(field).and_then(|v| v.as_deref())
    }

    /// The raw slot for a field, distinguishing "not in the map" from "absent".
    pub fn slot(&self, field: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Whether the map has an entry for the field.
    pub fn contains(&self, field: &str) -> bool {
        self.slot(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        let mut values = FieldValues::new();
        for (field, value) in iter {
            values.insert(field, value);
        }
        values
    }
}

impl IntoIterator for FieldValues {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, value) in &self.entries {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldValuesVisitor;

        impl<'de> Visitor<'de> for FieldValuesVisitor {
            type Value = FieldValues;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to string or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut values = FieldValues::new();
                while let Some((field, value)) = access.next_entry::<String, FieldValue>()? {
                    values.insert(field, value);
                }
                Ok(values)
            }
        }

        deserializer.deserialize_map(FieldValuesVisitor)
    }
}
