//! Extraction jobs and results as they cross the service boundary.

use std::fmt;
use std::time::Duration;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::field::FieldValues;

/// Document category selecting the pattern bank and validators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// One requested field and the caller's description of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub description: String,
}

/// The caller's requested fields, in declaration order.
///
/// Descriptions only select which fields are in scope and are passed through
/// to the fallback resolver as hints; they are never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSchema {
    fields: Vec<SchemaField>,
}

impl ExtractionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. A repeated name replaces the earlier description in place.
    pub fn with_field(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.insert(name, description);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, description: impl Into<String>) {
        let name = name.into();
        let description = description.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.description = description,
            None => self.fields.push(SchemaField { name, description }),
        }
    }

    /// Description of a requested field.
    pub fn description(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.description.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractionSchema {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut schema = ExtractionSchema::new();
        for (name, description) in iter {
            schema.insert(name, description);
        }
        schema
    }
}

impl Serialize for ExtractionSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.description)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtractionSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = ExtractionSchema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to descriptions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut schema = ExtractionSchema::new();
                while let Some((name, description)) = access.next_entry::<String, String>()? {
                    schema.insert(name, description);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// One extraction request: which label, which fields, which document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub label: Label,
    pub extraction_schema: ExtractionSchema,
    /// Document path, relative to the data root unless absolute.
    pub pdf_path: String,
}

impl ExtractionJob {
    pub fn new(label: impl Into<Label>, extraction_schema: ExtractionSchema, pdf_path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            extraction_schema,
            pdf_path: pdf_path.into(),
        }
    }
}

/// Inbound payload: a single job or a sequence of jobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JobBatch {
    Many(Vec<ExtractionJob>),
    One(ExtractionJob),
}

impl JobBatch {
    /// Jobs in caller-declared order.
    pub fn into_jobs(self) -> Vec<ExtractionJob> {
        match self {
            JobBatch::Many(jobs) => jobs,
            JobBatch::One(job) => vec![job],
        }
    }
}

/// Which path produced the final record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    /// Every requested field was resolved by the pattern bank.
    #[serde(rename = "REGEX")]
    Regex,
    /// At least one requested field was missing, so the fallback ran.
    #[serde(rename = "MISTO")]
    Mixed,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Regex => "REGEX",
            ExtractionMethod::Mixed => "MISTO",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final record for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub label: Label,
    /// Final values, restricted to the requested fields in declaration order.
    pub extraction_schema: FieldValues,
    /// Document file name (no directories).
    pub pdf_path: String,
    pub extracao_com: ExtractionMethod,
    /// Elapsed wall time as `HH:MM:SS`.
    pub tempo_de_extracao: String,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Render whole elapsed seconds as zero-padded `HH:MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
