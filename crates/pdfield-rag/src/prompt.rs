//! Prompt construction and answer parsing.

use pdfield_core::models::field::normalize;
use pdfield_core::{ExtractionSchema, FieldValues};
use serde_json::Value;

use crate::{RagError, Result};

/// Separator between retrieved chunks in the prompt context.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Retrieval query built from the missing fields and their descriptors.
pub fn retrieval_query(missing: &ExtractionSchema) -> String {
    missing
        .iter()
        .map(|field| {
            if field.description.trim().is_empty() {
                field.name.clone()
            } else {
                format!("{}: {}", field.name, field.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extraction prompt asking for a JSON object with only the missing fields.
pub fn build_prompt(missing: &ExtractionSchema, context: &[&str]) -> Result<String> {
    let fields = serde_json::to_string_pretty(missing)?;
    let context = context.join(CONTEXT_SEPARATOR);

    Ok(format!(
        "Você é um assistente que extrai informações estruturadas de documentos PDF.\n\
         \n\
         Extraia do documento apenas os campos abaixo, que ainda não foram encontrados. \
         Cada chave é o nome do campo e cada valor descreve o que procurar:\n\
         \n\
         {fields}\n\
         \n\
         Responda somente com um objeto JSON contendo esses campos e os valores extraídos. \
         Use null para qualquer campo que não estiver no documento.\n\
         \n\
         Documento:\n\
         {context}\n\
         \n\
         Resposta (apenas JSON):\n"
    ))
}

/// Parse the model's answer into values for the requested fields.
///
/// Surrounding markdown code fences are ignored. Keys that were not asked for
/// are dropped; requested keys the answer omits stay out of the result.
pub fn parse_answer(raw: &str, missing: &ExtractionSchema) -> Result<FieldValues> {
    let body = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| RagError::MalformedAnswer(format!("{}: {}", e, preview(body))))?;
    let Value::Object(map) = value else {
        return Err(RagError::MalformedAnswer(format!("expected a JSON object, got {}", preview(body))));
    };

    let mut values = FieldValues::new();
    for field in missing.field_names() {
        if let Some(value) = map.get(field) {
            values.insert(field, render(value));
        }
    }
    Ok(values)
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => normalize(Some(s.trim())),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (e.g. `json`) on the opening line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    match text.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
