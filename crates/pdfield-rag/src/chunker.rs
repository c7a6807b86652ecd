//! Semantic chunking: split where adjacent sentences drift apart in meaning.

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::backend::EmbeddingBackend;
use crate::index::cosine_similarity;
use crate::Result;

/// A contiguous run of sentences from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// Zero-based page the chunk came from.
    pub page: usize,
}

/// Splits page text into chunks at semantic breakpoints.
///
/// Every sentence is embedded; a chunk ends after any sentence whose cosine
/// distance to the next one exceeds the configured percentile of all adjacent
/// distances on that page.
#[derive(Debug, Clone, Copy)]
pub struct SemanticChunker {
    percentile: f32,
}

impl Default for SemanticChunker {
    fn default() -> Self {
        Self::new(95.0)
    }
}

impl SemanticChunker {
    pub fn new(percentile: f32) -> Self {
        Self {
            percentile: percentile.clamp(0.0, 100.0),
        }
    }

    pub fn percentile(&self) -> f32 {
        self.percentile
    }

    /// Chunk every page. Blank pages produce nothing.
    pub async fn split(&self, embedder: &dyn EmbeddingBackend, pages: &[String]) -> Result<Vec<Chunk>> {
        let per_page: Vec<Vec<String>> = pages.iter().map(|p| sentences(p)).collect();

        // one embedding round trip for the whole document
        let all: Vec<String> = per_page
            .iter()
            .filter(|s| s.len() > 1)
            .flatten()
            .cloned()
            .collect();
        let embedded = if all.is_empty() {
            Vec::new()
        } else {
            embedder.embed_documents(&all).await?
        };
        let mut embeddings = embedded.into_iter();

        let mut chunks = Vec::new();
        for (page, sentences) in per_page.into_iter().enumerate() {
            match sentences.len() {
                0 => continue,
                1 => chunks.push(Chunk {
                    text: sentences.into_iter().collect(),
                    page,
                }),
                n => {
                    let vectors: Vec<Vec<f32>> = embeddings.by_ref().take(n).collect();
                    let distances: Vec<f32> = vectors
                        .windows(2)
                        .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]))
                        .collect();
                    let breaks = breakpoints(&distances, self.percentile);
                    chunks.extend(group(&sentences, &breaks).into_iter().map(|text| Chunk { text, page }));
                }
            }
        }

        debug!("Split {} page(s) into {} chunk(s)", pages.len(), chunks.len());
        Ok(chunks)
    }
}

/// Trimmed, non-empty sentences of `text`.
pub(crate) fn sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Percentile with linear interpolation between closest ranks.
pub(crate) fn percentile(values: &[f32], pct: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f32;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Indices `i` such that a chunk ends after sentence `i`.
pub(crate) fn breakpoints(distances: &[f32], pct: f32) -> Vec<usize> {
    let Some(threshold) = percentile(distances, pct) else {
        return Vec::new();
    };
    distances
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > threshold)
        .map(|(i, _)| i)
        .collect()
}

fn group(sentences: &[String], breaks: &[usize]) -> Vec<String> {
    let mut chunks = Vec::with_capacity(breaks.len() + 1);
    let mut start = 0;
    for &end in breaks {
        chunks.push(sentences[start..=end].join(" "));
        start = end + 1;
    }
    if start < sentences.len() {
        chunks.push(sentences[start..].join(" "));
    }
    chunks
}
