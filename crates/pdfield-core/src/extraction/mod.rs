//! Field extraction: pattern banks, the completion gate and the merger.

mod extractor;
mod gate;
mod merge;
pub mod rules;

pub use extractor::DeterministicExtractor;
pub use gate::CompletionGate;
pub use merge::ResultMerger;
