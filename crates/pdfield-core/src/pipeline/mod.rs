//! Job orchestration and the fallback contract.

mod fallback;
mod orchestrator;

pub use fallback::{DisabledFallback, FallbackFailure, FallbackOutcome, FallbackResolver};
pub use orchestrator::{JobReport, JobStage, RequestOrchestrator};
