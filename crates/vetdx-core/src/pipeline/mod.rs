//! Diagnostic pipeline
//!
//! Case and run types, the veterinary query builder, the three pipeline
//! stages and the orchestrator that sequences them.

mod diagnosis;
mod knowledge;
mod orchestrator;
mod query;
mod types;
mod vision;

pub use diagnosis::{build_prompt as build_diagnosis_prompt, fallback_report, SYSTEM_PROMPT};
pub use knowledge::{KnowledgeBundle, KnowledgeGatherer};
pub use orchestrator::{Orchestrator, NO_IMAGES_PROVIDED, VISION_FAILED};
pub use query::{build_query, QueryFocus};
pub use types::{
    CaseInput, KnowledgeSummary, PipelineRun, StepRecord, StepStatus, Urgency, UrgencyProfile,
};
pub use vision::{VisionAnalysis, VisionAnalyzer, NO_VALID_IMAGES};
