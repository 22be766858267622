//! `veritor-schemas` — frozen payload contracts for the reasoning pipeline.
//!
//! Every message that crosses a process boundary (inbound job, the six stage
//! outputs, the combined pipeline result) has a typed record here plus a
//! registry entry. Validation is strict: unknown fields are rejected at every
//! level, scores must sit in `[0, 1]`, and arrays marked non-empty must hold
//! at least one element. Downstream code consumes the typed value returned by
//! [`validate`]; raw `serde_json::Value` never travels past this crate.

pub mod docs;
pub mod job;
pub mod pipeline;
pub mod stages;
pub mod validate;

pub use job::{Criterion, DocumentRef, JobContext, ReasoningJob};
pub use pipeline::PipelineResult;
pub use stages::{
    Agreement, AgreementScoringResult, Category, CategorySynthesisResult, CriterionMatch, Finding,
    FindingGenerationResult, MatchingResult, OverallAssessmentResult, Passage, RetrievalResult,
    RiskLevel, Severity,
};
pub use docs::schema_document;
pub use validate::{
    validate, validate_agreement_scoring, validate_category_synthesis,
    validate_finding_generation, validate_job, validate_matching, validate_overall_assessment,
    validate_pipeline, validate_retrieval, SchemaError, SchemaKind, ValidatedPayload, Violation,
};
