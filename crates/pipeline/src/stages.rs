//! Stage definitions: names, prompt assembly, input subsets.

use serde_json::{json, Value};

use veritor_schemas::{schema_document, SchemaKind};

use crate::llm::{ChatMessage, ChatRequest, ResponseFormat};

/// Fixed system prompt shared by every stage.
pub const SYSTEM_PROMPT: &str = "You are a reasoning worker. Respond with strict JSON only.";

/// Sampling temperature shared by every stage.
pub const STAGE_TEMPERATURE: f64 = 0.2;

/// The six pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieval,
    Matching,
    FindingGeneration,
    AgreementScoring,
    CategorySynthesis,
    OverallAssessment,
}

impl Stage {
    /// Display name used in task prompts and failure messages.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Retrieval => "Retrieval",
            Stage::Matching => "Matching",
            Stage::FindingGeneration => "Finding generation",
            Stage::AgreementScoring => "Agreement scoring",
            Stage::CategorySynthesis => "Category synthesis",
            Stage::OverallAssessment => "Overall assessment",
        }
    }

    pub fn schema_kind(&self) -> SchemaKind {
        match self {
            Stage::Retrieval => SchemaKind::Retrieval,
            Stage::Matching => SchemaKind::Matching,
            Stage::FindingGeneration => SchemaKind::FindingGeneration,
            Stage::AgreementScoring => SchemaKind::AgreementScoring,
            Stage::CategorySynthesis => SchemaKind::CategorySynthesis,
            Stage::OverallAssessment => SchemaKind::OverallAssessment,
        }
    }

    /// Build the single chat request for this stage.
    pub fn request(&self, input: &Value) -> ChatRequest {
        let schema = schema_document(self.schema_kind());
        let user = format!(
            "Task: {name}\n\nRespond with a single JSON object conforming to this schema:\n{schema}\n\nInput:\n{input}",
            name = self.name(),
        );
        ChatRequest {
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)],
            temperature: STAGE_TEMPERATURE,
            response_format: ResponseFormat::json_object(),
        }
    }
}

/// Exact stage input subsets (spelled out so the wire contract is visible in
/// one place).
pub mod inputs {
    use super::*;
    use veritor_schemas::{
        AgreementScoringResult, CategorySynthesisResult, FindingGenerationResult, MatchingResult,
        ReasoningJob, RetrievalResult,
    };

    pub fn retrieval(job: &ReasoningJob) -> Value {
        json!({
            "claim": job.claim,
            "documents": job.context.documents,
        })
    }

    pub fn matching(job: &ReasoningJob, retrieval: &RetrievalResult) -> Value {
        json!({
            "claim": job.claim,
            "criteria": job.criteria,
            "retrieval": retrieval,
        })
    }

    pub fn finding_generation(job: &ReasoningJob, matching: &MatchingResult) -> Value {
        json!({
            "claim": job.claim,
            "matches": matching.matches,
        })
    }

    pub fn agreement_scoring(job: &ReasoningJob, findings: &FindingGenerationResult) -> Value {
        json!({
            "claim": job.claim,
            "findings": findings.findings,
        })
    }

    pub fn category_synthesis(
        findings: &FindingGenerationResult,
        agreements: &AgreementScoringResult,
    ) -> Value {
        json!({
            "findings": findings.findings,
            "agreements": agreements.agreements,
        })
    }

    pub fn overall_assessment(
        job: &ReasoningJob,
        findings: &FindingGenerationResult,
        agreements: &AgreementScoringResult,
        categories: &CategorySynthesisResult,
    ) -> Value {
        json!({
            "claim": job.claim,
            "findings": findings.findings,
            "agreements": agreements.agreements,
            "categories": categories.categories,
        })
    }
}
