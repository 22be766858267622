//! Frozen JSON-schema documents for the stage contracts.
//!
//! These are the documents embedded verbatim into the LLM prompt so the model
//! sees the exact shape it must produce. They are built once and never
//! mutated after process start. The executable contract lives in
//! [`crate::validate`]; these documents describe the same shapes.

use std::sync::OnceLock;

use serde_json::{json, Value};

use crate::validate::SchemaKind;

/// The JSON-schema document for `kind`.
pub fn schema_document(kind: SchemaKind) -> &'static Value {
    match kind {
        SchemaKind::Job => cached(&JOB, job_schema),
        SchemaKind::Retrieval => cached(&RETRIEVAL, retrieval_schema),
        SchemaKind::Matching => cached(&MATCHING, matching_schema),
        SchemaKind::FindingGeneration => cached(&FINDING_GENERATION, finding_generation_schema),
        SchemaKind::AgreementScoring => cached(&AGREEMENT_SCORING, agreement_scoring_schema),
        SchemaKind::CategorySynthesis => cached(&CATEGORY_SYNTHESIS, category_synthesis_schema),
        SchemaKind::OverallAssessment => cached(&OVERALL_ASSESSMENT, overall_assessment_schema),
        SchemaKind::Pipeline => cached(&PIPELINE, pipeline_schema),
    }
}

static JOB: OnceLock<Value> = OnceLock::new();
static RETRIEVAL: OnceLock<Value> = OnceLock::new();
static MATCHING: OnceLock<Value> = OnceLock::new();
static FINDING_GENERATION: OnceLock<Value> = OnceLock::new();
static AGREEMENT_SCORING: OnceLock<Value> = OnceLock::new();
static CATEGORY_SYNTHESIS: OnceLock<Value> = OnceLock::new();
static OVERALL_ASSESSMENT: OnceLock<Value> = OnceLock::new();
static PIPELINE: OnceLock<Value> = OnceLock::new();

fn cached(slot: &'static OnceLock<Value>, build: fn() -> Value) -> &'static Value {
    slot.get_or_init(build)
}

fn score() -> Value {
    json!({"type": "number", "minimum": 0.0, "maximum": 1.0})
}

fn non_empty_string() -> Value {
    json!({"type": "string", "minLength": 1})
}

fn level_enum() -> Value {
    json!({"type": "string", "enum": ["low", "medium", "high"]})
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn array_of(items: Value) -> Value {
    json!({"type": "array", "minItems": 1, "items": items})
}

fn job_schema() -> Value {
    object(
        json!({
            "jobId": non_empty_string(),
            "tenantId": non_empty_string(),
            "claim": non_empty_string(),
            "context": object(
                json!({
                    "documents": array_of(object(
                        json!({"id": non_empty_string(), "content": non_empty_string()}),
                        &["id", "content"],
                    ))
                }),
                &["documents"],
            ),
            "criteria": array_of(object(
                json!({"id": non_empty_string(), "description": non_empty_string()}),
                &["id", "description"],
            ))
        }),
        &["jobId", "tenantId", "claim", "context", "criteria"],
    )
}

fn retrieval_schema() -> Value {
    object(
        json!({
            "passages": array_of(object(
                json!({
                    "documentId": non_empty_string(),
                    "excerpt": non_empty_string(),
                    "relevance": score()
                }),
                &["documentId", "excerpt", "relevance"],
            ))
        }),
        &["passages"],
    )
}

fn matching_schema() -> Value {
    object(
        json!({
            "matches": array_of(object(
                json!({
                    "criterionId": non_empty_string(),
                    "matched": {"type": "boolean"},
                    "relevance": score(),
                    "rationale": non_empty_string()
                }),
                &["criterionId", "matched", "relevance", "rationale"],
            ))
        }),
        &["matches"],
    )
}

fn finding_generation_schema() -> Value {
    object(
        json!({
            "findings": array_of(object(
                json!({
                    "id": non_empty_string(),
                    "statement": non_empty_string(),
                    "severity": level_enum(),
                    "confidence": score()
                }),
                &["id", "statement", "severity", "confidence"],
            ))
        }),
        &["findings"],
    )
}

fn agreement_scoring_schema() -> Value {
    object(
        json!({
            "agreements": array_of(object(
                json!({
                    "findingId": non_empty_string(),
                    "agreement": score(),
                    "rationale": non_empty_string()
                }),
                &["findingId", "agreement", "rationale"],
            ))
        }),
        &["agreements"],
    )
}

fn category_synthesis_schema() -> Value {
    object(
        json!({
            "categories": array_of(object(
                json!({
                    "name": non_empty_string(),
                    "riskLevel": level_enum(),
                    "summary": non_empty_string()
                }),
                &["name", "riskLevel", "summary"],
            ))
        }),
        &["categories"],
    )
}

fn overall_assessment_schema() -> Value {
    object(
        json!({
            "verdict": non_empty_string(),
            "riskLevel": level_enum(),
            "confidence": score(),
            "summary": non_empty_string()
        }),
        &["verdict", "riskLevel", "confidence", "summary"],
    )
}

fn pipeline_schema() -> Value {
    object(
        json!({
            "jobId": non_empty_string(),
            "retrieval": retrieval_schema(),
            "matching": matching_schema(),
            "findingGeneration": finding_generation_schema(),
            "agreementScoring": agreement_scoring_schema(),
            "categorySynthesis": category_synthesis_schema(),
            "overallAssessment": overall_assessment_schema()
        }),
        &[
            "jobId",
            "retrieval",
            "matching",
            "findingGeneration",
            "agreementScoring",
            "categorySynthesis",
            "overallAssessment",
        ],
    )
}
