//! Schema registry: `validate(kind, value)` with composite error reporting.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::job::ReasoningJob;
use crate::pipeline::PipelineResult;
use crate::stages::{
    AgreementScoringResult, CategorySynthesisResult, FindingGenerationResult, MatchingResult,
    OverallAssessmentResult, RetrievalResult,
};

/// The payload kinds the registry knows how to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Job,
    Retrieval,
    Matching,
    FindingGeneration,
    AgreementScoring,
    CategorySynthesis,
    OverallAssessment,
    Pipeline,
}

impl SchemaKind {
    /// Human-readable label used in validation error messages.
    pub fn label(&self) -> &'static str {
        match self {
            SchemaKind::Job => "Job",
            SchemaKind::Retrieval => "Retrieval",
            SchemaKind::Matching => "Matching",
            SchemaKind::FindingGeneration => "Finding generation",
            SchemaKind::AgreementScoring => "Agreement scoring",
            SchemaKind::CategorySynthesis => "Category synthesis",
            SchemaKind::OverallAssessment => "Overall assessment",
            SchemaKind::Pipeline => "Pipeline result",
        }
    }
}

/// A single schema violation at a JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

/// Composite validation failure for one payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", self.render())]
pub struct SchemaError {
    pub label: &'static str,
    pub violations: Vec<Violation>,
}

impl SchemaError {
    fn render(&self) -> String {
        let details: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{} {}", v.path, v.message))
            .collect();
        format!("{} failed schema validation: {}", self.label, details.join("; "))
    }
}

/// A successfully validated, typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedPayload {
    Job(ReasoningJob),
    Retrieval(RetrievalResult),
    Matching(MatchingResult),
    FindingGeneration(FindingGenerationResult),
    AgreementScoring(AgreementScoringResult),
    CategorySynthesis(CategorySynthesisResult),
    OverallAssessment(OverallAssessmentResult),
    Pipeline(PipelineResult),
}

/// Validate `value` against the schema for `kind`.
///
/// Returns the typed payload, or a [`SchemaError`] carrying every violation
/// found (structural mismatches are reported first and short-circuit the
/// invariant checks, since the typed value cannot be built).
pub fn validate(kind: SchemaKind, value: &Value) -> Result<ValidatedPayload, SchemaError> {
    match kind {
        SchemaKind::Job => parse(kind, value, ReasoningJob::check).map(ValidatedPayload::Job),
        SchemaKind::Retrieval => {
            parse(kind, value, RetrievalResult::check).map(ValidatedPayload::Retrieval)
        }
        SchemaKind::Matching => {
            parse(kind, value, MatchingResult::check).map(ValidatedPayload::Matching)
        }
        SchemaKind::FindingGeneration => parse(kind, value, FindingGenerationResult::check)
            .map(ValidatedPayload::FindingGeneration),
        SchemaKind::AgreementScoring => parse(kind, value, AgreementScoringResult::check)
            .map(ValidatedPayload::AgreementScoring),
        SchemaKind::CategorySynthesis => parse(kind, value, CategorySynthesisResult::check)
            .map(ValidatedPayload::CategorySynthesis),
        SchemaKind::OverallAssessment => parse(kind, value, OverallAssessmentResult::check)
            .map(ValidatedPayload::OverallAssessment),
        SchemaKind::Pipeline => {
            parse(kind, value, PipelineResult::check).map(ValidatedPayload::Pipeline)
        }
    }
}

/// Typed entry point used by the pipeline and admission paths.
pub(crate) fn parse<T>(
    kind: SchemaKind,
    value: &Value,
    check: impl FnOnce(&T, &mut Checker),
) -> Result<T, SchemaError>
where
    T: DeserializeOwned,
{
    let typed: T = serde_json::from_value(value.clone()).map_err(|e| SchemaError {
        label: kind.label(),
        violations: vec![Violation {
            path: "$".to_string(),
            message: e.to_string(),
        }],
    })?;

    let mut checker = Checker::new();
    check(&typed, &mut checker);
    checker.finish(kind.label())?;
    Ok(typed)
}

/// Typed validators (one per kind) consumed by the pipeline stages.
macro_rules! typed_validator {
    ($fn_name:ident, $ty:ty, $kind:expr) => {
        pub fn $fn_name(value: &Value) -> Result<$ty, SchemaError> {
            parse($kind, value, <$ty>::check)
        }
    };
}

typed_validator!(validate_job, ReasoningJob, SchemaKind::Job);
typed_validator!(validate_retrieval, RetrievalResult, SchemaKind::Retrieval);
typed_validator!(validate_matching, MatchingResult, SchemaKind::Matching);
typed_validator!(
    validate_finding_generation,
    FindingGenerationResult,
    SchemaKind::FindingGeneration
);
typed_validator!(
    validate_agreement_scoring,
    AgreementScoringResult,
    SchemaKind::AgreementScoring
);
typed_validator!(
    validate_category_synthesis,
    CategorySynthesisResult,
    SchemaKind::CategorySynthesis
);
typed_validator!(
    validate_overall_assessment,
    OverallAssessmentResult,
    SchemaKind::OverallAssessment
);
typed_validator!(validate_pipeline, PipelineResult, SchemaKind::Pipeline);

/// Accumulates violations while walking a typed payload.
pub(crate) struct Checker {
    prefix: String,
    violations: Vec<Violation>,
}

impl Checker {
    fn new() -> Self {
        Self {
            prefix: String::new(),
            violations: Vec::new(),
        }
    }

    fn path(&self, rel: &str) -> String {
        if self.prefix.is_empty() {
            rel.to_string()
        } else {
            format!("{}.{}", self.prefix, rel)
        }
    }

    pub(crate) fn non_empty_str(&mut self, rel: &str, value: &str) {
        if value.trim().is_empty() {
            self.violations.push(Violation {
                path: self.path(rel),
                message: "must be a non-empty string".to_string(),
            });
        }
    }

    pub(crate) fn unit_interval(&mut self, rel: &str, value: f64) {
        if !(0.0..=1.0).contains(&value) || !value.is_finite() {
            self.violations.push(Violation {
                path: self.path(rel),
                message: format!("must be within [0, 1], got {value}"),
            });
        }
    }

    pub(crate) fn non_empty_list<T>(&mut self, rel: &str, items: &[T]) {
        if items.is_empty() {
            self.violations.push(Violation {
                path: self.path(rel),
                message: "must contain at least one item".to_string(),
            });
        }
    }

    /// Run checks with a path prefix (for embedded records).
    pub(crate) fn nested(&mut self, rel: &str, f: impl FnOnce(&mut Checker)) {
        let saved = self.prefix.clone();
        self.prefix = self.path(rel);
        f(self);
        self.prefix = saved;
    }

    fn finish(self, label: &'static str) -> Result<(), SchemaError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError {
                label,
                violations: self.violations,
            })
        }
    }
}
