//! Pipeline execution: six sequential stages, schema-checked between each.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use veritor_schemas::{
    validate_agreement_scoring, validate_category_synthesis, validate_finding_generation,
    validate_matching, validate_overall_assessment, validate_pipeline, validate_retrieval,
    PipelineResult, ReasoningJob, SchemaError,
};

use crate::llm::{LlmClient, LlmError};
use crate::stages::{inputs, Stage};

/// A stage-level failure. The message always names the stage and, where
/// relevant, the HTTP status or the first parser/validator error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct StageError {
    pub stage: &'static str,
    pub message: String,
}

impl StageError {
    fn llm(stage: Stage, err: LlmError) -> Self {
        let message = match err {
            LlmError::Status { status, body } => {
                format!("{} request failed with status {status}: {body}", stage.name())
            }
            other => format!("{} request failed: {other}", stage.name()),
        };
        Self {
            stage: stage.name(),
            message,
        }
    }

    fn empty(stage: Stage) -> Self {
        Self {
            stage: stage.name(),
            message: format!("{} response was empty", stage.name()),
        }
    }

    fn not_json(stage: Stage, err: serde_json::Error) -> Self {
        Self {
            stage: stage.name(),
            message: format!("{} response was not valid JSON: {err}", stage.name()),
        }
    }

    fn schema(stage: Stage, err: SchemaError) -> Self {
        Self {
            stage: stage.name(),
            message: err.to_string(),
        }
    }
}

/// Run one stage: compose the request, invoke the model, parse and validate.
async fn run_stage<T>(
    llm: &dyn LlmClient,
    stage: Stage,
    input: Value,
    validate: fn(&Value) -> Result<T, SchemaError>,
) -> Result<T, StageError> {
    let request = stage.request(&input);
    let response = llm
        .chat(&request)
        .await
        .map_err(|e| StageError::llm(stage, e))?;

    let content = response
        .first_content()
        .ok_or_else(|| StageError::empty(stage))?;

    let parsed: Value =
        serde_json::from_str(content).map_err(|e| StageError::not_json(stage, e))?;

    let typed = validate(&parsed).map_err(|e| StageError::schema(stage, e))?;
    debug!(stage = stage.name(), "stage output validated");
    Ok(typed)
}

/// Execute the full six-stage pipeline for one job.
///
/// Stages run sequentially (each input embeds validated predecessor outputs)
/// with no retries; the assembled record is revalidated as a whole before it
/// is returned.
pub async fn run_pipeline(
    llm: &dyn LlmClient,
    job: &ReasoningJob,
) -> Result<PipelineResult, StageError> {
    let retrieval = run_stage(
        llm,
        Stage::Retrieval,
        inputs::retrieval(job),
        validate_retrieval,
    )
    .await?;

    let matching = run_stage(
        llm,
        Stage::Matching,
        inputs::matching(job, &retrieval),
        validate_matching,
    )
    .await?;

    let finding_generation = run_stage(
        llm,
        Stage::FindingGeneration,
        inputs::finding_generation(job, &matching),
        validate_finding_generation,
    )
    .await?;

    let agreement_scoring = run_stage(
        llm,
        Stage::AgreementScoring,
        inputs::agreement_scoring(job, &finding_generation),
        validate_agreement_scoring,
    )
    .await?;

    let category_synthesis = run_stage(
        llm,
        Stage::CategorySynthesis,
        inputs::category_synthesis(&finding_generation, &agreement_scoring),
        validate_category_synthesis,
    )
    .await?;

    let overall_assessment = run_stage(
        llm,
        Stage::OverallAssessment,
        inputs::overall_assessment(job, &finding_generation, &agreement_scoring, &category_synthesis),
        validate_overall_assessment,
    )
    .await?;

    let result = PipelineResult {
        job_id: job.job_id.clone(),
        retrieval,
        matching,
        finding_generation,
        agreement_scoring,
        category_synthesis,
        overall_assessment,
    };

    let value = serde_json::to_value(&result).map_err(|e| StageError {
        stage: "Pipeline",
        message: format!("pipeline result not serializable: {e}"),
    })?;
    validate_pipeline(&value).map_err(|e| StageError {
        stage: "Pipeline",
        message: e.to_string(),
    })?;

    Ok(result)
}
