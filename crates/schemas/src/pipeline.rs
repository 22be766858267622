//! Combined pipeline output contract.

use serde::{Deserialize, Serialize};

use veritor_core::JobId;

use crate::stages::{
    AgreementScoringResult, CategorySynthesisResult, FindingGenerationResult, MatchingResult,
    OverallAssessmentResult, RetrievalResult,
};
use crate::validate::Checker;

/// The full output of a successful pipeline run, emitted once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineResult {
    pub job_id: JobId,
    pub retrieval: RetrievalResult,
    pub matching: MatchingResult,
    pub finding_generation: FindingGenerationResult,
    pub agreement_scoring: AgreementScoringResult,
    pub category_synthesis: CategorySynthesisResult,
    pub overall_assessment: OverallAssessmentResult,
}

impl PipelineResult {
    pub(crate) fn check(&self, c: &mut Checker) {
        c.non_empty_str("jobId", self.job_id.as_str());
        c.nested("retrieval", |c| self.retrieval.check(c));
        c.nested("matching", |c| self.matching.check(c));
        c.nested("findingGeneration", |c| self.finding_generation.check(c));
        c.nested("agreementScoring", |c| self.agreement_scoring.check(c));
        c.nested("categorySynthesis", |c| self.category_synthesis.check(c));
        c.nested("overallAssessment", |c| self.overall_assessment.check(c));
    }
}
