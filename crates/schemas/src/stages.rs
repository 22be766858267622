//! Stage output contracts for the six-stage reasoning pipeline.
//!
//! Each record mirrors what the LLM is instructed to produce. Scores and
//! relevance/agreement/confidence values are bounded to `[0, 1]`; severity
//! and risk enumerations admit only `low`, `medium`, `high`.

use serde::{Deserialize, Serialize};

use crate::validate::Checker;

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Aggregate risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage 1: Retrieval
// ─────────────────────────────────────────────────────────────────────────────

/// Passages pulled from the job's documents that bear on the claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RetrievalResult {
    pub passages: Vec<Passage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Passage {
    pub document_id: String,
    pub excerpt: String,
    pub relevance: f64,
}

impl RetrievalResult {
    pub(crate) fn check(&self, c: &mut Checker) {
        c.non_empty_list("passages", &self.passages);
        for (i, p) in self.passages.iter().enumerate() {
            c.non_empty_str(&format!("passages[{i}].documentId"), &p.document_id);
            c.non_empty_str(&format!("passages[{i}].excerpt"), &p.excerpt);
            c.unit_interval(&format!("passages[{i}].relevance"), p.relevance);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage 2: Matching
// ─────────────────────────────────────────────────────────────────────────────

/// Per-criterion match decisions against the retrieved passages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MatchingResult {
    pub matches: Vec<CriterionMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CriterionMatch {
    pub criterion_id: String,
    pub matched: bool,
    pub relevance: f64,
    pub rationale: String,
}

impl MatchingResult {
    pub(crate) fn check(&self, c: &mut Checker) {
        c.non_empty_list("matches", &self.matches);
        for (i, m) in self.matches.iter().enumerate() {
            c.non_empty_str(&format!("matches[{i}].criterionId"), &m.criterion_id);
            c.unit_interval(&format!("matches[{i}].relevance"), m.relevance);
            c.non_empty_str(&format!("matches[{i}].rationale"), &m.rationale);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage 3: Finding generation
// ─────────────────────────────────────────────────────────────────────────────

/// Findings derived from the matched criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FindingGenerationResult {
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Finding {
    pub id: String,
    pub statement: String,
    pub severity: Severity,
    pub confidence: f64,
}

impl FindingGenerationResult {
    pub(crate) fn check(&self, c: &mut Checker) {
        c.non_empty_list("findings", &self.findings);
        for (i, f) in self.findings.iter().enumerate() {
            c.non_empty_str(&format!("findings[{i}].id"), &f.id);
            c.non_empty_str(&format!("findings[{i}].statement"), &f.statement);
            c.unit_interval(&format!("findings[{i}].confidence"), f.confidence);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage 4: Agreement scoring
// ─────────────────────────────────────────────────────────────────────────────

/// How strongly the evidence agrees with each finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AgreementScoringResult {
    pub agreements: Vec<Agreement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Agreement {
    pub finding_id: String,
    pub agreement: f64,
    pub rationale: String,
}

impl AgreementScoringResult {
    pub(crate) fn check(&self, c: &mut Checker) {
        c.non_empty_list("agreements", &self.agreements);
        for (i, a) in self.agreements.iter().enumerate() {
            c.non_empty_str(&format!("agreements[{i}].findingId"), &a.finding_id);
            c.unit_interval(&format!("agreements[{i}].agreement"), a.agreement);
            c.non_empty_str(&format!("agreements[{i}].rationale"), &a.rationale);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage 5: Category synthesis
// ─────────────────────────────────────────────────────────────────────────────

/// Findings grouped into named risk categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategorySynthesisResult {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Category {
    pub name: String,
    pub risk_level: RiskLevel,
    pub summary: String,
}

impl CategorySynthesisResult {
    pub(crate) fn check(&self, c: &mut Checker) {
        c.non_empty_list("categories", &self.categories);
        for (i, cat) in self.categories.iter().enumerate() {
            c.non_empty_str(&format!("categories[{i}].name"), &cat.name);
            c.non_empty_str(&format!("categories[{i}].summary"), &cat.summary);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage 6: Overall assessment
// ─────────────────────────────────────────────────────────────────────────────

/// The final verdict over the whole claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OverallAssessmentResult {
    pub verdict: String,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub summary: String,
}

impl OverallAssessmentResult {
    pub(crate) fn check(&self, c: &mut Checker) {
        c.non_empty_str("verdict", &self.verdict);
        c.unit_interval("confidence", self.confidence);
        c.non_empty_str("summary", &self.summary);
    }
}
