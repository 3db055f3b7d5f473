use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A résumé row as persisted by the résumé collaborator.
///
/// `status` is stored as a string; `ResumeStatus` owns the conversion.
/// `parsed_data` and `ai_analysis` are JSON snapshots of
/// `ParsedCandidateData` and `MatchResult` respectively.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    /// The job posting the candidate applied to. Drives parse → analyze chaining.
    pub posting_id: Uuid,
    pub file_path: String,
    pub status: String,
    pub is_parsed: bool,
    pub is_analyzed: bool,
    pub parse_error: Option<String>,
    pub analysis_error: Option<String>,
    pub parsed_data: Option<Value>,
    pub ai_analysis: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Processing state of a résumé. Stored as snake_case strings on the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStatus {
    Uploaded,
    Parsing,
    Parsed,
    ParseFailed,
    /// Terminal state for quota-classified parse failures. Kept distinct
    /// from `ParseFailed` so operators can tell a quota wall from a broken
    /// résumé.
    ParseFailedQuota,
    Analyzing,
    Analyzed,
    AnalysisFailed,
}

impl ResumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeStatus::Uploaded => "uploaded",
            ResumeStatus::Parsing => "parsing",
            ResumeStatus::Parsed => "parsed",
            ResumeStatus::ParseFailed => "parse_failed",
            ResumeStatus::ParseFailedQuota => "parse_failed_quota",
            ResumeStatus::Analyzing => "analyzing",
            ResumeStatus::Analyzed => "analyzed",
            ResumeStatus::AnalysisFailed => "analysis_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(ResumeStatus::Uploaded),
            "parsing" => Some(ResumeStatus::Parsing),
            "parsed" => Some(ResumeStatus::Parsed),
            "parse_failed" => Some(ResumeStatus::ParseFailed),
            "parse_failed_quota" => Some(ResumeStatus::ParseFailedQuota),
            "analyzing" => Some(ResumeStatus::Analyzing),
            "analyzed" => Some(ResumeStatus::Analyzed),
            "analysis_failed" => Some(ResumeStatus::AnalysisFailed),
            _ => None,
        }
    }

    /// Whether this status may transition to `to`. Re-parse is allowed from
    /// every settled state; re-analyze from the analyze-side terminals.
    pub fn can_transition(&self, to: ResumeStatus) -> bool {
        use ResumeStatus::*;
        match (self, to) {
            (Uploaded, Parsing) => true,
            (Parsing, Parsed) | (Parsing, ParseFailed) | (Parsing, ParseFailedQuota) => true,
            (Parsed, Analyzing) => true,
            (Analyzing, Analyzed) | (Analyzing, AnalysisFailed) => true,
            // Manual re-parse re-enters PARSING from any settled state.
            (Parsed, Parsing)
            | (ParseFailed, Parsing)
            | (ParseFailedQuota, Parsing)
            | (Analyzed, Parsing)
            | (AnalysisFailed, Parsing) => true,
            // Manual re-analyze.
            (Analyzed, Analyzing) | (AnalysisFailed, Analyzing) => true,
            _ => false,
        }
    }
}

/// Partial update applied through `ResumeStore::update`. `None` fields are
/// left untouched; `Some` fields are written (including `Some(None)` to
/// clear an error column).
#[derive(Debug, Clone, Default)]
pub struct ResumePatch {
    pub status: Option<ResumeStatus>,
    pub is_parsed: Option<bool>,
    pub is_analyzed: Option<bool>,
    pub parse_error: Option<Option<String>>,
    pub analysis_error: Option<Option<String>>,
    pub parsed_data: Option<Value>,
    pub ai_analysis: Option<Value>,
}

/// Structured candidate data returned by the AI extraction call.
///
/// `skills` is intentionally not defaulted: an upstream response without a
/// skills array must fail deserialization and surface as an invalid
/// response, never as an empty candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCandidateData {
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub years_of_experience: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub duration_text: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub duration_text: String,
    #[serde(default)]
    pub gpa: Option<f64>,
}
