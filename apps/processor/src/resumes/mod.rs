//! Résumé State Controller — the only writer of a résumé's processing
//! state. Workers report outcomes here; nothing else may flip
//! `is_parsed`/`is_analyzed` or the error columns.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::matching::MatchResult;
use crate::models::resume::{ParsedCandidateData, ResumePatch, ResumeRow, ResumeStatus};
use crate::store::ResumeStore;

pub struct StatusController {
    store: Arc<dyn ResumeStore>,
}

impl StatusController {
    pub fn new(store: Arc<dyn ResumeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ResumeStore> {
        &self.store
    }

    async fn transition(
        &self,
        id: Uuid,
        to: ResumeStatus,
        mut patch: ResumePatch,
    ) -> Result<ResumeRow, PipelineError> {
        let row = self.store.get(id).await?;
        let from = ResumeStatus::parse(&row.status).unwrap_or(ResumeStatus::Uploaded);
        if !from.can_transition(to) {
            return Err(PipelineError::InvalidTransition { from, to });
        }
        patch.status = Some(to);
        self.store.update(id, patch).await?;
        Ok(row)
    }

    /// Marks the résumé as PARSING. Clears a stale parse error so a manual
    /// re-parse starts from a clean slate.
    pub async fn begin_parse(&self, id: Uuid) -> Result<ResumeRow, PipelineError> {
        self.transition(
            id,
            ResumeStatus::Parsing,
            ResumePatch {
                parse_error: Some(None),
                ..Default::default()
            },
        )
        .await
    }

    /// Persists parsed data, the `is_parsed` flag, and the PARSED status
    /// in one patch, so a crash cannot leave data without the flag.
    pub async fn complete_parse(
        &self,
        id: Uuid,
        data: &ParsedCandidateData,
    ) -> Result<(), PipelineError> {
        self.transition(
            id,
            ResumeStatus::Parsed,
            ResumePatch {
                is_parsed: Some(true),
                parse_error: Some(None),
                parsed_data: Some(json!(data)),
                ..Default::default()
            },
        )
        .await?;
        info!(resume_id = %id, "resume parsed");
        Ok(())
    }

    /// Records a terminal parse failure. Quota-classified failures get
    /// their own status so they are distinguishable from broken résumés.
    pub async fn fail_parse(
        &self,
        id: Uuid,
        error: &str,
        quota: bool,
    ) -> Result<(), PipelineError> {
        let to = if quota {
            ResumeStatus::ParseFailedQuota
        } else {
            ResumeStatus::ParseFailed
        };
        self.transition(
            id,
            to,
            ResumePatch {
                is_parsed: Some(false),
                parse_error: Some(Some(error.to_string())),
                ..Default::default()
            },
        )
        .await?;
        warn!(resume_id = %id, quota, "resume parse failed: {error}");
        Ok(())
    }

    pub async fn begin_analyze(&self, id: Uuid) -> Result<ResumeRow, PipelineError> {
        self.transition(
            id,
            ResumeStatus::Analyzing,
            ResumePatch {
                analysis_error: Some(None),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn complete_analyze(
        &self,
        id: Uuid,
        result: &MatchResult,
    ) -> Result<(), PipelineError> {
        self.transition(
            id,
            ResumeStatus::Analyzed,
            ResumePatch {
                is_analyzed: Some(true),
                analysis_error: Some(None),
                ai_analysis: Some(json!(result)),
                ..Default::default()
            },
        )
        .await?;
        info!(resume_id = %id, score = result.score, "resume analyzed");
        Ok(())
    }

    pub async fn fail_analyze(&self, id: Uuid, error: &str) -> Result<(), PipelineError> {
        self.transition(
            id,
            ResumeStatus::AnalysisFailed,
            ResumePatch {
                is_analyzed: Some(false),
                analysis_error: Some(Some(error.to_string())),
                ..Default::default()
            },
        )
        .await?;
        warn!(resume_id = %id, "resume analysis failed: {error}");
        Ok(())
    }
}
