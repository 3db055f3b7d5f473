//! Job handlers for the two job kinds, plus the periodic sweep.
//!
//! The parse handler chains the analyze job on success; the analyze
//! handler trusts that chaining and does not re-check `is_parsed`. The
//! sweep covers the crash window between persisting a parse result and
//! enqueuing the follow-up.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::ai_client::CandidateExtractor;
use crate::errors::PipelineError;
use crate::extract::{self, FileKind};
use crate::matching;
use crate::models::resume::ParsedCandidateData;
use crate::queue::cache::ParseCache;
use crate::queue::Orchestrator;
use crate::resumes::StatusController;
use crate::store::{FileStore, JobPostingStore};

/// Grace period in seconds before the sweep considers a parsed-unanalyzed
/// résumé stuck. Long enough for normal chaining to win the race.
pub const SWEEP_GRACE_SECS: i64 = 120;

/// Everything a worker needs, wired once at boot and shared by reference.
pub struct WorkerContext {
    pub files: Arc<dyn FileStore>,
    pub postings: Arc<dyn JobPostingStore>,
    pub extractor: Arc<dyn CandidateExtractor>,
    pub cache: Arc<dyn ParseCache>,
    pub controller: StatusController,
}

impl Orchestrator {
    pub(crate) async fn handle_parse(
        &self,
        resume_id: Uuid,
        file_path: &str,
    ) -> Result<(), PipelineError> {
        let ctx = self.context();
        ctx.controller.begin_parse(resume_id).await?;

        // A live cache entry short-circuits extraction and the AI call
        // entirely; the result is persisted and chained as usual.
        if let Some(cached) = ctx.cache.get(resume_id).await {
            info!(resume_id = %resume_id, "parse cache hit, skipping extraction and AI call");
            return self.finish_parse(resume_id, &cached).await;
        }

        let kind = FileKind::from_path(file_path)?;
        let bytes = ctx.files.read_file(file_path).await?;

        let raw = tokio::task::spawn_blocking(move || extract::extract_text(&bytes, kind))
            .await
            .map_err(|e| PipelineError::Internal(anyhow!("extraction task panicked: {e}")))??;

        let validation = extract::validate_extracted_text(&raw);
        if !validation.valid {
            let reason = validation
                .reason
                .unwrap_or_else(|| "invalid extracted text".to_string());
            return Err(if reason.contains("too long") {
                PipelineError::TextTooLong(reason)
            } else {
                PipelineError::TextTooSparse(reason)
            });
        }

        let cleaned = extract::clean(&raw);
        let parsed = ctx.extractor.extract(&cleaned).await?;

        ctx.cache.put(resume_id, &parsed).await;
        self.finish_parse(resume_id, &parsed).await
    }

    /// Persists the parse outcome and enqueues the analyze job in the
    /// same step, so the only remaining gap is a process crash, which the
    /// sweep covers.
    async fn finish_parse(
        &self,
        resume_id: Uuid,
        parsed: &ParsedCandidateData,
    ) -> Result<(), PipelineError> {
        let ctx = self.context();
        ctx.controller.complete_parse(resume_id, parsed).await?;

        let row = ctx.controller.store().get(resume_id).await?;
        self.enqueue_analyze(resume_id, row.posting_id);
        Ok(())
    }

    pub(crate) async fn handle_analyze(
        &self,
        resume_id: Uuid,
        posting_id: Uuid,
    ) -> Result<(), PipelineError> {
        let ctx = self.context();
        ctx.controller.begin_analyze(resume_id).await?;

        let posting = ctx.postings.find(posting_id).await?;
        if !posting.is_active {
            return Err(PipelineError::PostingInactive(posting_id));
        }
        if posting.is_expired(Utc::now()) {
            return Err(PipelineError::PostingExpired(posting_id));
        }

        let row = ctx.controller.store().get(resume_id).await?;
        let data = row
            .parsed_data
            .ok_or_else(|| PipelineError::Internal(anyhow!("resume {resume_id} has no parsed data")))?;
        let candidate: ParsedCandidateData = serde_json::from_value(data)
            .map_err(|e| PipelineError::Internal(anyhow!("stored parsed data is corrupt: {e}")))?;

        let result = matching::calculate_match(&candidate, &posting.requirements);
        ctx.controller.complete_analyze(resume_id, &result).await?;
        Ok(())
    }

    /// One sweep tick: enqueue parses for freshly uploaded résumés and
    /// re-enqueue analyzes for résumés stuck parsed-but-unanalyzed.
    pub async fn sweep_once(&self, grace: chrono::Duration) -> Result<(), PipelineError> {
        let store = self.context().controller.store();

        let uploaded = store.find_uploaded().await?;
        for row in &uploaded {
            self.enqueue_parse(row.id, &row.file_path);
        }

        let stalled = store.find_parsed_unanalyzed(grace).await?;
        for row in &stalled {
            info!(resume_id = %row.id, "sweep re-enqueueing stalled analyze");
            self.enqueue_analyze(row.id, row.posting_id);
        }

        if !uploaded.is_empty() || !stalled.is_empty() {
            info!(
                uploaded = uploaded.len(),
                stalled = stalled.len(),
                "sweep enqueued work"
            );
        }
        Ok(())
    }

    /// Periodic sweep loop. Runs until `shutdown`.
    pub async fn run_sweeper(&self, interval: Duration, grace: chrono::Duration) {
        let mut shutdown = self.shutdown_signal();
        loop {
            if let Err(e) = self.sweep_once(grace).await {
                tracing::warn!("sweep failed: {e}");
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::ai_client::AiError;
    use crate::models::job::{JobLevel, JobPosting, JobRequirements};
    use crate::models::resume::ResumeStatus;
    use crate::queue::cache::MemoryParseCache;
    use crate::queue::{JobState, QueueStats};
    use crate::store::memory::{MemoryFileStore, MemoryJobPostingStore, MemoryResumeStore};
    use crate::store::ResumeStore;

    /// Extractor with a scripted outcome queue; falls back to a fixture.
    struct ScriptedExtractor {
        calls: AtomicUsize,
        script: Mutex<Vec<Result<ParsedCandidateData, AiError>>>,
    }

    impl ScriptedExtractor {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(vec![]),
            }
        }

        fn scripted(outcomes: Vec<Result<ParsedCandidateData, AiError>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(outcomes),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn fixture() -> ParsedCandidateData {
        ParsedCandidateData {
            skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
            experience: vec![],
            education: vec![],
            summary: Some("Backend engineer".to_string()),
            years_of_experience: Some(6.0),
        }
    }

    #[async_trait::async_trait]
    impl CandidateExtractor for ScriptedExtractor {
        async fn extract(&self, _resume_text: &str) -> Result<ParsedCandidateData, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().expect("script lock");
            if script.is_empty() {
                Ok(fixture())
            } else {
                script.remove(0)
            }
        }
    }

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        resumes: Arc<MemoryResumeStore>,
        postings: Arc<MemoryJobPostingStore>,
        files: Arc<MemoryFileStore>,
        extractor: Arc<ScriptedExtractor>,
    }

    fn harness(extractor: ScriptedExtractor) -> Harness {
        let resumes = Arc::new(MemoryResumeStore::new());
        let postings = Arc::new(MemoryJobPostingStore::new());
        let files = Arc::new(MemoryFileStore::new());
        let extractor = Arc::new(extractor);

        let ctx = WorkerContext {
            files: files.clone(),
            postings: postings.clone(),
            extractor: extractor.clone(),
            cache: Arc::new(MemoryParseCache::default()),
            controller: StatusController::new(resumes.clone()),
        };

        Harness {
            orchestrator: Arc::new(Orchestrator::new(ctx)),
            resumes,
            postings,
            files,
            extractor,
        }
    }

    fn seed_posting(h: &Harness) -> Uuid {
        let id = Uuid::new_v4();
        h.postings.insert(JobPosting {
            id,
            title: "Senior Backend Engineer".to_string(),
            requirements: JobRequirements {
                required_skills: vec!["Rust".to_string(), "PostgreSQL".to_string()],
                level: JobLevel::Senior,
            },
            is_active: true,
            end_date: None,
        });
        id
    }

    fn seed_resume(h: &Harness, posting_id: Uuid) -> Uuid {
        let path = format!("uploads/{}.txt", Uuid::new_v4());
        // Comfortably over the 100-character / 50-word floor.
        let body = "Experienced backend engineer with Rust and PostgreSQL. ".repeat(12);
        h.files.insert(&path, body.into_bytes());
        h.resumes.seed(posting_id, &path)
    }

    /// Runs a worker until the queue is fully drained. The worker task is
    /// aborted rather than shut down so a test can drain repeatedly.
    async fn drain(h: &Harness) {
        let orchestrator = h.orchestrator.clone();
        let worker = tokio::spawn(async move { orchestrator.run_worker().await });

        for _ in 0..2000 {
            let stats = h.orchestrator.stats();
            if stats.waiting == 0 && stats.active == 0 && stats.delayed == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        worker.abort();
        let _ = worker.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_chains_analyze_to_completion() {
        let h = harness(ScriptedExtractor::ok());
        let posting_id = seed_posting(&h);
        let resume_id = seed_resume(&h, posting_id);

        let handle = h.orchestrator.enqueue_parse(resume_id, &h.resumes.get(resume_id).await.unwrap().file_path);
        assert_eq!(handle.kind, "parse");
        drain(&h).await;

        let row = h.resumes.get(resume_id).await.unwrap();
        assert!(row.is_parsed);
        assert!(row.is_analyzed);
        assert_eq!(row.status, ResumeStatus::Analyzed.as_str());
        assert!(row.ai_analysis.is_some());

        // Parse + the chained analyze both completed.
        assert_eq!(
            h.orchestrator.stats(),
            QueueStats {
                waiting: 0,
                active: 0,
                completed: 2,
                failed: 0,
                delayed: 0
            }
        );
        assert_eq!(h.extractor.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_analyze_when_parse_fails() {
        let h = harness(ScriptedExtractor::scripted(vec![Err(
            AiError::InvalidResponse("not a json object".to_string()),
        )]));
        let posting_id = seed_posting(&h);
        let resume_id = seed_resume(&h, posting_id);

        h.orchestrator
            .enqueue_parse(resume_id, &h.resumes.get(resume_id).await.unwrap().file_path);
        drain(&h).await;

        let row = h.resumes.get(resume_id).await.unwrap();
        assert!(!row.is_parsed);
        assert_eq!(row.status, ResumeStatus::ParseFailed.as_str());
        assert!(row.parse_error.as_deref().unwrap().contains("not a json object"));

        // Terminal on first sight: InvalidResponse spends no retries, and
        // no analyze job was ever created.
        let stats = h.orchestrator.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 0);
        assert_eq!(h.extractor.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_prevents_second_ai_call() {
        let h = harness(ScriptedExtractor::ok());
        let posting_id = seed_posting(&h);
        let resume_id = seed_resume(&h, posting_id);
        let path = h.resumes.get(resume_id).await.unwrap().file_path;

        h.orchestrator.enqueue_parse(resume_id, &path);
        drain(&h).await;
        assert_eq!(h.extractor.calls(), 1);

        // Re-parse within the TTL: served from cache, still re-analyzed.
        h.orchestrator.enqueue_parse(resume_id, &path);
        drain(&h).await;

        assert_eq!(h.extractor.calls(), 1);
        let row = h.resumes.get(resume_id).await.unwrap();
        assert!(row.is_parsed && row.is_analyzed);
        assert_eq!(h.orchestrator.stats().completed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_error_retries_then_succeeds() {
        let h = harness(ScriptedExtractor::scripted(vec![
            Err(AiError::Upstream {
                status: 503,
                message: "overloaded".to_string(),
            }),
            Ok(fixture()),
        ]));
        let posting_id = seed_posting(&h);
        let resume_id = seed_resume(&h, posting_id);

        let handle = h
            .orchestrator
            .enqueue_parse(resume_id, &h.resumes.get(resume_id).await.unwrap().file_path);
        drain(&h).await;

        assert_eq!(h.extractor.calls(), 2);
        let job = h.orchestrator.get_job(handle.id).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.attempt, 1);
        assert!(h.resumes.get(resume_id).await.unwrap().is_analyzed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_exhausted_marks_failed() {
        let upstream = || {
            Err(AiError::Upstream {
                status: 503,
                message: "overloaded".to_string(),
            })
        };
        let h = harness(ScriptedExtractor::scripted(vec![
            upstream(),
            upstream(),
            upstream(),
        ]));
        let posting_id = seed_posting(&h);
        let resume_id = seed_resume(&h, posting_id);

        let handle = h
            .orchestrator
            .enqueue_parse(resume_id, &h.resumes.get(resume_id).await.unwrap().file_path);
        drain(&h).await;

        assert_eq!(h.extractor.calls(), 3);
        let job = h.orchestrator.get_job(handle.id).unwrap();
        assert_eq!(job.state, JobState::Failed);

        let row = h.resumes.get(resume_id).await.unwrap();
        assert!(!row.is_parsed);
        assert_eq!(row.status, ResumeStatus::ParseFailed.as_str());
        assert!(row.parse_error.as_deref().unwrap().contains("overloaded"));
        assert_eq!(h.orchestrator.stats().failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_exhaustion_completes_job_with_quota_status() {
        let h = harness(ScriptedExtractor::scripted(vec![Err(
            AiError::RateLimited { retries: 3 },
        )]));
        let posting_id = seed_posting(&h);
        let resume_id = seed_resume(&h, posting_id);

        let handle = h
            .orchestrator
            .enqueue_parse(resume_id, &h.resumes.get(resume_id).await.unwrap().file_path);
        drain(&h).await;

        // The job is completed (no retry storm against a spent quota) but
        // the résumé records the failure honestly.
        let job = h.orchestrator.get_job(handle.id).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(h.extractor.calls(), 1);

        let row = h.resumes.get(resume_id).await.unwrap();
        assert_eq!(row.status, ResumeStatus::ParseFailedQuota.as_str());
        assert!(!row.is_parsed);
        assert!(row.parse_error.is_some());
        assert_eq!(h.orchestrator.stats().failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sparse_text_fails_without_ai_call() {
        let h = harness(ScriptedExtractor::ok());
        let posting_id = seed_posting(&h);

        let path = "uploads/sparse.txt";
        // 40 words, past the character floor: rejected on word count.
        let body = (0..40).map(|i| format!("word{i:04}")).collect::<Vec<_>>().join(" ");
        h.files.insert(path, body.into_bytes());
        let resume_id = h.resumes.seed(posting_id, path);

        h.orchestrator.enqueue_parse(resume_id, path);
        drain(&h).await;

        assert_eq!(h.extractor.calls(), 0);
        let row = h.resumes.get(resume_id).await.unwrap();
        assert_eq!(row.status, ResumeStatus::ParseFailed.as_str());
        assert_eq!(row.parse_error.as_deref(), Some("Not enough words (< 50)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_extension_fails_without_ai_call() {
        let h = harness(ScriptedExtractor::ok());
        let posting_id = seed_posting(&h);
        let path = "uploads/cv.xlsx";
        h.files.insert(path, b"irrelevant".to_vec());
        let resume_id = h.resumes.seed(posting_id, path);

        h.orchestrator.enqueue_parse(resume_id, path);
        drain(&h).await;

        assert_eq!(h.extractor.calls(), 0);
        let row = h.resumes.get(resume_id).await.unwrap();
        assert!(row.parse_error.as_deref().unwrap().contains("xlsx"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_refused_for_inactive_posting() {
        let h = harness(ScriptedExtractor::ok());
        let posting_id = Uuid::new_v4();
        h.postings.insert(JobPosting {
            id: posting_id,
            title: "Closed role".to_string(),
            requirements: JobRequirements {
                required_skills: vec!["Rust".to_string()],
                level: JobLevel::Senior,
            },
            is_active: false,
            end_date: None,
        });
        let resume_id = seed_resume(&h, posting_id);

        h.orchestrator
            .enqueue_parse(resume_id, &h.resumes.get(resume_id).await.unwrap().file_path);
        drain(&h).await;

        let row = h.resumes.get(resume_id).await.unwrap();
        assert!(row.is_parsed);
        assert!(!row.is_analyzed);
        assert_eq!(row.status, ResumeStatus::AnalysisFailed.as_str());
        assert!(row.analysis_error.as_deref().unwrap().contains("no longer active"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_dedupes_waiting_jobs() {
        let h = harness(ScriptedExtractor::ok());
        let posting_id = seed_posting(&h);
        let resume_id = seed_resume(&h, posting_id);
        let path = h.resumes.get(resume_id).await.unwrap().file_path;

        let first = h.orchestrator.enqueue_parse(resume_id, &path);
        let second = h.orchestrator.enqueue_parse(resume_id, &path);

        assert_eq!(first.id, second.id);
        assert_eq!(h.orchestrator.stats().waiting, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_enqueues_uploaded_and_stalled_resumes() {
        let h = harness(ScriptedExtractor::ok());
        let posting_id = seed_posting(&h);

        // One freshly uploaded resume, and one stuck parsed-but-unanalyzed
        // (the crash gap).
        let uploaded_id = seed_resume(&h, posting_id);

        let stalled_id = seed_resume(&h, posting_id);
        let ctx_controller = StatusController::new(h.resumes.clone());
        ctx_controller.begin_parse(stalled_id).await.unwrap();
        ctx_controller.complete_parse(stalled_id, &fixture()).await.unwrap();

        h.orchestrator
            .sweep_once(chrono::Duration::seconds(-1))
            .await
            .unwrap();
        assert_eq!(h.orchestrator.stats().waiting, 2);

        drain(&h).await;

        assert!(h.resumes.get(uploaded_id).await.unwrap().is_analyzed);
        assert!(h.resumes.get(stalled_id).await.unwrap().is_analyzed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_idle_worker() {
        let h = harness(ScriptedExtractor::ok());
        let orchestrator = h.orchestrator.clone();
        let worker = tokio::spawn(async move { orchestrator.run_worker().await });

        h.orchestrator.shutdown();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .expect("worker should exit on shutdown")
            .expect("worker task");
    }
}
