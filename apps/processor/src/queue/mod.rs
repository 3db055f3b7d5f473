//! Job Queue Orchestrator.
//!
//! One logical lane for both job kinds, gated by the AI client's quota:
//! concurrency is fixed at a single worker, PARSE outranks ANALYZE, and
//! retries re-enter through a delayed set. The orchestrator is an
//! explicitly constructed instance, created at boot and drained at
//! shutdown, never a global.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::PipelineError;

pub mod cache;
pub mod worker;

pub use worker::WorkerContext;

/// Attempts per job, on top of the AI client's internal retries.
pub const MAX_JOB_ATTEMPTS: u32 = 3;
/// Base for the job-level backoff schedule: `base * 2^attempt`.
pub const JOB_BACKOFF_BASE_MS: u64 = 2000;

const PARSE_PRIORITY: u8 = 1;
const ANALYZE_PRIORITY: u8 = 2;

/// A unit of asynchronous work. The payload travels with the kind so
/// dispatch is a match, not a string comparison.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum JobKind {
    Parse { resume_id: Uuid, file_path: String },
    Analyze { resume_id: Uuid, posting_id: Uuid },
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Parse { .. } => "parse",
            JobKind::Analyze { .. } => "analyze",
        }
    }

    fn priority(&self) -> u8 {
        match self {
            JobKind::Parse { .. } => PARSE_PRIORITY,
            JobKind::Analyze { .. } => ANALYZE_PRIORITY,
        }
    }

    fn resume_id(&self) -> Uuid {
        match self {
            JobKind::Parse { resume_id, .. } | JobKind::Analyze { resume_id, .. } => *resume_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Waiting,
    Delayed,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
struct JobRecord {
    id: Uuid,
    kind: JobKind,
    attempt: u32,
    created_at: DateTime<Utc>,
    state: JobState,
    last_error: Option<String>,
}

/// Caller-facing view of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobHandle {
    pub id: Uuid,
    pub kind: &'static str,
    pub state: JobState,
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
}

impl JobHandle {
    fn of(record: &JobRecord) -> Self {
        JobHandle {
            id: record.id,
            kind: record.kind.name(),
            state: record.state,
            attempt: record.attempt,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub delayed: usize,
}

// Ready jobs drain lowest (priority, seq) first: PARSE before ANALYZE,
// FIFO within a priority. BinaryHeap is a max-heap, so Ord is inverted.
#[derive(Debug, PartialEq, Eq)]
struct ReadyEntry {
    priority: u8,
    seq: u64,
    id: Uuid,
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.priority, other.seq).cmp(&(self.priority, self.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct DelayedEntry {
    run_at: Instant,
    priority: u8,
    seq: u64,
    id: Uuid,
}

#[derive(Default)]
struct QueueInner {
    ready: BinaryHeap<ReadyEntry>,
    delayed: Vec<DelayedEntry>,
    records: HashMap<Uuid, JobRecord>,
    seq: u64,
    active: Option<Uuid>,
    completed: usize,
    failed: usize,
}

/// Delay before re-running a job that has already made `attempt` attempts.
fn job_backoff(attempt: u32) -> Duration {
    Duration::from_millis(JOB_BACKOFF_BASE_MS * 2u64.pow(attempt.min(8)))
}

pub struct Orchestrator {
    inner: Mutex<QueueInner>,
    notify: Notify,
    shutdown: watch::Sender<bool>,
    ctx: WorkerContext,
}

impl Orchestrator {
    pub fn new(ctx: WorkerContext) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Mutex::new(QueueInner::default()),
            notify: Notify::new(),
            shutdown,
            ctx,
        }
    }

    pub(crate) fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Enqueues a parse job for an uploaded résumé. Non-blocking.
    pub fn enqueue_parse(&self, resume_id: Uuid, file_path: &str) -> JobHandle {
        self.enqueue(JobKind::Parse {
            resume_id,
            file_path: file_path.to_string(),
        })
    }

    /// Enqueues an analyze job. Called by the parse handler on success
    /// (chaining), by the sweep, and by manual re-analyze requests.
    pub fn enqueue_analyze(&self, resume_id: Uuid, posting_id: Uuid) -> JobHandle {
        self.enqueue(JobKind::Analyze {
            resume_id,
            posting_id,
        })
    }

    fn enqueue(&self, kind: JobKind) -> JobHandle {
        let mut inner = self.inner.lock().expect("queue lock");

        // One live job per (kind, résumé): duplicate submissions and
        // overlapping sweep ticks collapse onto the existing job.
        let duplicate = inner.records.values().find(|r| {
            matches!(r.state, JobState::Waiting | JobState::Delayed | JobState::Active)
                && r.kind.name() == kind.name()
                && r.kind.resume_id() == kind.resume_id()
        });
        if let Some(existing) = duplicate {
            return JobHandle::of(existing);
        }

        let record = JobRecord {
            id: Uuid::new_v4(),
            kind,
            attempt: 0,
            created_at: Utc::now(),
            state: JobState::Waiting,
            last_error: None,
        };
        let handle = JobHandle::of(&record);

        inner.seq += 1;
        let entry = ReadyEntry {
            priority: record.kind.priority(),
            seq: inner.seq,
            id: record.id,
        };
        info!(job_id = %record.id, kind = record.kind.name(), "job enqueued");
        inner.records.insert(record.id, record);
        inner.ready.push(entry);
        drop(inner);

        self.notify.notify_one();
        handle
    }

    pub fn get_job(&self, id: Uuid) -> Option<JobHandle> {
        self.inner
            .lock()
            .expect("queue lock")
            .records
            .get(&id)
            .map(JobHandle::of)
    }

    pub fn stats(&self) -> QueueStats {
        let inner = self.inner.lock().expect("queue lock");
        QueueStats {
            waiting: inner.ready.len(),
            active: usize::from(inner.active.is_some()),
            completed: inner.completed,
            failed: inner.failed,
            delayed: inner.delayed.len(),
        }
    }

    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Signals the worker to stop after its in-flight job.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        self.notify.notify_waiters();
    }

    /// The single worker loop for this lane. Runs until `shutdown`.
    pub async fn run_worker(&self) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            if *shutdown.borrow() {
                let waiting = self.stats().waiting;
                info!(waiting, "worker draining: shutdown requested");
                return;
            }

            let (job, next_due) = self.claim_next();
            match job {
                Some(record) => {
                    self.process(record).await;
                }
                None => {
                    let sleep_until_due = async {
                        match next_due {
                            Some(at) => tokio::time::sleep_until(at).await,
                            None => std::future::pending::<()>().await,
                        }
                    };
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = sleep_until_due => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }
    }

    /// Promotes due delayed jobs, then claims the highest-priority ready
    /// job. Returns the claimed record and the next delayed deadline.
    fn claim_next(&self) -> (Option<JobRecord>, Option<Instant>) {
        let mut inner = self.inner.lock().expect("queue lock");
        let now = Instant::now();

        let mut idx = 0;
        while idx < inner.delayed.len() {
            if inner.delayed[idx].run_at <= now {
                let due = inner.delayed.swap_remove(idx);
                if let Some(record) = inner.records.get_mut(&due.id) {
                    record.state = JobState::Waiting;
                }
                inner.ready.push(ReadyEntry {
                    priority: due.priority,
                    seq: due.seq,
                    id: due.id,
                });
            } else {
                idx += 1;
            }
        }

        let next_due = inner.delayed.iter().map(|d| d.run_at).min();

        let claimed = match inner.ready.pop() {
            Some(entry) => inner.records.get_mut(&entry.id).map(|record| {
                record.state = JobState::Active;
                record.clone()
            }),
            None => None,
        };
        if let Some(record) = &claimed {
            inner.active = Some(record.id);
        }

        (claimed, next_due)
    }

    async fn process(&self, record: JobRecord) {
        info!(
            job_id = %record.id,
            kind = record.kind.name(),
            attempt = record.attempt,
            "processing job"
        );

        let result = match &record.kind {
            JobKind::Parse {
                resume_id,
                file_path,
            } => self.handle_parse(*resume_id, file_path).await,
            JobKind::Analyze {
                resume_id,
                posting_id,
            } => self.handle_analyze(*resume_id, *posting_id).await,
        };

        match result {
            Ok(()) => {
                info!(job_id = %record.id, kind = record.kind.name(), "job completed");
                self.settle(record.id, JobState::Completed, None);
            }
            Err(e) => self.handle_job_error(record, e).await,
        }
    }

    async fn handle_job_error(&self, record: JobRecord, err: PipelineError) {
        if err.is_quota() {
            // Retrying would only re-hit the exhausted quota. The job is
            // completed to stop the retry storm; the résumé record keeps
            // the honest quota-failure state.
            warn!(
                job_id = %record.id,
                kind = record.kind.name(),
                "quota exhausted; completing job without retry: {err}"
            );
            self.record_stage_failure(&record.kind, &err, true).await;
            self.settle(record.id, JobState::Completed, Some(err.to_string()));
            return;
        }

        if err.is_retryable() && record.attempt + 1 < MAX_JOB_ATTEMPTS {
            let delay = job_backoff(record.attempt);
            warn!(
                job_id = %record.id,
                kind = record.kind.name(),
                attempt = record.attempt,
                delay_ms = delay.as_millis() as u64,
                "job failed, retrying: {err}"
            );
            let mut inner = self.inner.lock().expect("queue lock");
            inner.active = None;
            inner.seq += 1;
            let seq = inner.seq;
            if let Some(stored) = inner.records.get_mut(&record.id) {
                stored.state = JobState::Delayed;
                stored.attempt += 1;
                stored.last_error = Some(err.to_string());
            }
            inner.delayed.push(DelayedEntry {
                run_at: Instant::now() + delay,
                priority: record.kind.priority(),
                seq,
                id: record.id,
            });
            return;
        }

        error!(
            job_id = %record.id,
            kind = record.kind.name(),
            attempt = record.attempt,
            "job failed terminally: {err}"
        );
        self.record_stage_failure(&record.kind, &err, false).await;
        self.settle(record.id, JobState::Failed, Some(err.to_string()));
    }

    /// Writes the terminal outcome onto the résumé record. A failure here
    /// is logged, not propagated: the job outcome is already decided.
    async fn record_stage_failure(&self, kind: &JobKind, err: &PipelineError, quota: bool) {
        let outcome = match kind {
            JobKind::Parse { resume_id, .. } => {
                self.ctx
                    .controller
                    .fail_parse(*resume_id, &err.to_string(), quota)
                    .await
            }
            JobKind::Analyze { resume_id, .. } => {
                self.ctx
                    .controller
                    .fail_analyze(*resume_id, &err.to_string())
                    .await
            }
        };
        if let Err(e) = outcome {
            error!("failed to record stage failure: {e}");
        }
    }

    fn settle(&self, id: Uuid, state: JobState, last_error: Option<String>) {
        let mut inner = self.inner.lock().expect("queue lock");
        inner.active = None;
        match state {
            JobState::Completed => inner.completed += 1,
            JobState::Failed => inner.failed += 1,
            _ => {}
        }
        if let Some(record) = inner.records.get_mut(&id) {
            record.state = state;
            record.last_error = last_error;
        }
    }
}
