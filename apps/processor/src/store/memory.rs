#![allow(dead_code)]

//! In-memory store implementations. Used by the orchestration tests and
//! handy for running the worker against fixture data without Postgres.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::models::job::JobPosting;
use crate::models::resume::{ResumePatch, ResumeRow, ResumeStatus};
use crate::store::{FileStore, JobPostingStore, ResumeStore};

#[derive(Default)]
pub struct MemoryResumeStore {
    rows: Mutex<HashMap<Uuid, ResumeRow>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, row: ResumeRow) {
        self.rows.lock().expect("resume store lock").insert(row.id, row);
    }

    /// A freshly-uploaded row, convenient for tests.
    pub fn seed(&self, posting_id: Uuid, file_path: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.insert(ResumeRow {
            id,
            posting_id,
            file_path: file_path.to_string(),
            status: ResumeStatus::Uploaded.as_str().to_string(),
            is_parsed: false,
            is_analyzed: false,
            parse_error: None,
            analysis_error: None,
            parsed_data: None,
            ai_analysis: None,
            created_at: now,
            updated_at: now,
        });
        id
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn get(&self, id: Uuid) -> Result<ResumeRow, PipelineError> {
        self.rows
            .lock()
            .expect("resume store lock")
            .get(&id)
            .cloned()
            .ok_or(PipelineError::ResumeNotFound(id))
    }

    async fn update(&self, id: Uuid, patch: ResumePatch) -> Result<(), PipelineError> {
        let mut rows = self.rows.lock().expect("resume store lock");
        let row = rows.get_mut(&id).ok_or(PipelineError::ResumeNotFound(id))?;

        if let Some(status) = patch.status {
            row.status = status.as_str().to_string();
        }
        if let Some(flag) = patch.is_parsed {
            row.is_parsed = flag;
        }
        if let Some(flag) = patch.is_analyzed {
            row.is_analyzed = flag;
        }
        if let Some(err) = patch.parse_error {
            row.parse_error = err;
        }
        if let Some(err) = patch.analysis_error {
            row.analysis_error = err;
        }
        if let Some(data) = patch.parsed_data {
            row.parsed_data = Some(data);
        }
        if let Some(analysis) = patch.ai_analysis {
            row.ai_analysis = Some(analysis);
        }
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn find_uploaded(&self) -> Result<Vec<ResumeRow>, PipelineError> {
        let rows = self.rows.lock().expect("resume store lock");
        Ok(rows
            .values()
            .filter(|r| r.status == ResumeStatus::Uploaded.as_str())
            .cloned()
            .collect())
    }

    async fn find_parsed_unanalyzed(
        &self,
        older_than: Duration,
    ) -> Result<Vec<ResumeRow>, PipelineError> {
        let cutoff = Utc::now() - older_than;
        let rows = self.rows.lock().expect("resume store lock");
        Ok(rows
            .values()
            .filter(|r| {
                r.is_parsed
                    && !r.is_analyzed
                    && r.status == ResumeStatus::Parsed.as_str()
                    && r.updated_at < cutoff
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryJobPostingStore {
    postings: Mutex<HashMap<Uuid, JobPosting>>,
}

impl MemoryJobPostingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, posting: JobPosting) {
        self.postings
            .lock()
            .expect("posting store lock")
            .insert(posting.id, posting);
    }
}

#[async_trait]
impl JobPostingStore for MemoryJobPostingStore {
    async fn find(&self, id: Uuid) -> Result<JobPosting, PipelineError> {
        self.postings
            .lock()
            .expect("posting store lock")
            .get(&id)
            .cloned()
            .ok_or(PipelineError::PostingNotFound(id))
    }
}

/// Serves file bytes from a map keyed by path.
#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, bytes: Vec<u8>) {
        self.files
            .lock()
            .expect("file store lock")
            .insert(path.to_string(), bytes);
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, PipelineError> {
        self.files
            .lock()
            .expect("file store lock")
            .get(path)
            .cloned()
            .ok_or_else(|| PipelineError::FileNotFound(path.to_string()))
    }
}
