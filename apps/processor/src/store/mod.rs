//! Collaborator contracts. The pipeline consumes file storage, résumé
//! persistence, and job-posting lookup through these traits; production
//! wiring uses the Postgres and local-filesystem implementations, tests
//! use the in-memory ones.

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::models::job::JobPosting;
use crate::models::resume::{ResumePatch, ResumeRow};

pub mod memory;
pub mod pg;

/// Read access to stored résumé files.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, PipelineError>;
}

/// Read access to job postings (owned by the job collaborator).
#[async_trait]
pub trait JobPostingStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<JobPosting, PipelineError>;
}

/// Persistence for résumé rows. `update` applies a partial patch; the two
/// sweep queries drive intake and crash recovery.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<ResumeRow, PipelineError>;

    async fn update(&self, id: Uuid, patch: ResumePatch) -> Result<(), PipelineError>;

    /// Résumés still waiting for their first parse.
    async fn find_uploaded(&self) -> Result<Vec<ResumeRow>, PipelineError>;

    /// Résumés stuck parsed-but-unanalyzed for longer than the grace
    /// period, the crash gap between persisting a parse result and
    /// enqueuing the analyze job.
    async fn find_parsed_unanalyzed(
        &self,
        older_than: Duration,
    ) -> Result<Vec<ResumeRow>, PipelineError>;
}

/// Reads résumé files from the local upload directory.
pub struct LocalFileStore;

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, PipelineError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PipelineError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(PipelineError::Storage(format!("read {path}: {e}"))),
        }
    }
}
