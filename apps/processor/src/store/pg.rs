//! PostgreSQL store implementations.
//!
//! Queries are runtime-checked; the `resumes` and `jobs` tables are owned
//! by the surrounding application's migrations.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::models::job::{JobLevel, JobPosting, JobRequirements};
use crate::models::resume::{ResumePatch, ResumeRow};
use crate::store::{JobPostingStore, ResumeStore};

const RESUME_COLUMNS: &str = "id, posting_id, file_path, status, is_parsed, is_analyzed, \
     parse_error, analysis_error, parsed_data, ai_analysis, created_at, updated_at";

pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn get(&self, id: Uuid) -> Result<ResumeRow, PipelineError> {
        let query = format!("SELECT {RESUME_COLUMNS} FROM resumes WHERE id = $1");
        sqlx::query_as::<_, ResumeRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PipelineError::ResumeNotFound(id))
    }

    async fn update(&self, id: Uuid, patch: ResumePatch) -> Result<(), PipelineError> {
        // Read-modify-write keeps the patch semantics simple; the worker
        // lane is the single writer of these columns, so the read cannot
        // race another pipeline write.
        let mut row = self.get(id).await?;

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

        sqlx::query(
            "UPDATE resumes SET status = $2, is_parsed = $3, is_analyzed = $4, \
             parse_error = $5, analysis_error = $6, parsed_data = $7, ai_analysis = $8, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&row.status)
        .bind(row.is_parsed)
        .bind(row.is_analyzed)
        .bind(&row.parse_error)
        .bind(&row.analysis_error)
        .bind(&row.parsed_data)
        .bind(&row.ai_analysis)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_uploaded(&self) -> Result<Vec<ResumeRow>, PipelineError> {
        let query = format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE status = 'uploaded' ORDER BY created_at"
        );
        Ok(sqlx::query_as::<_, ResumeRow>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_parsed_unanalyzed(
        &self,
        older_than: Duration,
    ) -> Result<Vec<ResumeRow>, PipelineError> {
        let cutoff = Utc::now() - older_than;
        let query = format!(
            "SELECT {RESUME_COLUMNS} FROM resumes \
             WHERE is_parsed AND NOT is_analyzed AND status = 'parsed' AND updated_at < $1 \
             ORDER BY updated_at"
        );
        Ok(sqlx::query_as::<_, ResumeRow>(&query)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[derive(sqlx::FromRow)]
struct JobPostingRow {
    id: Uuid,
    title: String,
    required_skills: Vec<String>,
    level: String,
    is_active: bool,
    end_date: Option<chrono::DateTime<Utc>>,
}

pub struct PgJobPostingStore {
    pool: PgPool,
}

impl PgJobPostingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobPostingStore for PgJobPostingStore {
    async fn find(&self, id: Uuid) -> Result<JobPosting, PipelineError> {
        let row = sqlx::query_as::<_, JobPostingRow>(
            "SELECT id, title, required_skills, level, is_active, end_date \
             FROM jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PipelineError::PostingNotFound(id))?;

        Ok(JobPosting {
            id: row.id,
            title: row.title,
            requirements: JobRequirements {
                required_skills: row.required_skills,
                level: JobLevel::parse(&row.level),
            },
            is_active: row.is_active,
            end_date: row.end_date,
        })
    }
}
