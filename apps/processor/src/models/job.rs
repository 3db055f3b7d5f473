use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seniority level of a job posting.
///
/// Unrecognized level strings deserialize to `Unknown`, which scores a
/// flat 50 on experience rather than silently borrowing another band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobLevel {
    Intern,
    Junior,
    MidLevel,
    Senior,
    Lead,
    Manager,
    #[serde(other)]
    Unknown,
}

impl JobLevel {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "INTERN" => JobLevel::Intern,
            "JUNIOR" => JobLevel::Junior,
            "MID_LEVEL" => JobLevel::MidLevel,
            "SENIOR" => JobLevel::Senior,
            "LEAD" => JobLevel::Lead,
            "MANAGER" => JobLevel::Manager,
            _ => JobLevel::Unknown,
        }
    }
}

/// The slice of a job posting the matching engine reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequirements {
    pub required_skills: Vec<String>,
    pub level: JobLevel,
}

/// A job posting as owned by the external job collaborator. The pipeline
/// only reads it; `is_active` and `end_date` gate analysis.
#[derive(Debug, Clone)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub requirements: JobRequirements,
    pub is_active: bool,
    pub end_date: Option<DateTime<Utc>>,
}

impl JobPosting {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date.map(|end| end < now).unwrap_or(false)
    }
}
