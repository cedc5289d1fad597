use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::resumes::ResumeKey;

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct JobId(pub i64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for applicant submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ApplicationId(pub i64);

/// A published job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub job_type: String,
    pub posted_at: NaiveDate,
}

/// Editable fields of a posting, as submitted by the jobs form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub job_type: String,
}

impl JobFields {
    pub(crate) fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            location: self.location.trim().to_string(),
            job_type: self.job_type.trim().to_string(),
        }
    }
}

/// Minimal job reference used by the applications filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub title: String,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
        }
    }
}

/// Stored applicant submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub applicant_name: String,
    pub email: String,
    pub phone: String,
    pub resume_key: ResumeKey,
    pub created_at: DateTime<Utc>,
}

/// Application row joined with the title of the job it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ApplicationListing {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub job_title: String,
    pub applicant_name: String,
    pub email: String,
    pub phone: String,
    pub resume_key: ResumeKey,
    pub created_at: DateTime<Utc>,
}

/// Text fields of the public application form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApplicantDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Resume file received alongside an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeUpload {
    pub original_filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Row handed to the repository once the resume has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub job_id: JobId,
    pub applicant_name: String,
    pub email: String,
    pub phone: String,
    pub resume_key: ResumeKey,
    pub created_at: DateTime<Utc>,
}

/// Administrator credential row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Admin {
    pub email: String,
    pub password_hash: String,
    /// Generation of sessions currently honoured for this admin.
    pub session_epoch: i64,
}

/// Counters rendered on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_jobs: i64,
    pub total_applications: i64,
}

/// Password change form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChange {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}
