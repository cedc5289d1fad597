use async_trait::async_trait;
use chrono::NaiveDate;

use super::domain::{Admin, Application, ApplicationListing, Job, JobFields, JobId, NewApplication};
use super::resumes::ResumeKey;

/// Storage for job postings.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// All postings, newest id first.
    async fn list_jobs(&self) -> Result<Vec<Job>, RepositoryError>;
    async fn create_job(
        &self,
        fields: JobFields,
        posted_at: NaiveDate,
    ) -> Result<Job, RepositoryError>;
    async fn fetch_job(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;
    /// Replace the editable fields; `posted_at` is left untouched.
    async fn update_job(&self, id: JobId, fields: JobFields) -> Result<Job, RepositoryError>;
    /// Remove the posting together with its applications, returning the
    /// resume keys the removed applications referenced.
    async fn delete_job(&self, id: JobId) -> Result<Vec<ResumeKey>, RepositoryError>;
    async fn count_jobs(&self) -> Result<i64, RepositoryError>;
}

/// Storage for applicant submissions.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError>;
    /// Applications joined with their job title, newest first. `None` lists every job.
    async fn list_applications(
        &self,
        job_id: Option<JobId>,
    ) -> Result<Vec<ApplicationListing>, RepositoryError>;
    async fn count_applications(&self) -> Result<i64, RepositoryError>;
}

/// Storage for administrator credentials.
#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn find_admin(&self, email: &str) -> Result<Option<Admin>, RepositoryError>;
    /// Returns `false` when an admin with that email already exists.
    async fn insert_admin_if_absent(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<bool, RepositoryError>;
    /// Replace the password hash and revoke every outstanding session,
    /// returning the new session epoch.
    async fn update_admin_password(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, RepositoryError>;
    /// Advance the session epoch if it still equals `epoch`. Returns `false`
    /// when the epoch already moved on.
    async fn revoke_sessions(&self, email: &str, epoch: i64) -> Result<bool, RepositoryError>;
}

/// Everything the hiring service needs from persistence.
pub trait PortalRepository: JobRepository + ApplicationRepository + AdminRepository {}

impl<T> PortalRepository for T where T: JobRepository + ApplicationRepository + AdminRepository {}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => Self::NotFound,
            _ => Self::Unavailable(err.to_string()),
        }
    }
}
