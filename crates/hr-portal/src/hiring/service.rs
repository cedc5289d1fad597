use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::{error, info, warn};

use super::auth::{
    self, AdminIdentity, CredentialError, SessionError, SessionGate, SessionManager,
};
use super::domain::{
    ApplicantDetails, Application, ApplicationListing, DashboardSummary, Job, JobFields, JobId,
    NewApplication, PasswordChange, ResumeUpload,
};
use super::export::{self, ExportError};
use super::repository::{AdminRepository, PortalRepository, RepositoryError};
use super::resumes::{ResumeFile, ResumeKey, ResumeStore, ResumeStoreError};

/// Service composing the repository, the resume store, and credential checks.
pub struct HiringPortal<R, S> {
    repository: Arc<R>,
    resumes: Arc<S>,
}

impl<R, S> HiringPortal<R, S>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    pub fn new(repository: Arc<R>, resumes: Arc<S>) -> Self {
        Self {
            repository,
            resumes,
        }
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, PortalError> {
        Ok(DashboardSummary {
            total_jobs: self.repository.count_jobs().await?,
            total_applications: self.repository.count_applications().await?,
        })
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, PortalError> {
        Ok(self.repository.list_jobs().await?)
    }

    /// Publish a posting dated today (UTC).
    pub async fn create_job(&self, fields: JobFields) -> Result<Job, PortalError> {
        let fields = validate_job_fields(fields)?;
        let job = self
            .repository
            .create_job(fields, Utc::now().date_naive())
            .await?;
        info!(job_id = %job.id, title = %job.title, "job posted");
        Ok(job)
    }

    pub async fn job(&self, id: JobId) -> Result<Job, PortalError> {
        self.repository
            .fetch_job(id)
            .await?
            .ok_or(PortalError::NotFound("Job not found"))
    }

    pub async fn update_job(&self, id: JobId, fields: JobFields) -> Result<Job, PortalError> {
        let fields = validate_job_fields(fields)?;
        match self.repository.update_job(id, fields).await {
            Ok(job) => Ok(job),
            Err(RepositoryError::NotFound) => Err(PortalError::NotFound("Job not found")),
            Err(other) => Err(other.into()),
        }
    }

    /// Delete a posting and every application filed against it, returning how
    /// many applications went with it. Stored resumes are removed afterwards on
    /// a best-effort basis.
    pub async fn delete_job(&self, id: JobId) -> Result<usize, PortalError> {
        let resume_keys = match self.repository.delete_job(id).await {
            Ok(keys) => keys,
            Err(RepositoryError::NotFound) => return Err(PortalError::NotFound("Job not found")),
            Err(other) => return Err(other.into()),
        };

        for key in &resume_keys {
            match self.resumes.remove(key).await {
                Ok(()) | Err(ResumeStoreError::NotFound) => {}
                Err(err) => warn!(%key, error = %err, "resume left behind after job deletion"),
            }
        }

        info!(job_id = %id, applications = resume_keys.len(), "job deleted");
        Ok(resume_keys.len())
    }

    /// File an application: store the resume, then insert the row. When the
    /// insert fails the stored resume is deleted again before the error is
    /// returned. The two writes are not atomic.
    pub async fn submit_application(
        &self,
        job_id: JobId,
        details: ApplicantDetails,
        resume: ResumeUpload,
    ) -> Result<Application, PortalError> {
        let job = self.job(job_id).await?;
        let details = validate_applicant(details)?;
        if resume.bytes.is_empty() {
            return Err(PortalError::Validation("resume is required".to_string()));
        }

        let now = Utc::now();
        let key = ResumeKey::generate(job.id, &resume.original_filename, now);
        self.resumes
            .store(&key, resume.bytes, resume.content_type.as_deref())
            .await?;

        let inserted = self
            .repository
            .insert_application(NewApplication {
                job_id: job.id,
                applicant_name: details.name,
                email: details.email,
                phone: details.phone,
                resume_key: key.clone(),
                created_at: now,
            })
            .await;

        match inserted {
            Ok(application) => {
                info!(job_id = %job.id, application_id = application.id.0, "application received");
                Ok(application)
            }
            Err(err) => {
                if let Err(cleanup) = self.resumes.remove(&key).await {
                    warn!(%key, error = %cleanup, "orphaned resume after failed insert");
                }
                match err {
                    RepositoryError::NotFound => Err(PortalError::NotFound("Job not found")),
                    other => Err(other.into()),
                }
            }
        }
    }

    /// Applications joined with job titles; `None` covers every job.
    pub async fn applications(
        &self,
        job_id: Option<JobId>,
    ) -> Result<Vec<ApplicationListing>, PortalError> {
        if let Some(id) = job_id {
            self.job(id).await?;
        }
        Ok(self.repository.list_applications(job_id).await?)
    }

    pub async fn export_applications(&self, job_id: Option<JobId>) -> Result<Vec<u8>, PortalError> {
        let rows = self.applications(job_id).await?;
        Ok(export::applications_csv(&rows)?)
    }

    pub async fn resume(&self, raw_key: &str) -> Result<(ResumeKey, ResumeFile), PortalError> {
        let key = ResumeKey::parse(raw_key)?;
        let file = self.resumes.fetch(&key).await?;
        Ok((key, file))
    }

    /// Check credentials without revealing which half was wrong.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AdminIdentity, PortalError> {
        let Some(admin) = self.repository.find_admin(email).await? else {
            warn!("login rejected");
            return Err(PortalError::Unauthorized("Invalid login"));
        };

        if !auth::verify_password(password, &admin.password_hash)? {
            warn!("login rejected");
            return Err(PortalError::Unauthorized("Invalid login"));
        }

        info!(email = %admin.email, "admin logged in");
        Ok(AdminIdentity {
            email: admin.email,
            session_epoch: admin.session_epoch,
        })
    }

    /// Replace the admin's password. Every session issued before the change
    /// is revoked; the returned identity carries the new session epoch.
    pub async fn change_password(
        &self,
        identity: &AdminIdentity,
        change: PasswordChange,
    ) -> Result<AdminIdentity, PortalError> {
        if change.new_password.is_empty() {
            return Err(PortalError::Validation(
                "new password is required".to_string(),
            ));
        }
        if change.new_password != change.confirm_password {
            return Err(PortalError::Validation(
                "new passwords do not match".to_string(),
            ));
        }

        let admin = self
            .repository
            .find_admin(&identity.email)
            .await?
            .ok_or(PortalError::Unauthorized("Invalid login"))?;

        if !auth::verify_password(&change.old_password, &admin.password_hash)? {
            return Err(PortalError::Unauthorized("Old password is incorrect"));
        }

        let hash = auth::hash_password(&change.new_password)?;
        let session_epoch = self
            .repository
            .update_admin_password(&admin.email, &hash)
            .await?;
        info!(email = %admin.email, "admin password changed, older sessions revoked");
        Ok(AdminIdentity {
            email: admin.email,
            session_epoch,
        })
    }

    /// Session gate backed by this portal's admin records.
    pub fn session_gate(&self, sessions: Arc<SessionManager>) -> SessionGate {
        SessionGate::new(sessions, self.repository.clone())
    }

    /// Seed an admin account unless one with that email exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool, PortalError> {
        seed_admin(self.repository.as_ref(), email, password).await
    }
}

/// Create an admin with a freshly hashed password; `false` when the email is taken.
pub async fn seed_admin<R>(
    repository: &R,
    email: &str,
    password: &str,
) -> Result<bool, PortalError>
where
    R: AdminRepository + ?Sized,
{
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(PortalError::Validation(
            "admin email and password are required".to_string(),
        ));
    }
    if repository.find_admin(email).await?.is_some() {
        return Ok(false);
    }

    let hash = auth::hash_password(password)?;
    let created = repository.insert_admin_if_absent(email, &hash).await?;
    if created {
        info!(%email, "admin account created");
    }
    Ok(created)
}

fn validate_job_fields(fields: JobFields) -> Result<JobFields, PortalError> {
    let fields = fields.normalized();
    if fields.title.is_empty() {
        return Err(PortalError::Validation("title is required".to_string()));
    }
    Ok(fields)
}

fn validate_applicant(details: ApplicantDetails) -> Result<ApplicantDetails, PortalError> {
    let details = ApplicantDetails {
        name: details.name.trim().to_string(),
        email: details.email.trim().to_string(),
        phone: details.phone.trim().to_string(),
    };

    let missing: Vec<&str> = [
        ("name", &details.name),
        ("email", &details.email),
        ("phone", &details.phone),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(field, _)| field)
    .collect();

    if missing.is_empty() {
        Ok(details)
    } else {
        Err(PortalError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Error raised by the hiring service; rendered as a plain-text status response.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] ResumeStoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl PortalError {
    pub fn status(&self) -> StatusCode {
        match self {
            PortalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PortalError::NotFound(_)
            | PortalError::Repository(RepositoryError::NotFound)
            | PortalError::Storage(ResumeStoreError::NotFound | ResumeStoreError::InvalidKey(_)) => {
                StatusCode::NOT_FOUND
            }
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            PortalError::Repository(_)
            | PortalError::Storage(_)
            | PortalError::Export(_)
            | PortalError::Credential(_)
            | PortalError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
            return (status, "Internal server error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}
