//! Job postings, applicant intake, resume storage, and the admin console.

pub mod auth;
pub mod domain;
pub mod export;
pub mod repository;
pub mod resumes;
pub mod router;
pub mod service;
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use auth::{AdminIdentity, AdminSession, SessionGate, SessionManager};
pub use domain::{
    Admin, ApplicantDetails, Application, ApplicationId, ApplicationListing, DashboardSummary,
    Job, JobFields, JobId, JobSummary, NewApplication, PasswordChange, ResumeUpload,
};
pub use export::{applications_csv, ExportError, EXPORT_HEADERS};
pub use repository::{
    AdminRepository, ApplicationRepository, JobRepository, PortalRepository, RepositoryError,
};
pub use resumes::{
    LocalResumeStore, ObjectResumeStore, ResumeBackend, ResumeFile, ResumeKey, ResumeStore,
    ResumeStoreError,
};
pub use router::{portal_router, PortalState};
pub use service::{seed_admin, HiringPortal, PortalError};
pub use sqlite::SqliteRepository;
