use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use chrono::NaiveDate;

use crate::config::SessionConfig;
use crate::db;
use crate::hiring::auth::SessionManager;
use crate::hiring::domain::{
    Admin, ApplicantDetails, Application, ApplicationListing, Job, JobFields, JobId,
    NewApplication, ResumeUpload,
};
use crate::hiring::repository::{
    AdminRepository, ApplicationRepository, JobRepository, RepositoryError,
};
use crate::hiring::resumes::{ResumeFile, ResumeKey, ResumeStore, ResumeStoreError};
use crate::hiring::{portal_router, HiringPortal, PortalState, SqliteRepository};

pub(super) const ADMIN_EMAIL: &str = "hr@example.com";
pub(super) const ADMIN_PASSWORD: &str = "correct horse";
pub(super) const BOUNDARY: &str = "portal-test-boundary";

pub(super) type TestPortal = HiringPortal<SqliteRepository, MemoryResumeStore>;

pub(super) async fn sqlite_repository() -> Arc<SqliteRepository> {
    let pool = db::connect_in_memory().await.expect("in-memory pool");
    db::migrate(&pool).await.expect("migrations apply");
    Arc::new(SqliteRepository::new(pool))
}

pub(super) async fn build_portal() -> (TestPortal, Arc<SqliteRepository>, Arc<MemoryResumeStore>) {
    let repository = sqlite_repository().await;
    let resumes = Arc::new(MemoryResumeStore::default());
    let portal = HiringPortal::new(repository.clone(), resumes.clone());
    (portal, repository, resumes)
}

pub(super) fn session_manager() -> SessionManager {
    SessionManager::new(&SessionConfig {
        secret_key: "test-secret".to_string(),
        ttl_minutes: 60,
        secure_cookie: false,
    })
}

/// Router over a fresh database with one seeded admin.
pub(super) async fn build_router() -> (Router, Arc<TestPortal>, Arc<MemoryResumeStore>) {
    let (portal, _, resumes) = build_portal().await;
    portal
        .ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("admin seeded");
    let portal = Arc::new(portal);
    let state = PortalState::new(portal.clone(), session_manager());
    (portal_router(state, 1024 * 1024), portal, resumes)
}

pub(super) fn job_fields(title: &str) -> JobFields {
    JobFields {
        title: title.to_string(),
        description: "Build the hiring pipeline".to_string(),
        location: "Remote".to_string(),
        job_type: "Full-time".to_string(),
    }
}

pub(super) fn applicant(name: &str) -> ApplicantDetails {
    ApplicantDetails {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: "555-0100".to_string(),
    }
}

pub(super) fn resume(filename: &str, bytes: &[u8]) -> ResumeUpload {
    ResumeUpload {
        original_filename: filename.to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: bytes.to_vec(),
    }
}

pub(super) async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable")
        .to_vec()
}

pub(super) async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

/// `name=value` part of the first `Set-Cookie` header.
pub(super) fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .expect("set-cookie header")
        .to_string()
}

pub(super) fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
}

pub(super) fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(super) fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn post_multipart(
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

#[derive(Default)]
pub(super) struct MemoryResumeStore {
    files: Mutex<HashMap<ResumeKey, ResumeFile>>,
}

impl MemoryResumeStore {
    pub(super) fn keys(&self) -> Vec<ResumeKey> {
        self.files
            .lock()
            .expect("resume mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn store(
        &self,
        key: &ResumeKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ResumeStoreError> {
        let mut files = self.files.lock().expect("resume mutex poisoned");
        if files.contains_key(key) {
            return Err(ResumeStoreError::Conflict);
        }
        files.insert(
            key.clone(),
            ResumeFile {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    async fn fetch(&self, key: &ResumeKey) -> Result<ResumeFile, ResumeStoreError> {
        self.files
            .lock()
            .expect("resume mutex poisoned")
            .get(key)
            .cloned()
            .ok_or(ResumeStoreError::NotFound)
    }

    async fn remove(&self, key: &ResumeKey) -> Result<(), ResumeStoreError> {
        self.files
            .lock()
            .expect("resume mutex poisoned")
            .remove(key)
            .map(|_| ())
            .ok_or(ResumeStoreError::NotFound)
    }
}

/// Delegates to SQLite but refuses every application insert.
pub(super) struct FailingInsertRepository {
    pub(super) inner: Arc<SqliteRepository>,
}

#[async_trait]
impl JobRepository for FailingInsertRepository {
    async fn list_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        self.inner.list_jobs().await
    }

    async fn create_job(
        &self,
        fields: JobFields,
        posted_at: NaiveDate,
    ) -> Result<Job, RepositoryError> {
        self.inner.create_job(fields, posted_at).await
    }

    async fn fetch_job(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.fetch_job(id).await
    }

    async fn update_job(&self, id: JobId, fields: JobFields) -> Result<Job, RepositoryError> {
        self.inner.update_job(id, fields).await
    }

    async fn delete_job(&self, id: JobId) -> Result<Vec<ResumeKey>, RepositoryError> {
        self.inner.delete_job(id).await
    }

    async fn count_jobs(&self) -> Result<i64, RepositoryError> {
        self.inner.count_jobs().await
    }
}

#[async_trait]
impl ApplicationRepository for FailingInsertRepository {
    async fn insert_application(
        &self,
        _application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    async fn list_applications(
        &self,
        job_id: Option<JobId>,
    ) -> Result<Vec<ApplicationListing>, RepositoryError> {
        self.inner.list_applications(job_id).await
    }

    async fn count_applications(&self) -> Result<i64, RepositoryError> {
        self.inner.count_applications().await
    }
}

#[async_trait]
impl AdminRepository for FailingInsertRepository {
    async fn find_admin(&self, email: &str) -> Result<Option<Admin>, RepositoryError> {
        self.inner.find_admin(email).await
    }

    async fn insert_admin_if_absent(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        self.inner.insert_admin_if_absent(email, password_hash).await
    }

    async fn update_admin_password(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, RepositoryError> {
        self.inner.update_admin_password(email, password_hash).await
    }

    async fn revoke_sessions(&self, email: &str, epoch: i64) -> Result<bool, RepositoryError> {
        self.inner.revoke_sessions(email, epoch).await
    }
}
