use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::auth::{AdminIdentity, AdminSession, SessionGate, SessionManager};
use super::domain::{
    ApplicantDetails, JobFields, JobId, JobSummary, PasswordChange, ResumeUpload,
};
use super::repository::PortalRepository;
use super::resumes::ResumeStore;
use super::service::{HiringPortal, PortalError};

/// Shared state handed to every portal handler.
pub struct PortalState<R, S> {
    pub portal: Arc<HiringPortal<R, S>>,
    pub gate: SessionGate,
}

impl<R, S> PortalState<R, S>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    pub fn new(portal: Arc<HiringPortal<R, S>>, sessions: SessionManager) -> Self {
        let gate = portal.session_gate(Arc::new(sessions));
        Self { portal, gate }
    }
}

impl<R, S> Clone for PortalState<R, S> {
    fn clone(&self) -> Self {
        Self {
            portal: Arc::clone(&self.portal),
            gate: self.gate.clone(),
        }
    }
}

impl<R, S> FromRef<PortalState<R, S>> for SessionGate {
    fn from_ref(state: &PortalState<R, S>) -> Self {
        state.gate.clone()
    }
}

/// Router builder exposing the admin console and the public application form.
pub fn portal_router<R, S>(state: PortalState<R, S>, max_upload_bytes: usize) -> Router
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    Router::new()
        .route("/", get(login_form::<R, S>).post(login::<R, S>))
        .route("/logout", get(logout::<R, S>))
        .route("/dashboard", get(dashboard::<R, S>))
        .route("/jobs", get(list_jobs::<R, S>).post(create_job::<R, S>))
        .route(
            "/edit-job/{id}",
            get(show_job::<R, S>).post(update_job::<R, S>),
        )
        .route("/delete-job/{id}", get(delete_job::<R, S>))
        .route(
            "/apply/{job_id}",
            get(job_for_applicants::<R, S>).post(submit_application::<R, S>),
        )
        .route("/applications", get(list_applications::<R, S>))
        .route("/export-applications", get(export_all::<R, S>))
        .route("/export-applications/{job_id}", get(export_for_job::<R, S>))
        .route("/resume/{filename}", get(view_resume::<R, S>))
        .route("/download/{filename}", get(download_resume::<R, S>))
        .route(
            "/settings",
            get(settings).post(change_password::<R, S>),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationsQuery {
    #[serde(default)]
    job_id: Option<String>,
}

pub(crate) async fn login_form<R, S>(
    State(state): State<PortalState<R, S>>,
    headers: HeaderMap,
) -> Response
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    match state.gate.identify(&headers).await {
        Ok(Some(_)) => return Redirect::to("/dashboard").into_response(),
        Ok(None) => {}
        Err(err) => return PortalError::from(err).into_response(),
    }
    Json(json!({
        "form": "login",
        "action": "/",
        "fields": ["email", "password"],
    }))
    .into_response()
}

pub(crate) async fn login<R, S>(
    State(state): State<PortalState<R, S>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let identity = state.portal.authenticate(&form.email, &form.password).await?;
    let cookie = session_cookie(&state.gate, &identity)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to("/dashboard"),
    )
        .into_response())
}

fn session_cookie(gate: &SessionGate, identity: &AdminIdentity) -> Result<String, PortalError> {
    let token = gate.sessions().issue(identity)?;
    Ok(gate.sessions().set_cookie(&token))
}

/// Revoke the presented session, if it is still live, and clear the cookie.
pub(crate) async fn logout<R, S>(
    State(state): State<PortalState<R, S>>,
    headers: HeaderMap,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    if let Some(identity) = state.gate.identify(&headers).await? {
        state.gate.revoke(&identity).await?;
        info!(email = %identity.email, "admin logged out");
    }
    Ok((
        [(header::SET_COOKIE, state.gate.sessions().clear_cookie())],
        Redirect::to("/"),
    )
        .into_response())
}

pub(crate) async fn dashboard<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let summary = state.portal.dashboard().await?;
    Ok(Json(summary).into_response())
}

pub(crate) async fn list_jobs<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let jobs = state.portal.list_jobs().await?;
    Ok(Json(jobs).into_response())
}

pub(crate) async fn create_job<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
    Form(fields): Form<JobFields>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let job = state.portal.create_job(fields).await?;
    Ok((StatusCode::CREATED, Json(job)).into_response())
}

pub(crate) async fn show_job<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
    Path(id): Path<i64>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let job = state.portal.job(JobId(id)).await?;
    Ok(Json(job).into_response())
}

pub(crate) async fn update_job<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
    Path(id): Path<i64>,
    Form(fields): Form<JobFields>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    state.portal.update_job(JobId(id), fields).await?;
    Ok(Redirect::to("/jobs").into_response())
}

pub(crate) async fn delete_job<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
    Path(id): Path<i64>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    state.portal.delete_job(JobId(id)).await?;
    Ok(Redirect::to("/jobs").into_response())
}

pub(crate) async fn job_for_applicants<R, S>(
    State(state): State<PortalState<R, S>>,
    Path(job_id): Path<i64>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let job = state.portal.job(JobId(job_id)).await?;
    Ok(Json(job).into_response())
}

pub(crate) async fn submit_application<R, S>(
    State(state): State<PortalState<R, S>>,
    Path(job_id): Path<i64>,
    multipart: Multipart,
) -> Response
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let (details, resume) = match read_application_form(multipart).await {
        Ok(form) => form,
        Err(err) => return (err.status(), err.body_text()).into_response(),
    };

    match state
        .portal
        .submit_application(JobId(job_id), details, resume)
        .await
    {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Collect the `name`, `email`, `phone` and `resume` parts; unknown parts are skipped.
async fn read_application_form(
    mut multipart: Multipart,
) -> Result<(ApplicantDetails, ResumeUpload), axum::extract::multipart::MultipartError> {
    let mut details = ApplicantDetails::default();
    let mut resume = ResumeUpload {
        original_filename: String::new(),
        content_type: None,
        bytes: Vec::new(),
    };

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("name") => details.name = field.text().await?,
            Some("email") => details.email = field.text().await?,
            Some("phone") => details.phone = field.text().await?,
            Some("resume") => {
                resume.original_filename = field.file_name().unwrap_or_default().to_string();
                resume.content_type = field.content_type().map(str::to_string);
                resume.bytes = field.bytes().await?.to_vec();
            }
            _ => {}
        }
    }

    Ok((details, resume))
}

pub(crate) async fn list_applications<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
    Query(query): Query<ApplicationsQuery>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let selected_job = parse_job_filter(query.job_id.as_deref())?;
    let applications = state.portal.applications(selected_job).await?;
    let jobs: Vec<JobSummary> = state
        .portal
        .list_jobs()
        .await?
        .iter()
        .map(JobSummary::from)
        .collect();

    Ok(Json(json!({
        "applications": applications,
        "jobs": jobs,
        "selected_job": selected_job,
    }))
    .into_response())
}

fn parse_job_filter(raw: Option<&str>) -> Result<Option<JobId>, PortalError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(|id| Some(JobId(id)))
            .map_err(|_| PortalError::Validation(format!("job_id '{value}' is not a number"))),
    }
}

pub(crate) async fn export_all<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let sheet = state.portal.export_applications(None).await?;
    Ok(csv_attachment("applications.csv".to_string(), sheet))
}

pub(crate) async fn export_for_job<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
    Path(job_id): Path<i64>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let sheet = state
        .portal
        .export_applications(Some(JobId(job_id)))
        .await?;
    Ok(csv_attachment(format!("applications_job_{job_id}.csv"), sheet))
}

fn csv_attachment(filename: String, sheet: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        sheet,
    )
        .into_response()
}

pub(crate) async fn view_resume<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
    Path(filename): Path<String>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    serve_resume(&state, &filename, "inline").await
}

pub(crate) async fn download_resume<R, S>(
    _session: AdminSession,
    State(state): State<PortalState<R, S>>,
    Path(filename): Path<String>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    serve_resume(&state, &filename, "attachment").await
}

async fn serve_resume<R, S>(
    state: &PortalState<R, S>,
    filename: &str,
    disposition: &str,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let (key, file) = state.portal.resume(filename).await?;
    let content_type = file.content_type.unwrap_or_else(|| {
        mime_guess::from_path(key.display_name())
            .first_or_octet_stream()
            .to_string()
    });

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{}\"", key.display_name()),
            ),
        ],
        file.bytes,
    )
        .into_response())
}

pub(crate) async fn settings(AdminSession(identity): AdminSession) -> Response {
    Json(json!({ "email": identity.email })).into_response()
}

pub(crate) async fn change_password<R, S>(
    AdminSession(identity): AdminSession,
    State(state): State<PortalState<R, S>>,
    Form(change): Form<PasswordChange>,
) -> Result<Response, PortalError>
where
    R: PortalRepository + 'static,
    S: ResumeStore + 'static,
{
    let renewed = state.portal.change_password(&identity, change).await?;
    let cookie = session_cookie(&state.gate, &renewed)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to("/settings"),
    )
        .into_response())
}
