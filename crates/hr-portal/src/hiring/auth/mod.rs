//! Admin credentials and the session gate for protected routes.

pub mod password;
pub mod session;

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::debug;

use super::repository::{AdminRepository, RepositoryError};
use super::service::PortalError;

pub use password::{hash_password, verify_password, CredentialError};
pub use session::{AdminIdentity, SessionError, SessionManager, SESSION_COOKIE};

/// Signed tokens checked against the admin's stored session epoch.
///
/// A token is honoured only while the epoch it was issued under is still the
/// admin's current one, so advancing the epoch revokes every copy of it.
#[derive(Clone)]
pub struct SessionGate {
    sessions: Arc<SessionManager>,
    admins: Arc<dyn AdminRepository>,
}

impl SessionGate {
    pub fn new(sessions: Arc<SessionManager>, admins: Arc<dyn AdminRepository>) -> Self {
        Self { sessions, admins }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The admin behind the request's session cookie, if it is still live.
    pub async fn identify(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<AdminIdentity>, RepositoryError> {
        let Some(identity) = self.sessions.identity_from_headers(headers) else {
            return Ok(None);
        };
        let current = self.admins.find_admin(&identity.email).await?;
        Ok(current
            .filter(|admin| admin.session_epoch == identity.session_epoch)
            .map(|_| identity))
    }

    /// End every session issued under `identity`'s epoch.
    pub async fn revoke(&self, identity: &AdminIdentity) -> Result<(), RepositoryError> {
        if !self
            .admins
            .revoke_sessions(&identity.email, identity.session_epoch)
            .await?
        {
            debug!(email = %identity.email, "sessions already revoked");
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

/// Extractor that only succeeds for requests carrying a live session.
///
/// Handlers taking an `AdminSession` never run for anonymous callers; those
/// are redirected to the login route instead.
#[derive(Debug, Clone)]
pub struct AdminSession(pub AdminIdentity);

impl<S> FromRequestParts<S> for AdminSession
where
    SessionGate: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = SessionGate::from_ref(state);
        match gate.identify(&parts.headers).await {
            Ok(Some(identity)) => Ok(Self(identity)),
            Ok(None) => {
                debug!(path = %parts.uri.path(), "no valid session, redirecting to login");
                Err(Redirect::to("/").into_response())
            }
            Err(err) => Err(PortalError::from(err).into_response()),
        }
    }
}
