//! Signed session tokens carried in the `hr_session` cookie.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;

pub const SESSION_COOKIE: &str = "hr_session";

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: i64,
    exp: i64,
    epoch: i64,
}

/// The administrator a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    pub email: String,
    /// Session epoch the token was issued under. Only tokens matching the
    /// admin's stored epoch are honoured.
    #[serde(skip)]
    pub session_epoch: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session token could not be signed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("session token rejected")]
    Invalid,
}

/// Issues and validates session tokens with a shared HMAC secret.
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    secure_cookie: bool,
}

impl SessionManager {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret_key.as_bytes()),
            ttl: Duration::minutes(config.ttl_minutes.max(1)),
            secure_cookie: config.secure_cookie,
        }
    }

    pub fn issue(&self, identity: &AdminIdentity) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: identity.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            epoch: identity.session_epoch,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(SessionError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<AdminIdentity, SessionError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map_err(|_| SessionError::Invalid)?;
        Ok(AdminIdentity {
            email: data.claims.sub,
            session_epoch: data.claims.epoch,
        })
    }

    /// Resolve the identity from a request's `Cookie` headers, if any cookie
    /// carries a validly signed token. Whether the session was revoked is
    /// checked by [`super::SessionGate`].
    pub fn identity_from_headers(&self, headers: &HeaderMap) -> Option<AdminIdentity> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == SESSION_COOKIE)
            .find_map(|(_, value)| self.verify(value).ok())
    }

    pub fn set_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.ttl.num_seconds()
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie =
            format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("secure_cookie", &self.secure_cookie)
            .finish_non_exhaustive()
    }
}
