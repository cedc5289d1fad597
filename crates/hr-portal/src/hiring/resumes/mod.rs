//! Resume persistence behind a single storage contract.
//!
//! Every upload receives a fresh [`ResumeKey`] built from the job id, the upload
//! time, a random token, and a sanitized copy of the client filename, so two
//! uploads never address the same object even when their filenames match.

mod local;
mod object_store;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::JobId;
use crate::config::StorageBackend;

pub use local::LocalResumeStore;
pub use object_store::ObjectResumeStore;

const MAX_FILENAME_LEN: usize = 100;

/// Opaque handle returned by a [`ResumeStore`] and persisted with the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ResumeKey(String);

impl ResumeKey {
    /// Build a new collision-safe key for an upload.
    pub fn generate(job_id: JobId, original_filename: &str, uploaded_at: DateTime<Utc>) -> Self {
        let token = Uuid::new_v4().simple();
        let name = sanitize_filename(original_filename);
        Self(format!(
            "{}_{}_{}_{}",
            job_id.0,
            uploaded_at.timestamp(),
            token,
            name
        ))
    }

    /// Validate a key received from a client before it reaches a backend.
    pub fn parse(raw: &str) -> Result<Self, ResumeStoreError> {
        let valid = !raw.is_empty()
            && raw.len() <= 255
            && !raw.starts_with('.')
            && !raw.contains("..")
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ResumeStoreError::InvalidKey(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The client filename embedded at the end of the key, for download headers.
    pub fn display_name(&self) -> &str {
        self.0.splitn(4, '_').nth(3).unwrap_or(&self.0)
    }
}

impl fmt::Display for ResumeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce a client-supplied filename to a safe single path component.
pub(crate) fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or_default()
        .trim();

    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return "resume".to_string();
    }

    cleaned.chars().take(MAX_FILENAME_LEN).collect()
}

/// Bytes read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Storage contract shared by the filesystem and object-store backends.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn store(
        &self,
        key: &ResumeKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ResumeStoreError>;
    async fn fetch(&self, key: &ResumeKey) -> Result<ResumeFile, ResumeStoreError>;
    async fn remove(&self, key: &ResumeKey) -> Result<(), ResumeStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ResumeStoreError {
    #[error("resume not found")]
    NotFound,
    #[error("resume key '{0}' is not valid")]
    InvalidKey(String),
    #[error("resume already exists")]
    Conflict,
    #[error("resume storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("resume storage backend failure: {0}")]
    Backend(String),
}

/// Store selected by `RESUME_STORE`.
#[derive(Debug)]
pub enum ResumeBackend {
    Local(LocalResumeStore),
    ObjectStore(ObjectResumeStore),
}

impl ResumeBackend {
    pub async fn from_config(backend: &StorageBackend) -> Result<Self, ResumeStoreError> {
        match backend {
            StorageBackend::Local { directory } => {
                Ok(Self::Local(LocalResumeStore::open(directory).await?))
            }
            StorageBackend::ObjectStore {
                bucket,
                region,
                endpoint,
            } => Ok(Self::ObjectStore(
                ObjectResumeStore::connect(bucket, region, endpoint.as_deref()).await,
            )),
        }
    }
}

#[async_trait]
impl ResumeStore for ResumeBackend {
    async fn store(
        &self,
        key: &ResumeKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ResumeStoreError> {
        match self {
            Self::Local(store) => store.store(key, bytes, content_type).await,
            Self::ObjectStore(store) => store.store(key, bytes, content_type).await,
        }
    }

    async fn fetch(&self, key: &ResumeKey) -> Result<ResumeFile, ResumeStoreError> {
        match self {
            Self::Local(store) => store.fetch(key).await,
            Self::ObjectStore(store) => store.fetch(key).await,
        }
    }

    async fn remove(&self, key: &ResumeKey) -> Result<(), ResumeStoreError> {
        match self {
            Self::Local(store) => store.remove(key).await,
            Self::ObjectStore(store) => store.remove(key).await,
        }
    }
}
