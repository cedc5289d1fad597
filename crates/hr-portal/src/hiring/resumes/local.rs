use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use super::{ResumeFile, ResumeKey, ResumeStore, ResumeStoreError};

/// Filesystem-backed store writing one file per key under a root directory.
#[derive(Debug, Clone)]
pub struct LocalResumeStore {
    root: PathBuf,
}

impl LocalResumeStore {
    /// Open the store, creating the directory tree when missing.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, ResumeStoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &ResumeKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

#[async_trait]
impl ResumeStore for LocalResumeStore {
    async fn store(
        &self,
        key: &ResumeKey,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), ResumeStoreError> {
        let path = self.path_for(key);
        // create_new: an existing file is never replaced
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(ResumeStoreError::Conflict)
            }
            Err(err) => return Err(err.into()),
        };

        write_or_discard(&path, file, &bytes).await
    }

    async fn fetch(&self, key: &ResumeKey) -> Result<ResumeFile, ResumeStoreError> {
        let bytes = match fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(ResumeStoreError::NotFound),
            Err(err) => return Err(err.into()),
        };

        let content_type = mime_guess::from_path(key.as_str())
            .first()
            .map(|mime| mime.essence_str().to_string());

        Ok(ResumeFile {
            bytes,
            content_type,
        })
    }

    async fn remove(&self, key: &ResumeKey) -> Result<(), ResumeStoreError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(ResumeStoreError::NotFound),
            Err(err) => Err(err.into()),
        }
    }
}

/// Write `bytes` to the freshly created file at `path`. On failure the
/// partial file is removed so the key does not point at a truncated resume.
async fn write_or_discard<W>(
    path: &Path,
    mut file: W,
    bytes: &[u8],
) -> Result<(), ResumeStoreError>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(err) => Err(err),
    };
    let Err(err) = written else {
        return Ok(());
    };

    drop(file);
    if let Err(cleanup) = fs::remove_file(path).await {
        warn!(path = %path.display(), error = %cleanup, "partial resume left on disk");
    }
    Err(err.into())
}
