use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::info;

use super::{ResumeFile, ResumeKey, ResumeStore, ResumeStoreError};

/// S3-compatible bucket store (AWS, MinIO, Supabase storage gateway).
#[derive(Debug, Clone)]
pub struct ObjectResumeStore {
    client: Client,
    bucket: String,
}

impl ObjectResumeStore {
    /// Credentials come from the standard AWS provider chain.
    pub async fn connect(bucket: &str, region: &str, endpoint: Option<&str>) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(
            bucket,
            region,
            endpoint = endpoint.unwrap_or("aws"),
            "using object store for resumes"
        );

        Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
        }
    }

    fn backend_error<E: std::fmt::Display>(err: E) -> ResumeStoreError {
        ResumeStoreError::Backend(err.to_string())
    }
}

#[async_trait]
impl ResumeStore for ObjectResumeStore {
    async fn store(
        &self,
        key: &ResumeKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ResumeStoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| Self::backend_error(aws_sdk_s3::error::DisplayErrorContext(err)))?;
        Ok(())
    }

    async fn fetch(&self, key: &ResumeKey) -> Result<ResumeFile, ResumeStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    .unwrap_or(false)
                {
                    ResumeStoreError::NotFound
                } else {
                    Self::backend_error(aws_sdk_s3::error::DisplayErrorContext(err))
                }
            })?;

        let content_type = output.content_type().map(str::to_string);
        let bytes = output
            .body
            .collect()
            .await
            .map_err(Self::backend_error)?
            .into_bytes()
            .to_vec();

        Ok(ResumeFile {
            bytes,
            content_type,
        })
    }

    async fn remove(&self, key: &ResumeKey) -> Result<(), ResumeStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|err| Self::backend_error(aws_sdk_s3::error::DisplayErrorContext(err)))?;
        Ok(())
    }
}
