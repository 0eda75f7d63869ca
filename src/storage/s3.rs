use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use tracing::{debug, error, info, instrument};

use super::{ObjectMeta, ObjectStore, StorageError, StorageResult};
use crate::config::S3StorageConfig;

/// S3-compatible object store.
///
/// Supports AWS S3 and S3-compatible services (MinIO, Cloudflare R2, ...)
/// through a custom endpoint and path-style addressing.
///
/// Required IAM permissions on the bucket: `s3:GetObject` (HEAD),
/// `s3:DeleteObject` and `s3:ListBucket`. Without `s3:ListBucket`, S3 answers
/// HEAD on a missing key with 403 instead of 404, so an object that was
/// already gone is reported as deleted (size 0) rather than skipped.
pub struct S3ObjectStore {
    config: S3StorageConfig,
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub async fn new(config: S3StorageConfig) -> Self {
        info!(bucket = %config.bucket, "Initializing S3 object store");

        let mut sdk_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            sdk_config_builder = sdk_config_builder.region(aws_config::Region::new(region.clone()));
        }

        // Explicit credentials win over the default provider chain
        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = aws_credential_types::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None, // session token
                None, // expiry
                "audio-janitor-config",
            );
            sdk_config_builder = sdk_config_builder.credentials_provider(credentials);
        }

        let sdk_config = sdk_config_builder.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(s3_config_builder.build());

        Self { config, client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => Ok(ObjectMeta {
                size: output.content_length().unwrap_or(0).max(0) as u64,
            }),
            Err(e) => {
                let not_found = e.as_service_error().is_some_and(|se| se.is_not_found());
                let status = e.raw_response().map(|r| r.status().as_u16());
                Err(head_error(
                    key,
                    not_found,
                    status,
                    DisplayErrorContext(&e).to_string(),
                ))
            }
        }
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        debug!(key, "Deleting object from S3");

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.code() == Some("NoSuchKey") {
                    StorageError::NotFound(key.to_string())
                } else {
                    error!(error = %DisplayErrorContext(&e), "Failed to delete from S3");
                    StorageError::S3(DisplayErrorContext(&e).to_string())
                }
            })?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

/// Classify a failed HEAD. HEAD responses have no body, so a bare 404 is all
/// some S3-compatible services return.
fn head_error(key: &str, not_found: bool, status: Option<u16>, detail: String) -> StorageError {
    match status {
        _ if not_found => StorageError::NotFound(key.to_string()),
        Some(404) => StorageError::NotFound(key.to_string()),
        Some(403) => StorageError::S3(format!(
            "{detail} (HEAD returned 403; a missing key also yields 403 unless s3:ListBucket is granted)"
        )),
        _ => StorageError::S3(detail),
    }
}
