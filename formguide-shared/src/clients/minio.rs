use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("bucket check failed: {0}")]
    Unavailable(String),
}

/// Object storage for uploaded documents. Returns the retrievable URL.
#[axum::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, StorageError>;
    async fn ping(&self) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct MinioClient {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl MinioClient {
    pub async fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "minio");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = S3Client::from_conf(config);

        // Already-exists is the common case here
        if let Err(e) = client.create_bucket().bucket(bucket).send().await {
            tracing::debug!(bucket = %bucket, error = %e, "create_bucket skipped");
        }

        tracing::info!(endpoint = %endpoint, bucket = %bucket, "MinIO client initialized");

        Self {
            client,
            bucket: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket, key)
    }
}

#[axum::async_trait]
impl ObjectStorage for MinioClient {
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        Ok(self.object_url(key))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
