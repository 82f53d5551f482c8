use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use tokio::sync::OnceCell;

#[cfg(any(test, feature = "mocks"))]
use mockall::automock;

/// Storage failures, classified so a failure strategy can tell a missing
/// object from a permission problem from a retryable fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectStorageError {
    #[error("object not found at s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("access denied for s3://{bucket}/{key}")]
    AccessDenied { bucket: String, key: String },
    #[error("transient storage failure: {0}")]
    Transient(String),
}

/// Store holding offloaded message payloads.
#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStorageError>;
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStorageError>;
}

#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    s3_client: aws_sdk_s3::Client,
}

impl S3ObjectStorage {
    pub fn new(s3_client: aws_sdk_s3::Client) -> Self {
        Self { s3_client }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStorageError> {
        let result = self
            .s3_client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                let generic_err_msg = format!("Error fetching object: {:?}", e);
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Err(ObjectStorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                if service_error.code() == Some("AccessDenied") {
                    return Err(ObjectStorageError::AccessDenied {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                return Err(ObjectStorageError::Transient(generic_err_msg));
            }
        };

        output
            .body
            .collect()
            .await
            .map(|data| data.into_bytes().to_vec())
            .map_err(|e| ObjectStorageError::Transient(format!("Error reading object body: {:?}", e)))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStorageError> {
        self.s3_client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| {
                let generic_err_msg = format!("Error deleting object: {:?}", e);
                let service_error = e.into_service_error();
                match service_error.code() {
                    Some("NoSuchKey") => ObjectStorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    },
                    Some("AccessDenied") => ObjectStorageError::AccessDenied {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    },
                    _ => ObjectStorageError::Transient(generic_err_msg),
                }
            })
    }
}

static SHARED_CLIENT: OnceCell<aws_sdk_s3::Client> = OnceCell::const_new();

/// Process-wide S3 client, configured on first use and reused across
/// batches. Clones share the underlying connection pool.
pub async fn shared_client() -> aws_sdk_s3::Client {
    SHARED_CLIENT
        .get_or_init(|| async {
            let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            aws_sdk_s3::Client::new(&config)
        })
        .await
        .clone()
}
