use serde::{Deserialize, Serialize};

use super::LargeMessageError;

/// Class marker the payload offloading library writes as the first element
/// of the pointer tuple.
pub const POINTER_CLASS: &str = "software.amazon.payloadoffloading.PayloadS3Pointer";

const POINTER_PREFIX: &str = "[\"software.amazon.payloadoffloading.PayloadS3Pointer\"";

/// Reference to a payload stored in S3 because it exceeded the queue's
/// message size limit. Wire form is a two-element JSON tuple:
/// `["software.amazon.payloadoffloading.PayloadS3Pointer",{"s3BucketName":"...","s3Key":"..."}]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPointer {
    pub bucket: String,
    pub key: String,
}

#[derive(Serialize, Deserialize)]
struct PointerFields {
    #[serde(rename = "s3BucketName")]
    s3_bucket_name: String,
    #[serde(rename = "s3Key")]
    s3_key: String,
}

impl PayloadPointer {
    /// Cheap byte-prefix check. A body that does not start with the exact
    /// sentinel is literal message content, never partially parsed.
    pub fn is_pointer(body: &str) -> bool {
        body.starts_with(POINTER_PREFIX)
    }

    /// Strict parse of the full pointer tuple.
    pub fn from_json(body: &str) -> Result<Self, LargeMessageError> {
        let parsed: Result<(String, PointerFields), _> = serde_json::from_str(body);
        match parsed {
            Ok((class, fields)) if class == POINTER_CLASS => Ok(Self {
                bucket: fields.s3_bucket_name,
                key: fields.s3_key,
            }),
            _ => Err(LargeMessageError::MalformedPointer {
                body: body.to_string(),
            }),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!([
            POINTER_CLASS,
            PointerFields {
                s3_bucket_name: self.bucket.clone(),
                s3_key: self.key.clone(),
            }
        ])
        .to_string()
    }
}
