use async_trait::async_trait;
use aws_lambda_events::{
    event::sqs::SqsEvent,
    sqs::{SqsBatchResponse, SqsMessage},
};
use futures::{stream, StreamExt};

use crate::batch::{ItemCodec, ItemHandler, SqsBatchProcessor, SqsSource};
use crate::storage::{ObjectStorage, ObjectStorageError};

#[cfg(any(test, feature = "mocks"))]
use mockall::automock;

mod pointer;

pub use pointer::{PayloadPointer, POINTER_CLASS};

pub const DEFAULT_MAX_CONCURRENT_DELETES: usize = 4;

/// Failures of the payload resolution step itself, kept apart from
/// per-record processing failures: any of these aborts the invocation.
#[derive(Debug, thiserror::Error)]
pub enum LargeMessageError {
    /// Body matched the pointer sentinel but the full parse failed. Never
    /// downgraded to "not a pointer".
    #[error("failed to parse S3 pointer from message body [ {body} ]")]
    MalformedPointer { body: String },
    /// Offloaded payload could not be fetched and no strategy recovered.
    #[error("failed fetching offloaded payload for message {message_id}")]
    Fetch {
        message_id: String,
        #[source]
        source: ObjectStorageError,
    },
    /// Fetched object was not valid message text.
    #[error("offloaded payload at s3://{bucket}/{key} is not valid UTF-8")]
    InvalidPayload { bucket: String, key: String },
    /// A caller-supplied failure strategy failed itself.
    #[error("message failure handler failed: {0}")]
    Handler(String),
}

/// Caller-supplied recovery strategy for storage failures, invoked per
/// message on fetch and per pointer on delete. Returning `Err` aborts the
/// invocation.
#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait MessageFailureHandler: Send + Sync {
    async fn on_fetch_failure(
        &self,
        error: ObjectStorageError,
        message: &SqsMessage,
    ) -> Result<(), LargeMessageError>;

    async fn on_delete_failure(
        &self,
        error: ObjectStorageError,
        pointer: &PayloadPointer,
    ) -> Result<(), LargeMessageError>;
}

/// Default strategy: a payload that cannot be fetched aborts the whole
/// invocation; a payload that cannot be deleted is logged and left behind.
#[derive(Debug, Default)]
pub struct DefaultFailureHandler;

#[async_trait]
impl MessageFailureHandler for DefaultFailureHandler {
    async fn on_fetch_failure(
        &self,
        error: ObjectStorageError,
        message: &SqsMessage,
    ) -> Result<(), LargeMessageError> {
        Err(LargeMessageError::Fetch {
            message_id: message.message_id.clone().unwrap_or_default(),
            source: error,
        })
    }

    async fn on_delete_failure(
        &self,
        error: ObjectStorageError,
        pointer: &PayloadPointer,
    ) -> Result<(), LargeMessageError> {
        tracing::warn!(
            "Failed to delete offloaded payload s3://{}/{}: {}",
            pointer.bucket,
            pointer.key,
            error
        );
        Ok(())
    }
}

/// Rewrites pointer-bodied messages to their offloaded payloads before they
/// reach a processor, and deletes fetched payloads afterwards when enabled.
pub struct LargeMessageResolver<S, F = DefaultFailureHandler> {
    storage: S,
    failure_handler: F,
    delete_payloads: bool,
    max_concurrent_deletes: usize,
}

impl<S: ObjectStorage> LargeMessageResolver<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            failure_handler: DefaultFailureHandler,
            delete_payloads: false,
            max_concurrent_deletes: DEFAULT_MAX_CONCURRENT_DELETES,
        }
    }
}

impl<S, F> LargeMessageResolver<S, F>
where
    S: ObjectStorage,
    F: MessageFailureHandler,
{
    /// Delete fetched payloads from storage once the batch has completed.
    pub fn delete_payloads(mut self, delete: bool) -> Self {
        self.delete_payloads = delete;
        self
    }

    /// Bound on concurrent delete requests issued during cleanup.
    pub fn max_concurrent_deletes(mut self, limit: usize) -> Self {
        self.max_concurrent_deletes = limit.max(1);
        self
    }

    pub fn failure_handler<G: MessageFailureHandler>(
        self,
        handler: G,
    ) -> LargeMessageResolver<S, G> {
        LargeMessageResolver {
            storage: self.storage,
            failure_handler: handler,
            delete_payloads: self.delete_payloads,
            max_concurrent_deletes: self.max_concurrent_deletes,
        }
    }

    /// Scans the batch in source order and rewrites every pointer-bodied
    /// message to the payload stored behind it. Returns the pointers that
    /// were fetched, for a later [`cleanup`](Self::cleanup).
    pub async fn resolve(
        &self,
        records: &mut [SqsMessage],
    ) -> Result<Vec<PayloadPointer>, LargeMessageError> {
        let mut fetched = Vec::new();

        for message in records.iter_mut() {
            let body = match message.body.as_deref() {
                Some(body) if PayloadPointer::is_pointer(body) => body.to_string(),
                _ => continue,
            };

            let pointer = PayloadPointer::from_json(&body)?;

            match self.storage.get_object(&pointer.bucket, &pointer.key).await {
                Ok(bytes) => {
                    let payload = String::from_utf8(bytes).map_err(|_| {
                        LargeMessageError::InvalidPayload {
                            bucket: pointer.bucket.clone(),
                            key: pointer.key.clone(),
                        }
                    })?;
                    tracing::debug!("Object downloaded with key: {}", pointer.key);
                    message.body = Some(payload);
                    fetched.push(pointer);
                }
                Err(error) => {
                    tracing::error!(
                        "Failed fetching s3://{}/{} for message {:?}: {}",
                        pointer.bucket,
                        pointer.key,
                        message.message_id,
                        error
                    );
                    // A recovered fetch leaves the pointer body in place; the
                    // record stands or falls on its own during processing.
                    self.failure_handler.on_fetch_failure(error, message).await?;
                }
            }
        }

        Ok(fetched)
    }

    /// Deletes fetched payloads with bounded concurrency. Every pointer gets
    /// a deletion attempt; the first strategy error is reported afterwards.
    pub async fn cleanup(&self, pointers: &[PayloadPointer]) -> Result<(), LargeMessageError> {
        if !self.delete_payloads || pointers.is_empty() {
            return Ok(());
        }

        let results: Vec<Result<(), LargeMessageError>> = stream::iter(pointers)
            .map(|pointer| self.delete_one(pointer))
            .buffer_unordered(self.max_concurrent_deletes)
            .collect()
            .await;

        results
            .into_iter()
            .find(|result| result.is_err())
            .unwrap_or(Ok(()))
    }

    async fn delete_one(&self, pointer: &PayloadPointer) -> Result<(), LargeMessageError> {
        match self
            .storage
            .delete_object(&pointer.bucket, &pointer.key)
            .await
        {
            Ok(()) => {
                tracing::debug!("Deleted offloaded payload: {}", pointer.to_json());
                Ok(())
            }
            Err(error) => {
                tracing::error!(
                    "Failed deleting s3://{}/{}: {}",
                    pointer.bucket,
                    pointer.key,
                    error
                );
                self.failure_handler.on_delete_failure(error, pointer).await
            }
        }
    }
}

/// A batch processor with payload resolution before dispatch and cleanup
/// after it. Handler logic never sees pointer-form bodies, and cleanup runs
/// whatever the per-record outcomes were.
pub struct LargeMessageBatchProcessor<S, F, C, H>
where
    S: ObjectStorage,
    F: MessageFailureHandler,
    C: ItemCodec<SqsSource>,
    H: ItemHandler<C::Item>,
{
    resolver: LargeMessageResolver<S, F>,
    processor: SqsBatchProcessor<C, H>,
}

impl<S, F, C, H> LargeMessageBatchProcessor<S, F, C, H>
where
    S: ObjectStorage,
    F: MessageFailureHandler,
    C: ItemCodec<SqsSource>,
    H: ItemHandler<C::Item>,
{
    pub fn new(resolver: LargeMessageResolver<S, F>, processor: SqsBatchProcessor<C, H>) -> Self {
        Self {
            resolver,
            processor,
        }
    }

    pub async fn process(&self, mut event: SqsEvent) -> Result<SqsBatchResponse, LargeMessageError> {
        let pointers = self.resolver.resolve(&mut event.records).await?;
        let response = self.processor.process(event).await;
        self.resolver.cleanup(&pointers).await?;
        Ok(response)
    }
}
