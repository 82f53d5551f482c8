use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use serde::de::DeserializeOwned;

mod kinesis;
mod sqs;

pub use kinesis::KinesisSource;
pub use sqs::SqsSource;

/// Error type produced by codecs and item handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// One platform event shape: ordered records in, partial-failure response out.
pub trait EventSource {
    type Event: Send;
    type Record: Send + Sync;
    type Response: Send;

    /// Records in source order.
    fn records(event: Self::Event) -> Vec<Self::Record>;

    /// Platform-assigned id, unique within the batch.
    fn record_id(record: &Self::Record) -> String;

    /// Raw payload bytes, if the record carries one.
    fn record_body(record: &Self::Record) -> Option<&[u8]>;

    /// Builds the platform response from the failed ids, in failure order.
    fn response_from_failures(failures: Vec<String>) -> Self::Response;
}

/// Converts a record into the item a handler expects. The target shape is
/// fixed by the generic parameter when the processor is constructed, not
/// re-derived per record.
pub trait ItemCodec<S: EventSource>: Send + Sync {
    type Item: Send;

    fn decode(&self, record: &S::Record) -> Result<Self::Item, HandlerError>;
}

/// Pass-through codec: the handler receives the record unchanged.
#[derive(Debug, Default)]
pub struct RawRecord;

impl<S> ItemCodec<S> for RawRecord
where
    S: EventSource,
    S::Record: Clone,
{
    type Item = S::Record;

    fn decode(&self, record: &S::Record) -> Result<Self::Item, HandlerError> {
        Ok(record.clone())
    }
}

/// Decodes the record body as JSON into `T`.
#[derive(Debug)]
pub struct JsonItem<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonItem<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for JsonItem<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, T> ItemCodec<S> for JsonItem<T>
where
    S: EventSource,
    T: DeserializeOwned + Send,
{
    type Item = T;

    fn decode(&self, record: &S::Record) -> Result<Self::Item, HandlerError> {
        let body = S::record_body(record).ok_or("record has no body")?;
        Ok(serde_json::from_slice(body)?)
    }
}

/// Per-item logic. Supplied once at processor construction and reused for
/// every record in every batch.
#[async_trait]
pub trait ItemHandler<I>: Send + Sync {
    async fn handle(&self, item: I) -> Result<(), HandlerError>;
}

pub struct HandlerFn<F> {
    f: F,
}

/// Wraps an async function as an [`ItemHandler`].
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

#[async_trait]
impl<I, F, Fut> ItemHandler<I> for HandlerFn<F>
where
    I: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, item: I) -> Result<(), HandlerError> {
        (self.f)(item).await
    }
}

pub type SqsBatchProcessor<C, H> = BatchProcessor<SqsSource, C, H>;
pub type KinesisBatchProcessor<C, H> = BatchProcessor<KinesisSource, C, H>;

/// Drives one batch: decodes and handles every record, converting each
/// failure into a batch item failure for that record alone. A failing
/// record never aborts the rest of the batch.
pub struct BatchProcessor<S, C, H>
where
    S: EventSource,
    C: ItemCodec<S>,
    H: ItemHandler<C::Item>,
{
    codec: C,
    handler: H,
    _source: PhantomData<fn() -> S>,
}

impl<S, C, H> BatchProcessor<S, C, H>
where
    S: EventSource,
    C: ItemCodec<S>,
    H: ItemHandler<C::Item>,
{
    pub fn new(codec: C, handler: H) -> Self {
        Self {
            codec,
            handler,
            _source: PhantomData,
        }
    }

    /// Each call starts from a fresh failure list; the processor itself
    /// holds no per-batch state.
    pub async fn process(&self, event: S::Event) -> S::Response {
        let mut failures: Vec<String> = Vec::new();

        for record in S::records(event) {
            let record_id = S::record_id(&record);
            if let Err(e) = self.process_record(&record).await {
                tracing::error!("Failed to process record {}: {}", record_id, e);
                failures.push(record_id);
            }
        }

        S::response_from_failures(failures)
    }

    async fn process_record(&self, record: &S::Record) -> Result<(), HandlerError> {
        let item = match self.codec.decode(record) {
            Ok(item) => item,
            Err(e) => {
                tracing::debug!("Record body failed to decode: {}", e);
                return Err(e);
            }
        };

        // Panics are contained at the record boundary, same as errors.
        match AssertUnwindSafe(self.handler.handle(item)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err("item handler panicked".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use aws_lambda_events::{event::sqs::SqsEvent, sqs::SqsMessage};

    use super::{handler_fn, HandlerError, ItemHandler, JsonItem, RawRecord, SqsBatchProcessor};

    fn create_sqs_message(message_id: &str, body: Option<String>) -> SqsMessage {
        let mut message = SqsMessage::default();
        message.message_id = Some(message_id.to_string());
        message.body = body;
        message
    }

    fn create_sqs_event(messages: Vec<SqsMessage>) -> SqsEvent {
        let mut sqs_event = SqsEvent::default();
        sqs_event.records = messages;
        sqs_event
    }

    fn failing_on_body(
        trigger: &'static str,
    ) -> impl Fn(SqsMessage) -> futures::future::Ready<Result<(), HandlerError>> {
        move |message: SqsMessage| {
            let result = if message.body.as_deref() == Some(trigger) {
                Err("simulated processing error".into())
            } else {
                Ok(())
            };
            futures::future::ready(result)
        }
    }

    #[tokio::test]
    async fn when_one_record_fails_should_report_only_that_record() {
        let processor = SqsBatchProcessor::new(RawRecord, handler_fn(failing_on_body("fail")));

        let event = create_sqs_event(vec![
            create_sqs_message("msg-a", Some("ok".to_string())),
            create_sqs_message("msg-b", Some("fail".to_string())),
            create_sqs_message("msg-c", Some("ok".to_string())),
        ]);

        let response = processor.process(event).await;

        let failed: Vec<_> = response
            .batch_item_failures
            .iter()
            .map(|f| f.item_identifier.as_str())
            .collect();
        assert_eq!(failed, vec!["msg-b"]);
    }

    #[tokio::test]
    async fn when_all_records_succeed_should_return_empty_response() {
        let processor = SqsBatchProcessor::new(RawRecord, handler_fn(failing_on_body("fail")));

        let event = create_sqs_event(vec![
            create_sqs_message("msg-a", Some("ok".to_string())),
            create_sqs_message("msg-b", Some("ok".to_string())),
        ]);

        let response = processor.process(event).await;

        assert!(response.batch_item_failures.is_empty());
    }

    #[tokio::test]
    async fn when_all_records_fail_should_preserve_source_order() {
        let processor = SqsBatchProcessor::new(RawRecord, handler_fn(failing_on_body("fail")));

        let event = create_sqs_event(vec![
            create_sqs_message("msg-a", Some("fail".to_string())),
            create_sqs_message("msg-b", Some("fail".to_string())),
            create_sqs_message("msg-c", Some("fail".to_string())),
        ]);

        let response = processor.process(event).await;

        let failed: Vec<_> = response
            .batch_item_failures
            .iter()
            .map(|f| f.item_identifier.as_str())
            .collect();
        assert_eq!(failed, vec!["msg-a", "msg-b", "msg-c"]);
    }

    struct PanickingHandler;

    #[async_trait]
    impl ItemHandler<SqsMessage> for PanickingHandler {
        async fn handle(&self, message: SqsMessage) -> Result<(), HandlerError> {
            if message.body.as_deref() == Some("boom") {
                panic!("handler exploded");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn when_handler_panics_should_record_failure_and_continue() {
        let processor = SqsBatchProcessor::new(RawRecord, PanickingHandler);

        let event = create_sqs_event(vec![
            create_sqs_message("msg-a", Some("boom".to_string())),
            create_sqs_message("msg-b", Some("ok".to_string())),
        ]);

        let response = processor.process(event).await;

        let failed: Vec<_> = response
            .batch_item_failures
            .iter()
            .map(|f| f.item_identifier.as_str())
            .collect();
        assert_eq!(failed, vec!["msg-a"]);
    }

    #[derive(Debug, serde::Deserialize)]
    struct Task {
        task_id: String,
    }

    #[tokio::test]
    async fn when_body_fails_to_decode_should_report_that_record() {
        let handled = Arc::new(Mutex::new(Vec::new()));
        let handled_clone = Arc::clone(&handled);
        let handler = handler_fn(move |task: Task| {
            let handled = Arc::clone(&handled_clone);
            async move {
                handled.lock().unwrap().push(task.task_id);
                Ok(())
            }
        });
        let processor = SqsBatchProcessor::new(JsonItem::<Task>::new(), handler);

        let event = create_sqs_event(vec![
            create_sqs_message("msg-a", Some("{\"task_id\":\"task-1\"}".to_string())),
            create_sqs_message("msg-b", Some("not json".to_string())),
            create_sqs_message("msg-c", None),
        ]);

        let response = processor.process(event).await;

        let failed: Vec<_> = response
            .batch_item_failures
            .iter()
            .map(|f| f.item_identifier.as_str())
            .collect();
        assert_eq!(failed, vec!["msg-b", "msg-c"]);
        assert_eq!(*handled.lock().unwrap(), vec!["task-1".to_string()]);
    }

    #[tokio::test]
    async fn when_pass_through_codec_should_hand_record_unchanged() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let handler = handler_fn(move |message: SqsMessage| {
            let seen = Arc::clone(&seen_clone);
            async move {
                seen.lock().unwrap().push(message.body.clone());
                Ok(())
            }
        });
        let processor = SqsBatchProcessor::new(RawRecord, handler);

        let event = create_sqs_event(vec![create_sqs_message(
            "msg-a",
            Some("plain text".to_string()),
        )]);

        processor.process(event).await;

        assert_eq!(*seen.lock().unwrap(), vec![Some("plain text".to_string())]);
    }
}
