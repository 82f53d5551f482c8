use aws_lambda_events::{
    event::sqs::SqsEvent,
    sqs::{BatchItemFailure, SqsBatchResponse, SqsMessage},
};

use super::EventSource;

/// Queue-shaped source: at-least-once delivery with no ordering guarantee.
/// Reporting only the failed message ids leaves the rest of the batch
/// acknowledged, so the queue redrives just the failures.
#[derive(Debug)]
pub struct SqsSource;

impl EventSource for SqsSource {
    type Event = SqsEvent;
    type Record = SqsMessage;
    type Response = SqsBatchResponse;

    fn records(event: SqsEvent) -> Vec<SqsMessage> {
        event.records
    }

    fn record_id(record: &SqsMessage) -> String {
        record.message_id.clone().unwrap_or_default()
    }

    fn record_body(record: &SqsMessage) -> Option<&[u8]> {
        record.body.as_deref().map(str::as_bytes)
    }

    fn response_from_failures(failures: Vec<String>) -> SqsBatchResponse {
        let mut response = SqsBatchResponse::default();
        response.batch_item_failures = failures
            .into_iter()
            .map(|id| {
                let mut failure = BatchItemFailure::default();
                failure.item_identifier = id;
                failure
            })
            .collect();
        response
    }
}
