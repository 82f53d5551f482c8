use aws_lambda_events::{
    event::kinesis::KinesisEvent,
    kinesis::KinesisEventRecord,
    streams::{KinesisBatchItemFailure, KinesisEventResponse},
};

use super::EventSource;

/// Stream-shaped source: records arrive in shard order and the platform
/// resumes redelivery from a failed record's sequence number, so that is
/// the identity reported back.
#[derive(Debug)]
pub struct KinesisSource;

impl EventSource for KinesisSource {
    type Event = KinesisEvent;
    type Record = KinesisEventRecord;
    type Response = KinesisEventResponse;

    fn records(event: KinesisEvent) -> Vec<KinesisEventRecord> {
        event.records
    }

    fn record_id(record: &KinesisEventRecord) -> String {
        record.kinesis.sequence_number.clone()
    }

    fn record_body(record: &KinesisEventRecord) -> Option<&[u8]> {
        Some(record.kinesis.data.as_slice())
    }

    fn response_from_failures(failures: Vec<String>) -> KinesisEventResponse {
        let batch_item_failures = failures
            .into_iter()
            .map(|id| KinesisBatchItemFailure {
                item_identifier: Some(id),
            })
            .collect();
        KinesisEventResponse {
            batch_item_failures,
        }
    }
}
