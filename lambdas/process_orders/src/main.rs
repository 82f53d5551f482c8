use event_handler::{function_handler, OrderHandler};
use lambda_runtime::{run, service_fn, tracing, Error};
use shared::batch::{JsonItem, SqsBatchProcessor};
use shared::configuration::Configuration;
use shared::large_message::{LargeMessageBatchProcessor, LargeMessageResolver};
use shared::storage::{self, S3ObjectStorage};

mod event_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();
    let configuration = Configuration::load();
    let storage = S3ObjectStorage::new(storage::shared_client().await);

    let resolver = LargeMessageResolver::new(storage)
        .delete_payloads(configuration.delete_payloads)
        .max_concurrent_deletes(configuration.max_concurrent_deletes);
    let processor = LargeMessageBatchProcessor::new(
        resolver,
        SqsBatchProcessor::new(JsonItem::<event_handler::Order>::new(), OrderHandler),
    );

    run(service_fn(|event| function_handler(&processor, event))).await
}
