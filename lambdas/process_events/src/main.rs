use event_handler::{function_handler, OrderEventHandler};
use lambda_runtime::{run, service_fn, tracing, Error};
use shared::batch::{JsonItem, KinesisBatchProcessor};

mod event_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let processor = KinesisBatchProcessor::new(
        JsonItem::<event_handler::OrderEvent>::new(),
        OrderEventHandler,
    );

    run(service_fn(|event| function_handler(&processor, event))).await
}
