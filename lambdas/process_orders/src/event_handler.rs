use async_trait::async_trait;
use aws_lambda_events::{event::sqs::SqsEvent, sqs::SqsBatchResponse};
use lambda_runtime::{tracing, Error, LambdaEvent};
use serde::Deserialize;
use shared::batch::{HandlerError, ItemCodec, ItemHandler, SqsSource};
use shared::large_message::{LargeMessageBatchProcessor, MessageFailureHandler};
use shared::storage::ObjectStorage;

#[derive(Debug, Deserialize)]
pub(crate) struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub amount: f64,
}

pub(crate) struct OrderHandler;

#[async_trait]
impl ItemHandler<Order> for OrderHandler {
    async fn handle(&self, order: Order) -> Result<(), HandlerError> {
        if order.amount <= 0.0 {
            return Err(format!(
                "rejected order {} with non-positive amount",
                order.order_id
            )
            .into());
        }

        // Your business logic here
        tracing::info!(
            "Order {} for customer {} with amount ${}",
            order.order_id,
            order.customer_id,
            order.amount
        );
        Ok(())
    }
}

pub(crate) async fn function_handler<S, F, C, H>(
    processor: &LargeMessageBatchProcessor<S, F, C, H>,
    event: LambdaEvent<SqsEvent>,
) -> Result<SqsBatchResponse, Error>
where
    S: ObjectStorage,
    F: MessageFailureHandler,
    C: ItemCodec<SqsSource>,
    H: ItemHandler<C::Item>,
{
    Ok(processor.process(event.payload).await?)
}
