use async_trait::async_trait;
use aws_lambda_events::{event::kinesis::KinesisEvent, streams::KinesisEventResponse};
use lambda_runtime::{tracing, Error, LambdaEvent};
use serde::Deserialize;
use shared::batch::{HandlerError, ItemCodec, ItemHandler, KinesisBatchProcessor, KinesisSource};

#[derive(Debug, Deserialize)]
pub(crate) struct OrderEvent {
    pub order_id: String,
    pub customer_id: String,
    pub amount: f64,
}

pub(crate) struct OrderEventHandler;

#[async_trait]
impl ItemHandler<OrderEvent> for OrderEventHandler {
    async fn handle(&self, order_event: OrderEvent) -> Result<(), HandlerError> {
        if order_event.amount < 0.0 {
            return Err(format!(
                "rejected order event {} with negative amount",
                order_event.order_id
            )
            .into());
        }

        // Your business logic here
        tracing::info!(
            "Order {} for customer {} with amount ${}",
            order_event.order_id,
            order_event.customer_id,
            order_event.amount
        );
        Ok(())
    }
}

pub(crate) async fn function_handler<C, H>(
    processor: &KinesisBatchProcessor<C, H>,
    event: LambdaEvent<KinesisEvent>,
) -> Result<KinesisEventResponse, Error>
where
    C: ItemCodec<KinesisSource>,
    H: ItemHandler<C::Item>,
{
    Ok(processor.process(event.payload).await)
}
