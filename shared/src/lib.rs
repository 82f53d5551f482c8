pub mod batch;
pub mod configuration;
pub mod large_message;
pub mod storage;

pub use batch::{BatchProcessor, KinesisBatchProcessor, SqsBatchProcessor};
pub use large_message::{LargeMessageBatchProcessor, LargeMessageResolver};
