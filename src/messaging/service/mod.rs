//! # Queue Service
//!
//! Transport abstraction between the broker and the consume loop.

pub mod providers;
pub mod traits;
pub mod types;

pub use providers::InMemoryQueueService;
#[cfg(feature = "rabbitmq")]
pub use providers::RabbitMqQueueService;
pub use traits::QueueService;
pub use types::{Delivery, ReceiptHandle};
