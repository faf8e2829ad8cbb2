//! Queue service providers

pub mod in_memory;
#[cfg(feature = "rabbitmq")]
pub mod rabbitmq;

pub use in_memory::InMemoryQueueService;
#[cfg(feature = "rabbitmq")]
pub use rabbitmq::RabbitMqQueueService;
