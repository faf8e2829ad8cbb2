//! # Messaging Module
//!
//! Routing keys, message decoding and the queue transport the consumers pull
//! from.

pub mod errors;
pub mod message;
pub mod routing;
pub mod service;

pub use errors::{DecodeError, MessagingError};
pub use message::{decode, Message};
pub use routing::RoutingKey;
pub use service::{Delivery, InMemoryQueueService, QueueService, ReceiptHandle};
