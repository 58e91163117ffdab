//! # Messaging
//!
//! Broker abstraction and its AMQP implementation.
//!
//! Domain code publishes through the [`MessageChannel`] trait and consumes
//! through [`MessageHandler`] implementations; only [`RabbitMessageChannel`]
//! knows AMQP. Tests swap in [`InMemoryMessageChannel`] to assert on the
//! exact messages that crossed the seam.

pub mod channel;
pub mod errors;
pub mod in_memory;
pub mod message;
pub mod rabbit;

pub use channel::{MessageChannel, MessageHandler};
pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryMessageChannel;
pub use message::{InboundMessage, OutboundMessage, CORRELATION_HEADER};
pub use rabbit::RabbitMessageChannel;
