//! Domain layer: chat entities, value objects and the seams the use cases depend on.

pub mod entity;
pub mod error;
pub mod message_sink;
pub mod repository;
pub mod value_object;

pub use entity::{ChatMessage, PendingMessage, ScheduledMessage, UserPresence, is_addressed_to};
pub use error::{MessageSinkError, UsernameError};
pub use message_sink::MessageSink;
#[cfg(test)]
pub use message_sink::MockMessageSink;
pub use repository::MessageRepository;
pub use value_object::{MessageId, ScheduleId, Username};
