//! Infrastructure layer: wire DTOs, in-memory stores and the broadcast engine.

pub mod broadcaster;
pub mod dto;
pub mod message_sink;
pub mod repository;
pub mod scheduled;
pub mod session;

pub use broadcaster::{BroadcastError, Broadcaster};
pub use repository::InMemoryMessageRepository;
pub use scheduled::ScheduledMessages;
pub use session::{PresenceTable, SessionTable};
