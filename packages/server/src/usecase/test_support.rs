//! Shared fixtures for use case tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use kairo_shared::time::FixedClock;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{MessageSink, MessageSinkError, Username},
    infrastructure::{
        Broadcaster, InMemoryMessageRepository, PresenceTable, ScheduledMessages, SessionTable,
    },
};

/// Sink that forwards every text to an unbounded channel.
struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send_text(&self, text: &str) -> Result<(), MessageSinkError> {
        self.tx
            .send(text.to_string())
            .map_err(|_| MessageSinkError::Disconnected)
    }

    async fn close(&self, _code: u16, _reason: &str) {}
}

/// Receiving end of a [`ChannelSink`].
pub(crate) struct Inbox {
    rx: mpsc::UnboundedReceiver<String>,
}

impl Inbox {
    /// Every envelope received so far, parsed.
    pub(crate) fn drain(&mut self) -> Vec<Value> {
        let mut envelopes = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            envelopes.push(serde_json::from_str(&text).unwrap());
        }
        envelopes
    }

    /// Kinds of every envelope received so far.
    pub(crate) fn kinds(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|e| e["kind"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

pub(crate) fn channel_sink() -> (Arc<dyn MessageSink>, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelSink { tx }), Inbox { rx })
}

pub(crate) fn user(name: &str) -> Username {
    Username::parse(name).unwrap()
}

pub(crate) struct Fixture {
    pub sessions: Arc<SessionTable>,
    pub presence: Arc<PresenceTable>,
    pub repository: Arc<InMemoryMessageRepository>,
    pub scheduled: Arc<ScheduledMessages>,
    pub broadcaster: Broadcaster,
    pub clock: Arc<FixedClock>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let sessions = Arc::new(SessionTable::new());
        Self {
            broadcaster: Broadcaster::new(sessions.clone()),
            sessions,
            presence: Arc::new(PresenceTable::new()),
            repository: Arc::new(InMemoryMessageRepository::new(clock.clone())),
            scheduled: Arc::new(ScheduledMessages::new()),
            clock,
        }
    }

    /// Put a user online without going through the login flow.
    pub(crate) async fn connect(&self, name: &str) -> Inbox {
        let (sink, inbox) = channel_sink();
        assert!(self.sessions.try_register(user(name), sink).await);
        self.presence.set_online(&user(name));
        inbox
    }
}
