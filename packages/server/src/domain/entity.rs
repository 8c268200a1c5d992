//! Domain entities.

use chrono::{DateTime, Utc};

use super::value_object::{MessageId, ScheduleId, Username};

/// A chat message that has not been persisted yet.
///
/// Built from a client request; becomes a [`ChatMessage`] once the message
/// store assigns it an id and a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub sender: Username,
    /// Empty means everyone.
    pub receivers: Vec<Username>,
    pub body: String,
}

impl PendingMessage {
    pub fn new(sender: Username, receivers: Vec<Username>, body: String) -> Self {
        Self {
            sender,
            receivers,
            body,
        }
    }
}

/// A persisted chat message. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Username,
    /// Empty means everyone.
    pub receivers: Vec<Username>,
    pub timestamp: DateTime<Utc>,
    pub body: String,
}

impl ChatMessage {
    pub fn from_pending(pending: PendingMessage, id: MessageId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            sender: pending.sender,
            receivers: pending.receivers,
            timestamp,
            body: pending.body,
        }
    }

    /// Whether `username` is addressed by this message.
    pub fn is_receiver(&self, username: &Username) -> bool {
        is_addressed_to(&self.receivers, username)
    }

    /// Senders always see their own messages.
    pub fn is_visible_to(&self, username: &Username) -> bool {
        self.is_receiver(username) || &self.sender == username
    }
}

/// `receivers` addresses `username` when it is empty or lists them.
pub fn is_addressed_to(receivers: &[Username], username: &Username) -> bool {
    receivers.is_empty() || receivers.contains(username)
}

/// A message held back until its delivery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledMessage {
    pub id: ScheduleId,
    pub message: PendingMessage,
    pub deliver_at: DateTime<Utc>,
}

impl ScheduledMessage {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.deliver_at <= now
    }
}

/// Online/offline status of a username ever seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPresence {
    pub username: Username,
    pub online: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    fn message(sender: &str, receivers: &[&str]) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(1),
            sender: user(sender),
            receivers: receivers.iter().map(|r| user(r)).collect(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            body: "hi".to_string(),
        }
    }

    #[test]
    fn test_message_without_receivers_is_visible_to_everyone() {
        // テスト項目: 宛先が空のメッセージは送信者を含む全員に見える
        let msg = message("alice", &[]);

        assert!(msg.is_visible_to(&user("alice")));
        assert!(msg.is_visible_to(&user("bob")));
        assert!(msg.is_visible_to(&user("carol")));
    }

    #[test]
    fn test_direct_message_is_visible_to_receiver_and_sender_only() {
        // テスト項目: 宛先指定のメッセージは宛先と送信者にだけ見える
        let msg = message("alice", &["bob"]);

        assert!(msg.is_visible_to(&user("alice")));
        assert!(msg.is_visible_to(&user("bob")));
        assert!(!msg.is_visible_to(&user("carol")));
        assert!(!msg.is_receiver(&user("alice")));
    }

    #[test]
    fn test_scheduled_message_due_at_exact_time() {
        // テスト項目: 配信時刻ちょうどで配信対象になる
        let deliver_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let scheduled = ScheduledMessage {
            id: ScheduleId::new(1),
            message: PendingMessage::new(user("alice"), vec![], "later".to_string()),
            deliver_at,
        };

        assert!(!scheduled.is_due(deliver_at - chrono::TimeDelta::seconds(1)));
        assert!(scheduled.is_due(deliver_at));
        assert!(scheduled.is_due(deliver_at + chrono::TimeDelta::seconds(1)));
    }
}
