//! Messages waiting for their delivery time.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::{PendingMessage, ScheduleId, ScheduledMessage};

/// Scheduled set keyed by provisional id.
///
/// Provisional ids start at 1 and follow submission order. They are
/// unrelated to the ids the message store assigns on delivery.
#[derive(Debug)]
pub struct ScheduledMessages {
    entries: DashMap<ScheduleId, ScheduledMessage>,
    next_id: AtomicU64,
}

impl Default for ScheduledMessages {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl ScheduledMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, message: PendingMessage, deliver_at: DateTime<Utc>) -> ScheduleId {
        let id = ScheduleId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.entries.insert(
            id,
            ScheduledMessage {
                id,
                message,
                deliver_at,
            },
        );
        id
    }

    /// Remove and return every entry due at `now`, in provisional-id order.
    ///
    /// Each entry is removed exactly once, so two concurrent callers never
    /// return the same message.
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<ScheduledMessage> {
        let mut due: Vec<ScheduleId> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_due(now))
            .map(|entry| *entry.key())
            .collect();
        due.sort_unstable();

        due.into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|(_, entry)| entry))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Username;
    use chrono::{TimeDelta, TimeZone};

    fn pending(body: &str) -> PendingMessage {
        PendingMessage::new(Username::parse("alice").unwrap(), vec![], body.to_string())
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_only_due_entries_are_taken() {
        // テスト項目: 配信時刻を過ぎたものだけが取り出される
        // given (前提条件):
        let scheduled = ScheduledMessages::new();
        scheduled.schedule(pending("now"), base_time());
        scheduled.schedule(pending("later"), base_time() + TimeDelta::minutes(5));

        // when (操作):
        let due = scheduled.take_due(base_time());

        // then (期待する結果):
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].message.body, "now");
        assert_eq!(scheduled.len(), 1);
    }

    #[test]
    fn test_due_entries_follow_submission_order() {
        // テスト項目: 同時に期限を迎えたものは登録順（仮 ID 順）で返る
        // given (前提条件): 後から登録したものほど配信時刻が早い
        let scheduled = ScheduledMessages::new();
        scheduled.schedule(pending("first"), base_time() + TimeDelta::seconds(2));
        scheduled.schedule(pending("second"), base_time() + TimeDelta::seconds(1));
        scheduled.schedule(pending("third"), base_time());

        // when (操作):
        let due = scheduled.take_due(base_time() + TimeDelta::seconds(10));

        // then (期待する結果):
        let bodies: Vec<&str> = due.iter().map(|s| s.message.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
        assert!(scheduled.is_empty());
    }

    #[test]
    fn test_entries_are_taken_once() {
        // テスト項目: 一度取り出したものは二度と返らない
        let scheduled = ScheduledMessages::new();
        let id = scheduled.schedule(pending("once"), base_time());

        let first = scheduled.take_due(base_time());
        let second = scheduled.take_due(base_time());

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, id);
        assert!(second.is_empty());
    }

    #[test]
    fn test_provisional_ids_start_at_one() {
        // テスト項目: 仮 ID は 1 から順に振られる
        let scheduled = ScheduledMessages::new();

        let a = scheduled.schedule(pending("a"), base_time());
        let b = scheduled.schedule(pending("b"), base_time());

        assert_eq!(a.value(), 1);
        assert_eq!(b.value(), 2);
    }
}
