//! UseCase: 予約メッセージの配信
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DeliverScheduledUseCase::execute() メソッド
//! - 配信時刻を過ぎた予約メッセージの保存とブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 配信時刻より前に配信されないこと、一度だけ配信されることを保証
//! - 予約メッセージは送信者自身にも届く
//!
//! ### どのような状況を想定しているか
//! - 正常系：期限到来、登録順での配信
//! - エッジケース：期限前、二重実行

use std::sync::Arc;

use kairo_shared::time::Clock;

use crate::{
    domain::MessageRepository,
    infrastructure::{Broadcaster, ScheduledMessages},
};

use super::delivery::persist_and_broadcast;

/// 予約メッセージ配信のユースケース
pub struct DeliverScheduledUseCase {
    repository: Arc<dyn MessageRepository>,
    scheduled: Arc<ScheduledMessages>,
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
}

impl DeliverScheduledUseCase {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        scheduled: Arc<ScheduledMessages>,
        broadcaster: Broadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            scheduled,
            broadcaster,
            clock,
        }
    }

    /// Deliver everything due now. Returns how many messages were delivered.
    pub async fn execute(&self) -> usize {
        let due = self.scheduled.take_due(self.clock.now());
        let count = due.len();

        for entry in due {
            let (persisted, broadcast) = persist_and_broadcast(
                self.repository.as_ref(),
                &self.broadcaster,
                entry.message,
                true,
            )
            .await;
            tracing::info!(
                "Delivered scheduled message {} as message {}",
                entry.id.value(),
                persisted.id
            );
            if let Err(e) = broadcast {
                tracing::error!(
                    "Failed to broadcast scheduled message {}: {}",
                    persisted.id,
                    e
                );
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::{
        domain::{PendingMessage, Username},
        usecase::test_support::{Fixture, user},
    };

    fn create_usecase(fixture: &Fixture) -> DeliverScheduledUseCase {
        DeliverScheduledUseCase::new(
            fixture.repository.clone(),
            fixture.scheduled.clone(),
            fixture.broadcaster.clone(),
            fixture.clock.clone(),
        )
    }

    fn pending(sender: &str, receivers: &[&str], body: &str) -> PendingMessage {
        PendingMessage::new(
            user(sender),
            receivers.iter().map(|r| user(r)).collect::<Vec<Username>>(),
            body.to_string(),
        )
    }

    #[tokio::test]
    async fn test_nothing_is_delivered_before_due_time() {
        // テスト項目: 配信時刻前のメッセージは配信されない
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = create_usecase(&fixture);
        let mut bob_inbox = fixture.connect("bob").await;
        fixture.scheduled.schedule(
            pending("alice", &[], "later"),
            fixture.clock.now() + TimeDelta::seconds(30),
        );

        // when (操作):
        let delivered = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(delivered, 0);
        assert!(bob_inbox.drain().is_empty());
        assert_eq!(fixture.repository.count().await, 0);
        assert_eq!(fixture.scheduled.len(), 1);
    }

    #[tokio::test]
    async fn test_due_message_is_delivered_once_including_sender() {
        // テスト項目: 期限を迎えたメッセージは送信者を含む全員に一度だけ届く
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = create_usecase(&fixture);
        let mut alice_inbox = fixture.connect("alice").await;
        let mut bob_inbox = fixture.connect("bob").await;
        fixture.scheduled.schedule(
            pending("alice", &[], "ding"),
            fixture.clock.now() + TimeDelta::seconds(30),
        );

        // when (操作):
        fixture.clock.advance(TimeDelta::seconds(30));
        let first = usecase.execute().await;
        let second = usecase.execute().await;

        // then (期待する結果):
        assert_eq!((first, second), (1, 0));
        assert_eq!(alice_inbox.kinds(), vec!["new_message"]);
        let received = bob_inbox.drain();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["data"]["body"], "ding");
        assert_eq!(received[0]["data"]["id"], 1);
        let history = fixture.repository.history_for(&user("bob")).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp, fixture.clock.now());
    }

    #[tokio::test]
    async fn test_scheduled_direct_message_reaches_receivers_and_sender() {
        // テスト項目: 宛先付き予約メッセージは宛先と送信者にだけ届く
        let fixture = Fixture::new();
        let usecase = create_usecase(&fixture);
        let mut alice_inbox = fixture.connect("alice").await;
        let mut bob_inbox = fixture.connect("bob").await;
        let mut carol_inbox = fixture.connect("carol").await;
        fixture
            .scheduled
            .schedule(pending("alice", &["bob"], "psst"), fixture.clock.now());

        usecase.execute().await;

        assert_eq!(alice_inbox.kinds(), vec!["new_message"]);
        assert_eq!(bob_inbox.kinds(), vec!["new_message"]);
        assert!(carol_inbox.drain().is_empty());
    }

    #[tokio::test]
    async fn test_due_messages_get_ids_in_submission_order() {
        // テスト項目: 同時に期限を迎えた予約は登録順に ID が振られる
        let fixture = Fixture::new();
        let usecase = create_usecase(&fixture);
        let now = fixture.clock.now();
        fixture
            .scheduled
            .schedule(pending("alice", &[], "first"), now + TimeDelta::seconds(2));
        fixture
            .scheduled
            .schedule(pending("bob", &[], "second"), now + TimeDelta::seconds(1));
        fixture.clock.advance(TimeDelta::seconds(5));

        usecase.execute().await;

        let history = fixture.repository.history_for(&user("carol")).await;
        let ordered: Vec<(u64, &str)> = history
            .iter()
            .map(|m| (m.id.value(), m.body.as_str()))
            .collect();
        assert_eq!(ordered, vec![(1, "first"), (2, "second")]);
    }

    #[tokio::test]
    async fn test_ids_increase_across_immediate_and_scheduled_messages() {
        // テスト項目: 即時送信と予約送信が混在しても ID は保存順に 1 から連番になる
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = create_usecase(&fixture);
        let send = crate::usecase::SendMessageUseCase::new(
            fixture.repository.clone(),
            fixture.scheduled.clone(),
            fixture.broadcaster.clone(),
        );
        let alice = user("alice");
        let later = (fixture.clock.now() + TimeDelta::seconds(10)).to_rfc3339();

        // when (操作):
        send.execute(Some(&alice), &serde_json::json!({"body": "now-1"}))
            .await
            .unwrap();
        send.execute(
            Some(&alice),
            &serde_json::json!({"body": "scheduled", "timestamp": later}),
        )
        .await
        .unwrap();
        send.execute(Some(&alice), &serde_json::json!({"body": "now-2"}))
            .await
            .unwrap();
        fixture.clock.advance(TimeDelta::seconds(10));
        let delivered = usecase.execute().await;
        send.execute(Some(&alice), &serde_json::json!({"body": "now-3"}))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(delivered, 1);
        let history = fixture.repository.history_for(&alice).await;
        let ordered: Vec<(u64, &str)> = history
            .iter()
            .map(|m| (m.id.value(), m.body.as_str()))
            .collect();
        assert_eq!(
            ordered,
            vec![(1, "now-1"), (2, "now-2"), (3, "scheduled"), (4, "now-3")]
        );
    }
}
