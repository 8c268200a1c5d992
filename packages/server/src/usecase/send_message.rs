//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - ペイロード検証、即時送信（保存とブロードキャスト）、予約送信
//!
//! ### なぜこのテストが必要か
//! - 失敗理由の文字列はクライアントにそのまま返るため、正確である必要がある
//! - 宛先指定のメッセージが宛先以外に漏れないことを保証
//! - 予約メッセージが配信時刻まで履歴に現れないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：全体宛て、個別宛て、予約
//! - 異常系：未ログイン、data がオブジェクトでない、body が無い、宛先が不正
//! - エッジケース：解釈できないタイムスタンプは即時送信

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kairo_shared::time::parse_rfc3339;
use serde_json::{Map, Value};

use crate::{
    domain::{ChatMessage, MessageRepository, PendingMessage, ScheduleId, Username},
    infrastructure::{Broadcaster, ScheduledMessages},
};

use super::{delivery::persist_and_broadcast, error::SendMessageError};

/// What happened to an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Persisted and broadcast now.
    Sent(ChatMessage),
    /// Held in the scheduled set until its delivery time.
    Scheduled(ScheduleId),
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    repository: Arc<dyn MessageRepository>,
    scheduled: Arc<ScheduledMessages>,
    broadcaster: Broadcaster,
}

impl SendMessageUseCase {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        scheduled: Arc<ScheduledMessages>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            repository,
            scheduled,
            broadcaster,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - この接続でログインしているユーザー名
    /// * `data` - `send_message` の生ペイロード
    pub async fn execute(
        &self,
        sender: Option<&Username>,
        data: &Value,
    ) -> Result<SendOutcome, SendMessageError> {
        let sender = sender.ok_or(SendMessageError::NotLoggedIn)?;
        let fields = data.as_object().ok_or(SendMessageError::NotAMap)?;

        let body = fields
            .get("body")
            .and_then(Value::as_str)
            .ok_or(SendMessageError::InvalidPayload)?;
        let receivers = parse_receivers(fields)?;
        let message = PendingMessage::new(sender.clone(), receivers, body.to_string());

        if let Some(deliver_at) = parse_delivery_time(fields) {
            let id = self.scheduled.schedule(message, deliver_at);
            tracing::info!(
                "'{}' scheduled message {} for {}",
                sender,
                id.value(),
                deliver_at.to_rfc3339()
            );
            return Ok(SendOutcome::Scheduled(id));
        }

        let (persisted, broadcast) =
            persist_and_broadcast(self.repository.as_ref(), &self.broadcaster, message, false)
                .await;
        match broadcast {
            Ok(delivered) => tracing::debug!(
                "Message {} from '{}' delivered to {} session(s)",
                persisted.id,
                sender,
                delivered
            ),
            Err(e) => tracing::error!("Failed to broadcast message {}: {}", persisted.id, e),
        }
        Ok(SendOutcome::Sent(persisted))
    }
}

/// Absent or null means everyone. Anything but an array of valid usernames
/// is rejected. Duplicates are dropped.
fn parse_receivers(fields: &Map<String, Value>) -> Result<Vec<Username>, SendMessageError> {
    let items = match fields.get("receivers") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(SendMessageError::InvalidReceivers),
    };

    let mut receivers: Vec<Username> = Vec::with_capacity(items.len());
    for item in items {
        let username = item
            .as_str()
            .and_then(|raw| Username::parse(raw).ok())
            .ok_or(SendMessageError::InvalidReceivers)?;
        if !receivers.contains(&username) {
            receivers.push(username);
        }
    }
    Ok(receivers)
}

/// A present, valid RFC 3339 `timestamp` schedules the message. Anything
/// else sends it now.
fn parse_delivery_time(fields: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let raw = fields.get("timestamp")?;
    match raw.as_str().and_then(parse_rfc3339) {
        Some(at) => Some(at),
        None => {
            tracing::debug!("Ignoring unusable timestamp {}, sending now", raw);
            None
        }
    }
}
