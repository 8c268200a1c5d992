//! InMemory Message Repository 実装
//!
//! ドメイン層が定義する MessageRepository trait の具体的な実装。
//! `Vec` をインメモリ DB として使用し、追記のみを行います。

use std::sync::Arc;

use async_trait::async_trait;
use kairo_shared::time::Clock;
use tokio::sync::RwLock;

use crate::domain::{ChatMessage, MessageId, MessageRepository, PendingMessage, Username};

/// インメモリ Message Repository 実装
///
/// ID の採番と追記は同じ書き込みロックの中で行うため、ID は常に連番で増加します。
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<ChatMessage>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            clock,
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn persist(&self, message: PendingMessage) -> ChatMessage {
        let mut messages = self.messages.write().await;
        let id = MessageId::new(messages.len() as u64 + 1);
        let persisted = ChatMessage::from_pending(message, id, self.clock.now());
        messages.push(persisted.clone());
        tracing::debug!("Persisted message {} from '{}'", id, persisted.sender);
        persisted
    }

    async fn history_for(&self, username: &Username) -> Vec<ChatMessage> {
        let messages = self.messages.read().await;
        messages
            .iter()
            .filter(|m| m.is_visible_to(username))
            .cloned()
            .collect()
    }

    async fn count(&self) -> usize {
        self.messages.read().await.len()
    }
}
