//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{ChatMessage, PendingMessage, Username};

/// Append-only chat history.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Assign the next id and the current time, then append.
    async fn persist(&self, message: PendingMessage) -> ChatMessage;

    /// Every message visible to `username`, in persistence order.
    async fn history_for(&self, username: &Username) -> Vec<ChatMessage>;

    /// Number of persisted messages.
    async fn count(&self) -> usize;
}
