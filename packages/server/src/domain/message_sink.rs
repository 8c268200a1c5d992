//! MessageSink trait 定義
//!
//! オンラインのユーザーへテキストを届けるための抽象化です。
//! 具体的な実装（WebSocket 接続）は Infrastructure 層が提供します。

use async_trait::async_trait;

use super::MessageSinkError;

/// Outbound channel to one connected user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one serialized envelope as a single text message.
    async fn send_text(&self, text: &str) -> Result<(), MessageSinkError>;

    /// Close the underlying connection with a status code.
    async fn close(&self, code: u16, reason: &str);
}
