//! WebSocket を使った MessageSink 実装
//!
//! ## 責務
//!
//! - ドメイン層の `MessageSink` を `WsConnection` の書き込み側に結び付ける
//! - プロトコル層のエラーを `MessageSinkError` に変換する
//!
//! 接続の生成（ハンドシェイク）は UI 層で行われます。
//! この実装は生成済みの接続ハンドルを受け取り、送信に使用します。

use async_trait::async_trait;

use crate::{
    domain::{MessageSink, MessageSinkError},
    websocket::{WsConnection, WsError},
};

#[async_trait]
impl MessageSink for WsConnection {
    async fn send_text(&self, text: &str) -> Result<(), MessageSinkError> {
        WsConnection::send_text(self, text)
            .await
            .map_err(|e| match e {
                WsError::ConnectionClosed => MessageSinkError::Disconnected,
                other => MessageSinkError::PushFailed(other.to_string()),
            })
    }

    async fn close(&self, code: u16, reason: &str) {
        if let Err(e) = WsConnection::close(self, code, reason).await {
            tracing::debug!("Failed to close connection {}: {}", self.id(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, sync::Arc};

    use super::*;
    use crate::websocket::{
        CLOSE_GOING_AWAY, ConnectionConfig, DEFAULT_MAX_PAYLOAD_SIZE, Opcode, connection,
        read_frame,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - MessageSink 経由の送信が Text フレームとして相手に届くこと
    // - クローズ後の送信が Disconnected になること
    //
    // 【なぜこのテストが必要か】
    // - ブロードキャストは dyn MessageSink しか知らない
    // - 切断済みの宛先を区別できないと警告ログが誤解を招く
    // ========================================

    fn create_test_sink() -> (Arc<dyn MessageSink>, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let (connection, _events) =
            connection::spawn(server_read, server_write, addr, ConnectionConfig::default());
        (Arc::new(connection), client)
    }

    #[tokio::test]
    async fn test_send_text_through_sink() {
        // テスト項目: MessageSink::send_text が Text フレームとして届く
        // given (前提条件):
        let (sink, mut client) = create_test_sink();

        // when (操作):
        sink.send_text(r#"{"kind":"status","data":"hi"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        let frame = read_frame(&mut client, DEFAULT_MAX_PAYLOAD_SIZE)
            .await
            .unwrap();
        assert_eq!(frame.opcode, Opcode::Text);
        assert_eq!(frame.payload, br#"{"kind":"status","data":"hi"}"#);
    }

    #[tokio::test]
    async fn test_send_after_close_is_disconnected() {
        // テスト項目: クローズ後の送信は Disconnected エラーになる
        // given (前提条件):
        let (sink, mut client) = create_test_sink();
        sink.close(CLOSE_GOING_AWAY, "server shutting down").await;

        // when (操作):
        let result = sink.send_text("late").await;

        // then (期待する結果):
        assert_eq!(result, Err(MessageSinkError::Disconnected));
        let frame = read_frame(&mut client, DEFAULT_MAX_PAYLOAD_SIZE)
            .await
            .unwrap();
        assert_eq!(
            frame.close_code(),
            Some((CLOSE_GOING_AWAY, "server shutting down".to_string()))
        );
    }
}
