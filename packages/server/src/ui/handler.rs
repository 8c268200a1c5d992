//! Per-connection handler: handshake, chat protocol dispatch, cleanup.

use std::{net::SocketAddr, sync::Arc};

use serde::Serialize;
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::{
    domain::{MessageSink, Username},
    infrastructure::dto::websocket::{
        ChatMessageDto, InboundEnvelope, KIND_LOG_IN, KIND_SEND_MESSAGE, LOGIN_STATUS_OK,
        SendSuccessDto, ServerKind, UserPresenceDto, encode_envelope,
    },
    ui::state::AppState,
    usecase::SendOutcome,
    websocket::{
        CLOSE_NORMAL, ConnectionConfig, ConnectionEvent, Message, MessageKind, WriteGuard,
        WsConnection, upgrade,
    },
};

/// Serve one accepted TCP stream until its WebSocket connection ends.
///
/// Everything logged for this connection, including its read worker, runs
/// inside a `connection` span.
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    config: ConnectionConfig,
) {
    let span = tracing::info_span!(
        "connection",
        id = tracing::field::Empty,
        peer = %peer_addr
    );

    async move {
        let (connection, mut events) = match upgrade(stream, config).await {
            Ok(upgraded) => upgraded,
            Err(e) => {
                tracing::warn!("Handshake failed: {}", e);
                return;
            }
        };
        tracing::Span::current().record("id", tracing::field::display(connection.id()));
        tracing::info!("WebSocket connection established");

        let mut session = ClientSession::new(connection, state);
        while let Some(event) = events.recv().await {
            match event {
                ConnectionEvent::Message(message) => session.on_message(message).await,
                ConnectionEvent::Closed => break,
            }
        }
        session.finish().await;
    }
    .instrument(span)
    .await
}

/// Chat-level state of one connection.
struct ClientSession {
    connection: WsConnection,
    state: Arc<AppState>,
    /// Set once `log_in` succeeds.
    username: Option<Username>,
}

impl ClientSession {
    fn new(connection: WsConnection, state: Arc<AppState>) -> Self {
        Self {
            connection,
            state,
            username: None,
        }
    }

    async fn on_message(&mut self, message: Message) {
        if message.kind == MessageKind::Binary {
            tracing::warn!("Ignoring binary message ({} bytes)", message.payload.len());
            self.reply(ServerKind::Status, &"binary messages are not supported")
                .await;
            return;
        }

        let envelope = match serde_json::from_slice::<InboundEnvelope>(&message.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Failed to parse envelope: {}", e);
                self.reply(ServerKind::Status, &format!("malformed message: {}", e))
                    .await;
                return;
            }
        };

        match envelope.kind.as_str() {
            KIND_LOG_IN => self.on_log_in(&envelope.data).await,
            KIND_SEND_MESSAGE => self.on_send_message(&envelope.data).await,
            other => {
                tracing::warn!("Unknown message kind '{}'", other);
                self.reply(ServerKind::Status, &format!("unknown kind '{}'", other))
                    .await;
            }
        }
    }

    /// The login replies are written while this connection's writes are
    /// locked, so nothing broadcast to the new session can overtake them.
    async fn on_log_in(&mut self, data: &serde_json::Value) {
        let sink: Arc<dyn MessageSink> = Arc::new(self.connection.clone());
        let mut writes = self.connection.lock_writes().await;
        let outcome = self
            .state
            .login_usecase
            .execute(self.username.as_ref(), data, sink)
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::info!("Login refused: {}", e);
                write_reply(&mut writes, ServerKind::LoginStatus, &e.as_status()).await;
                return;
            }
        };

        write_reply(&mut writes, ServerKind::LoginStatus, &LOGIN_STATUS_OK).await;
        let history: Vec<ChatMessageDto> = outcome.history.into_iter().map(Into::into).collect();
        write_reply(&mut writes, ServerKind::MessageHistory, &history).await;
        let users: Vec<UserPresenceDto> = outcome.users.into_iter().map(Into::into).collect();
        write_reply(&mut writes, ServerKind::Users, &users).await;
        drop(writes);

        self.state.login_usecase.announce(&outcome.username).await;
        self.username = Some(outcome.username);
    }

    async fn on_send_message(&mut self, data: &serde_json::Value) {
        let outcome = self
            .state
            .send_message_usecase
            .execute(self.username.as_ref(), data)
            .await;

        match outcome {
            Ok(SendOutcome::Sent(message)) => {
                self.reply(ServerKind::SendSuccess, &SendSuccessDto::from(&message))
                    .await;
            }
            Ok(SendOutcome::Scheduled(_)) => {
                self.reply(ServerKind::ScheduleSuccess, &"").await;
            }
            Err(e) => {
                tracing::info!("Message refused: {}", e);
                self.reply(ServerKind::SendFail, &e.to_string()).await;
            }
        }
    }

    /// Send an envelope to this connection only.
    async fn reply<T: Serialize>(&self, kind: ServerKind, data: &T) {
        let Some(text) = encode_reply(kind, data) else {
            return;
        };
        if let Err(e) = self.connection.send_text(&text).await {
            tracing::warn!("Failed to send {:?} reply: {}", kind, e);
        }
    }

    /// Log out (if logged in) and release the connection.
    async fn finish(mut self) {
        if let Some(username) = self.username.take() {
            self.state.logout_usecase.execute(&username).await;
        }
        if let Err(e) = self.connection.close(CLOSE_NORMAL, "").await {
            tracing::debug!("Failed to close connection: {}", e);
        }
        tracing::info!("Connection handler finished");
    }
}

fn encode_reply<T: Serialize>(kind: ServerKind, data: &T) -> Option<String> {
    match encode_envelope(kind, data) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!("Failed to serialize {:?} reply: {}", kind, e);
            None
        }
    }
}

/// [`ClientSession::reply`] through an already locked write half.
async fn write_reply<T: Serialize>(writes: &mut WriteGuard<'_>, kind: ServerKind, data: &T) {
    let Some(text) = encode_reply(kind, data) else {
        return;
    };
    if let Err(e) = writes.send_text(&text).await {
        tracing::warn!("Failed to send {:?} reply: {}", kind, e);
    }
}
