//! Client sessions against an in-process server.

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use kairo_client::{ClientError, session::run_client_session};
use kairo_server::{
    config::ServerConfig,
    ui::{AppState, Server},
};
use kairo_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const WAIT: Duration = Duration::from_secs(5);

type Observer = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a server on an ephemeral port. Dropping the sender shuts it down.
async fn start_server() -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        port: addr.port(),
        ..ServerConfig::default()
    };
    let server = Server::new(Arc::new(AppState::in_memory(Arc::new(SystemClock))), config);

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server.serve(listener, async move {
        let _ = rx.await;
    }));

    (format!("ws://{}", addr), tx)
}

/// Log in with a plain WebSocket client and consume the login replies.
async fn observer(url: &str, username: &str) -> Observer {
    let (mut ws, _) = connect_async(url).await.unwrap();
    let login = json!({"kind": "log_in", "data": username}).to_string();
    ws.send(Message::Text(login.into())).await.unwrap();
    for expected in ["login_status", "message_history", "users"] {
        assert_eq!(next_envelope(&mut ws).await["kind"], expected);
    }
    ws
}

async fn next_envelope(ws: &mut Observer) -> Value {
    loop {
        let message = timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Pre-typed input lines. Holding the sender keeps the prompt open.
fn scripted_input(
    lines: &[&str],
) -> (mpsc::UnboundedSender<String>, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    for line in lines {
        tx.send(line.to_string()).unwrap();
    }
    (tx, rx)
}

#[tokio::test]
async fn test_session_sends_messages_until_quit() {
    // テスト項目: 入力された行がメッセージとして送信され、/quit で正常終了する
    // given (前提条件):
    let (url, _shutdown) = start_server().await;
    let mut bob = observer(&url, "bob").await;
    let (_typing, mut input) = scripted_input(&["hello bob", "/to bob psst", "/quit"]);

    // when (操作):
    let result = timeout(WAIT, run_client_session(&url, "alice", &mut input))
        .await
        .unwrap();

    // then (期待する結果):
    assert!(result.is_ok());
    assert_eq!(
        next_envelope(&mut bob).await,
        json!({"kind": "user_logged_in", "data": "alice"})
    );

    let broadcast = next_envelope(&mut bob).await;
    assert_eq!(broadcast["kind"], "new_message");
    assert_eq!(broadcast["data"]["sender"], "alice");
    assert_eq!(broadcast["data"]["body"], "hello bob");

    let direct = next_envelope(&mut bob).await;
    assert_eq!(direct["kind"], "new_message");
    assert_eq!(direct["data"]["receivers"], json!(["bob"]));
    assert_eq!(direct["data"]["body"], "psst");

    assert_eq!(
        next_envelope(&mut bob).await,
        json!({"kind": "user_logged_out", "data": "alice"})
    );
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    // テスト項目: 使用中のユーザー名でのログインは LoginRejected になる
    // given (前提条件):
    let (url, _shutdown) = start_server().await;
    let _alice = observer(&url, "alice").await;
    let (_typing, mut input) = scripted_input(&[]);

    // when (操作):
    let result = timeout(WAIT, run_client_session(&url, "alice", &mut input))
        .await
        .unwrap();

    // then (期待する結果):
    match result {
        Err(ClientError::LoginRejected { username, status }) => {
            assert_eq!(username, "alice");
            assert_eq!(status, "already_logged_in");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_shutdown_is_a_connection_error() {
    // テスト項目: サーバーが停止するとセッションは ConnectionError で終わる
    // given (前提条件):
    let (url, shutdown) = start_server().await;
    let mut bob = observer(&url, "bob").await;
    let (_typing, mut input) = scripted_input(&[]);
    let alice_url = url.clone();
    let session = tokio::spawn(async move {
        run_client_session(&alice_url, "alice", &mut input).await
    });
    assert_eq!(
        next_envelope(&mut bob).await,
        json!({"kind": "user_logged_in", "data": "alice"})
    );

    // when (操作):
    shutdown.send(()).unwrap();

    // then (期待する結果):
    let result = timeout(WAIT, session).await.unwrap().unwrap();
    assert!(matches!(result, Err(ClientError::ConnectionError(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_a_connection_error() {
    // テスト項目: 接続できない場合は ConnectionError
    // given (前提条件):
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);
    let (_typing, mut input) = scripted_input(&[]);

    // when (操作):
    let result = run_client_session(&url, "alice", &mut input).await;

    // then (期待する結果):
    assert!(matches!(result, Err(ClientError::ConnectionError(_))));
}
