//! WebSocket client session management.

use futures_util::{SinkExt, Stream, StreamExt};
use kairo_server::infrastructure::dto::websocket::{
    ClientEnvelope, KIND_LOG_IN, KIND_SEND_MESSAGE, LOGIN_STATUS_OK, ServerEnvelope, ServerKind,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    command::{Command, parse_command},
    error::ClientError,
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

/// Run one WebSocket client session.
///
/// Logs in as `username`, then sends every line received on `input` until
/// the user quits (`Ok`) or the connection drops (`Err`).
pub async fn run_client_session(
    url: &str,
    username: &str,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    let (mut write, mut read) = ws_stream.split();

    let login = encode(KIND_LOG_IN, &username)?;
    write
        .send(Message::Text(login.into()))
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    await_login(&mut read, username).await?;

    tracing::info!("Logged in to {} as '{}'", url, username);
    println!(
        "\nYou are '{}'. Type messages and press Enter to send.\n\
         /to alice,bob <text> sends a direct message, \
         /at <RFC3339> <text> schedules one, /quit leaves.\n",
        username
    );

    let username_for_read = username.to_string();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let formatted = match serde_json::from_str::<ServerEnvelope>(&text) {
                        Ok(envelope) => {
                            MessageFormatter::format_envelope(&envelope, &username_for_read)
                        }
                        Err(_) => MessageFormatter::format_raw_message(&text),
                    };
                    print!("{}", formatted);
                    redisplay_prompt(&username_for_read);
                }
                Ok(Message::Binary(data)) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                    redisplay_prompt(&username_for_read);
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!("Server closed the connection: {:?}", frame);
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    redisplay_prompt(username);
    loop {
        tokio::select! {
            _ = &mut read_task => {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
            line = input.recv() => {
                let command = match line {
                    // the input thread ended (Ctrl+C / Ctrl+D)
                    None => Command::Quit,
                    Some(line) => match parse_command(&line) {
                        Ok(command) => command,
                        Err(e) => {
                            println!("{}", e);
                            redisplay_prompt(username);
                            continue;
                        }
                    },
                };

                let request = match command {
                    Command::Quit => {
                        if let Err(e) = write.send(Message::Close(None)).await {
                            tracing::debug!("Failed to send close frame: {}", e);
                        }
                        read_task.abort();
                        return Ok(());
                    }
                    Command::Send(request) => request,
                };

                let json = encode(KIND_SEND_MESSAGE, &request)?;
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    tracing::warn!("Failed to send message: {}", e);
                    read_task.abort();
                    return Err(ClientError::ConnectionError("Connection lost".to_string()));
                }
            }
        }
    }
}

/// Wait for the `login_status` reply.
///
/// Anything the server sends before it is printed as usual.
async fn await_login<S>(read: &mut S, username: &str) -> Result<(), ClientError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        let message = message.map_err(|e| ClientError::ConnectionError(e.to_string()))?;
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let Ok(envelope) = serde_json::from_str::<ServerEnvelope>(&text) else {
            print!("{}", MessageFormatter::format_raw_message(&text));
            continue;
        };
        match login_result(&envelope, username) {
            Some(result) => return result,
            None => print!("{}", MessageFormatter::format_envelope(&envelope, username)),
        }
    }

    Err(ClientError::ConnectionError(
        "Connection closed before login completed".to_string(),
    ))
}

/// Interpret a `login_status` envelope. `None` for any other kind.
pub fn login_result(envelope: &ServerEnvelope, username: &str) -> Option<Result<(), ClientError>> {
    if envelope.kind != ServerKind::LoginStatus {
        return None;
    }

    let status = envelope.data.as_str().unwrap_or_default();
    if status == LOGIN_STATUS_OK {
        Some(Ok(()))
    } else {
        Some(Err(ClientError::LoginRejected {
            username: username.to_string(),
            status: if status.is_empty() {
                envelope.data.to_string()
            } else {
                status.to_string()
            },
        }))
    }
}

fn encode<T: Serialize>(kind: &str, data: &T) -> Result<String, ClientError> {
    serde_json::to_string(&ClientEnvelope { kind, data })
        .map_err(|e| ClientError::ConnectionError(format!("Failed to serialize message: {}", e)))
}
