//! WebSocket opening handshake, server side (RFC 6455 Section 4.2).
//!
//! ```http
//! GET /chat HTTP/1.1
//! Host: server.example.com
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==
//! ```
//!
//! is answered with
//!
//! ```http
//! HTTP/1.1 101 Switching Protocols
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=
//! ```

use std::collections::HashMap;

use base64::Engine;
use sha1::{Digest, Sha1};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::mpsc,
};

use super::{
    connection::{self, ConnectionConfig, ConnectionEvent, WsConnection},
    error::HandshakeError,
};

/// RFC 6455 GUID for Sec-WebSocket-Accept calculation.
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Upper bound on the request line plus headers.
pub const MAX_REQUEST_HEAD_SIZE: usize = 16 * 1024;

const REQUIRED_HEADERS: [&str; 3] = ["upgrade", "connection", "sec-websocket-key"];

/// Compute the Sec-WebSocket-Accept value from a client key.
///
/// base64(SHA-1(key ‖ GUID))
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Minimal HTTP request head needed for the upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub target: String,
    /// Header map with lower-cased names and trimmed values.
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Check the required upgrade headers and derive the accept key.
    pub fn accept_key(&self) -> Result<String, HandshakeError> {
        for name in REQUIRED_HEADERS {
            if !self.headers.contains_key(name) {
                return Err(HandshakeError::MissingHeader(name));
            }
        }
        let client_key = self.header("sec-websocket-key").unwrap_or_default();
        Ok(compute_accept_key(client_key))
    }
}

/// Read one CRLF-terminated line, without the terminator.
///
/// A bare LF does not end the line. `budget` is the number of bytes the
/// whole request head may still consume.
async fn read_line<R>(reader: &mut R, budget: &mut usize) -> Result<String, HandshakeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        let mut limited = (&mut *reader).take(*budget as u64);
        let read = limited.read_until(b'\n', &mut line).await?;
        *budget -= read;
        if read == 0 {
            return Err(if *budget == 0 {
                HandshakeError::RequestHeadTooLarge(MAX_REQUEST_HEAD_SIZE)
            } else {
                HandshakeError::UnexpectedEof
            });
        }
        if line.ends_with(b"\r\n") {
            line.truncate(line.len() - 2);
            return Ok(String::from_utf8_lossy(&line).into_owned());
        }
    }
}

/// Parse the request line and headers up to the blank line.
///
/// Non-GET requests are refused as soon as the request line is read.
pub async fn read_request<R>(reader: &mut R) -> Result<HttpRequest, HandshakeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = MAX_REQUEST_HEAD_SIZE;

    let request_line = read_line(reader, &mut budget).await?;
    if request_line.len() < 6 {
        return Err(HandshakeError::RequestLineTooShort);
    }
    let (method, rest) = request_line
        .split_once(' ')
        .ok_or(HandshakeError::InvalidRequestLine)?;
    if method != "GET" {
        return Err(HandshakeError::MethodNotAllowed(method.to_string()));
    }
    let target = rest.split(' ').next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let line = read_line(reader, &mut budget).await?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HandshakeError::InvalidHeader(line.clone()))?;
        headers.insert(name.to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(HttpRequest {
        method: method.to_string(),
        target,
        headers,
    })
}

/// `101 Switching Protocols` response for a computed accept key.
pub fn switching_protocols_response(accept_key: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept_key}\r\n\
         \r\n"
    )
}

/// Rejection response written before releasing the socket, if the error warrants one.
pub fn rejection_response(error: &HandshakeError) -> Option<&'static str> {
    match error {
        HandshakeError::MethodNotAllowed(_) => Some(
            "HTTP/1.1 405 Method Not Allowed\r\n\
             Allow: GET\r\n\
             Connection: close\r\n\
             \r\n",
        ),
        HandshakeError::RequestLineTooShort
        | HandshakeError::InvalidRequestLine
        | HandshakeError::InvalidHeader(_)
        | HandshakeError::MissingHeader(_)
        | HandshakeError::RequestHeadTooLarge(_) => Some(
            "HTTP/1.1 400 Bad Request\r\n\
             Connection: close\r\n\
             \r\n",
        ),
        HandshakeError::Io(_) | HandshakeError::UnexpectedEof => None,
    }
}

/// Upgrade an accepted TCP stream to a WebSocket connection.
///
/// On success the read worker is already running; its events arrive on the
/// returned receiver. On failure a rejection response is written when
/// appropriate and the socket is dropped.
pub async fn upgrade(
    stream: TcpStream,
    config: ConnectionConfig,
) -> Result<(WsConnection, mpsc::Receiver<ConnectionEvent>), HandshakeError> {
    let peer_addr = stream.peer_addr()?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let accepted = match read_request(&mut reader).await {
        Ok(request) => request.accept_key().map(|key| (request, key)),
        Err(e) => Err(e),
    };

    let (request, accept_key) = match accepted {
        Ok(accepted) => accepted,
        Err(e) => {
            if let Some(response) = rejection_response(&e) {
                // best effort: the handshake error is what gets reported
                if let Err(write_err) = write_half.write_all(response.as_bytes()).await {
                    tracing::debug!("Failed to write rejection to {}: {}", peer_addr, write_err);
                }
                let _ = write_half.shutdown().await;
            }
            return Err(e);
        }
    };

    write_half
        .write_all(switching_protocols_response(&accept_key).as_bytes())
        .await?;
    write_half.flush().await?;
    tracing::debug!("Upgraded {} (target '{}')", peer_addr, request.target);

    Ok(connection::spawn(reader, write_half, peer_addr, config))
}
