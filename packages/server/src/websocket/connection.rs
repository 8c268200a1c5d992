//! A live WebSocket connection: serialized write side plus a read worker.
//!
//! The read worker owns the read half. It decodes frames, reassembles
//! fragmented messages, answers Ping and Close, and forwards complete
//! messages to the connection's owner as [`ConnectionEvent`]s. When the
//! worker ends its event queue closes, which wakes up any pending `recv`.

use std::{
    fmt,
    io,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    sync::{Mutex, MutexGuard, mpsc},
};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    assembler::{Assembled, Message, MessageAssembler},
    error::WsError,
    frame::{DEFAULT_MAX_PAYLOAD_SIZE, Frame, Opcode, read_frame},
};

/// Control frame payloads are limited to 125 bytes; 2 go to the status code.
const MAX_CLOSE_REASON_LEN: usize = 123;

/// Tunables for a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Largest frame payload accepted from the peer.
    pub max_payload_size: usize,
    /// Capacity of the event queue between the read worker and its owner.
    pub event_buffer: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            event_buffer: 64,
        }
    }
}

/// What the read worker reports to the connection's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A complete Text or Binary message.
    Message(Message),
    /// The connection is gone. Sent at most once.
    Closed,
}

/// Lifecycle of a connection. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Open = 0,
    Closing = 1,
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct Shared {
    id: Uuid,
    peer_addr: SocketAddr,
    writer: Mutex<BoxedWriter>,
    state: AtomicU8,
}

/// Cheaply cloneable handle to a live connection.
///
/// Every outbound frame goes through one mutex, so concurrent senders never
/// interleave bytes on the wire.
#[derive(Clone)]
pub struct WsConnection {
    shared: Arc<Shared>,
}

impl fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsConnection")
            .field("id", &self.shared.id)
            .field("peer_addr", &self.shared.peer_addr)
            .field("state", &self.state())
            .finish()
    }
}

impl WsConnection {
    fn new<W>(writer: W, peer_addr: SocketAddr) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                peer_addr,
                writer: Mutex::new(Box::new(writer)),
                state: AtomicU8::new(ConnectionState::Open as u8),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.shared.peer_addr
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.state() != ConnectionState::Open
    }

    /// Send a single final Text frame.
    pub async fn send_text(&self, text: &str) -> Result<(), WsError> {
        self.send_frame(&Frame::text(text)).await
    }

    /// Send an arbitrary frame while the connection is open.
    pub async fn send_frame(&self, frame: &Frame) -> Result<(), WsError> {
        if self.is_closed() {
            return Err(WsError::ConnectionClosed);
        }
        self.write_frame(frame).await
    }

    /// Take the write half for a run of frames that must reach the peer
    /// before anything else sent through this connection.
    ///
    /// Every other sender waits until the guard is dropped. Do not await on
    /// another connection's writes while holding it.
    pub async fn lock_writes(&self) -> WriteGuard<'_> {
        WriteGuard {
            connection: self,
            writer: self.shared.writer.lock().await,
        }
    }

    /// Locally initiated close.
    ///
    /// Only the first close (local or peer) writes a Close frame; later calls
    /// return immediately.
    pub async fn close(&self, code: u16, reason: &str) -> Result<(), WsError> {
        if !self.begin_close() {
            return Ok(());
        }
        let result = self
            .write_frame(&Frame::close(code, truncate_reason(reason)))
            .await;
        self.finish_close().await;
        result
    }

    /// Open → Closing. Returns false if a close already started.
    fn begin_close(&self) -> bool {
        self.shared
            .state
            .compare_exchange(
                ConnectionState::Open as u8,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Closing → Closed, then release the write half.
    async fn finish_close(&self) {
        self.shared
            .state
            .store(ConnectionState::Closed as u8, Ordering::Release);
        let mut writer = self.shared.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!("Failed to shut down write half: {}", e);
        }
    }

    async fn write_frame(&self, frame: &Frame) -> Result<(), WsError> {
        let bytes = frame.encode();
        let mut writer = self.shared.writer.lock().await;
        write_fully(&mut *writer, &bytes).await
    }
}

/// Exclusive access to a connection's write half, from [`WsConnection::lock_writes`].
pub struct WriteGuard<'a> {
    connection: &'a WsConnection,
    writer: MutexGuard<'a, BoxedWriter>,
}

impl WriteGuard<'_> {
    /// Send a single final Text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<(), WsError> {
        if self.connection.is_closed() {
            return Err(WsError::ConnectionClosed);
        }
        write_fully(&mut **self.writer, &Frame::text(text).encode()).await
    }
}

/// Write every byte of `buf`, re-issuing the unwritten suffix after short writes.
///
/// A write error, or a write that accepts zero bytes, aborts the write.
pub async fn write_fully<W>(writer: &mut W, mut buf: &[u8]) -> Result<(), WsError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    while !buf.is_empty() {
        let written = writer.write(buf).await?;
        if written == 0 {
            return Err(WsError::Io(io::Error::from(io::ErrorKind::WriteZero)));
        }
        buf = &buf[written..];
    }
    writer.flush().await?;
    Ok(())
}

fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON_LEN {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON_LEN;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

/// Wrap the two halves of an upgraded stream and start the read worker.
///
/// The worker runs in the caller's current tracing span.
pub fn spawn<R, W>(
    reader: R,
    writer: W,
    peer_addr: SocketAddr,
    config: ConnectionConfig,
) -> (WsConnection, mpsc::Receiver<ConnectionEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let connection = WsConnection::new(writer, peer_addr);
    let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));

    tokio::spawn(
        read_worker(reader, connection.clone(), events_tx, config.max_payload_size)
            .in_current_span(),
    );

    (connection, events_rx)
}

async fn read_worker<R>(
    mut reader: R,
    connection: WsConnection,
    events: mpsc::Sender<ConnectionEvent>,
    max_payload: usize,
) where
    R: AsyncRead + Unpin,
{
    let mut assembler = MessageAssembler::new(max_payload);

    loop {
        let mut frame = match read_frame(&mut reader, max_payload).await {
            Ok(frame) => frame,
            Err(e) => {
                on_read_error(&connection, &e).await;
                let _ = events.send(ConnectionEvent::Closed).await;
                return;
            }
        };
        frame.unmask();

        match frame.opcode {
            Opcode::Text | Opcode::Binary | Opcode::Continuation => {
                let assembled = match assembler.push(frame) {
                    Ok(assembled) => assembled,
                    Err(e) => {
                        on_read_error(&connection, &e).await;
                        let _ = events.send(ConnectionEvent::Closed).await;
                        return;
                    }
                };
                match assembled {
                    Assembled::Pending => {}
                    Assembled::Complete(message) => {
                        tracing::debug!(
                            "Received {:?} message ({} bytes)",
                            message.kind,
                            message.payload.len()
                        );
                        if events.send(ConnectionEvent::Message(message)).await.is_err() {
                            tracing::debug!("Connection owner is gone, stopping read worker");
                            return;
                        }
                    }
                    Assembled::OrphanContinuation => {
                        tracing::warn!("Discarding continuation frame with no message in progress");
                    }
                }
            }
            Opcode::Ping => {
                if connection.is_closed() {
                    continue;
                }
                if let Err(e) = connection.write_frame(&Frame::pong(frame.payload)).await {
                    tracing::warn!("Failed to answer ping: {}", e);
                }
            }
            Opcode::Pong => {
                tracing::debug!("Received pong ({} bytes)", frame.payload.len());
            }
            Opcode::Close => {
                match frame.close_code() {
                    Some((code, reason)) => {
                        tracing::info!("Received Close frame: {} {}", code, reason)
                    }
                    None => tracing::info!("Received Close frame without status"),
                }

                if connection.begin_close() {
                    let echo = Frame::new(true, Opcode::Close, frame.payload);
                    if let Err(e) = connection.write_frame(&echo).await {
                        tracing::debug!("Failed to echo Close frame: {}", e);
                    }
                    connection.finish_close().await;
                    let _ = events.send(ConnectionEvent::Closed).await;
                } else {
                    tracing::debug!("Close already in progress, discarding peer Close frame");
                }
                tracing::info!("Connection closed");
                return;
            }
        }
    }
}

async fn on_read_error(connection: &WsConnection, error: &WsError) {
    match error {
        WsError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            tracing::info!("Peer went away without a Close frame");
        }
        _ => tracing::warn!("Error reading frame: {}", error),
    }

    if let Some(code) = error.close_code() {
        if let Err(e) = connection.close(code, &error.to_string()).await {
            tracing::debug!("Failed to send Close frame: {}", e);
        }
    } else if connection.begin_close() {
        connection.finish_close().await;
    }
}
