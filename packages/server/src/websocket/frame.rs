//! WebSocket frame codec according to RFC 6455 Section 5.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```
//!
//! Only one frame is handled at a time; message reassembly lives in
//! [`super::assembler`].

use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::WsError;

/// Default maximum payload size accepted from a peer (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Largest payload that fits the 7-bit length field.
const MAX_SHORT_LENGTH: usize = 125;
/// Largest payload that fits the 16-bit extended length.
const MAX_MEDIUM_LENGTH: usize = 65535;

const FIN_BIT: u8 = 0x80;
const MASK_BIT: u8 = 0x80;
const OPCODE_MASK: u8 = 0x0F;
const LENGTH_MASK: u8 = 0x7F;

/// WebSocket frame opcode (4 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Continuation of a fragmented message.
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    /// Try to parse an opcode from the low 4 bits of the first header byte.
    pub fn from_u8(value: u8) -> Result<Self, WsError> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            _ => Err(WsError::InvalidOpcode(value)),
        }
    }

    /// Returns true for Close, Ping and Pong.
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// A single WebSocket frame.
///
/// A frame is masked iff `mask` holds a key; a masked frame's payload holds
/// the masked bytes until [`Frame::unmask`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag (FIN bit).
    pub fin: bool,
    pub opcode: Opcode,
    /// Masking key, present iff the MASK bit is set.
    pub mask: Option<[u8; 4]>,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create an unmasked frame.
    pub fn new(fin: bool, opcode: Opcode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            fin,
            opcode,
            mask: None,
            payload: payload.into(),
        }
    }

    /// Final text frame.
    pub fn text(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(true, Opcode::Text, payload)
    }

    /// Final binary frame.
    pub fn binary(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(true, Opcode::Binary, payload)
    }

    pub fn ping(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(true, Opcode::Ping, payload)
    }

    pub fn pong(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(true, Opcode::Pong, payload)
    }

    /// Close frame carrying a status code and a UTF-8 reason.
    pub fn close(code: u16, reason: &str) -> Self {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        Self::new(true, Opcode::Close, payload)
    }

    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Mask the payload with `key`. A frame that is already masked is returned untouched.
    pub fn masked(mut self, key: [u8; 4]) -> Self {
        if self.mask.is_none() {
            apply_mask(&mut self.payload, &key);
            self.mask = Some(key);
        }
        self
    }

    /// Remove the mask from the payload.
    ///
    /// Masked once, unmasked once: the key is consumed, so a second call (or a
    /// call on a frame that never had a mask) leaves the payload as it is.
    pub fn unmask(&mut self) {
        if let Some(key) = self.mask.take() {
            apply_mask(&mut self.payload, &key);
        }
    }

    /// Status code and reason of a Close frame, when the payload carries one.
    pub fn close_code(&self) -> Option<(u16, String)> {
        if self.opcode != Opcode::Close || self.payload.len() < 2 {
            return None;
        }
        let code = u16::from_be_bytes([self.payload[0], self.payload[1]]);
        let reason = String::from_utf8_lossy(&self.payload[2..]).into_owned();
        Some((code, reason))
    }

    /// Serialize the frame to its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let payload_len = self.payload.len();
        let extended = extended_length_size(payload_len);
        let key_len = if self.mask.is_some() { 4 } else { 0 };
        let mut out = Vec::with_capacity(2 + extended + key_len + payload_len);

        let mut first = self.opcode as u8;
        if self.fin {
            first |= FIN_BIT;
        }
        out.push(first);

        let mask_bit = if self.mask.is_some() { MASK_BIT } else { 0 };
        match extended {
            0 => out.push(mask_bit | payload_len as u8),
            2 => {
                out.push(mask_bit | 126);
                out.extend_from_slice(&(payload_len as u16).to_be_bytes());
            }
            _ => {
                out.push(mask_bit | 127);
                out.extend_from_slice(&(payload_len as u64).to_be_bytes());
            }
        }

        if let Some(key) = self.mask {
            out.extend_from_slice(&key);
        }
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Number of extended payload length bytes (0, 2 or 8) used for `payload_len`.
pub fn extended_length_size(payload_len: usize) -> usize {
    if payload_len > MAX_MEDIUM_LENGTH {
        8
    } else if payload_len > MAX_SHORT_LENGTH {
        2
    } else {
        0
    }
}

/// XOR `payload` in place with the 4-byte masking key (RFC 6455 Section 5.3).
///
/// The operation is its own inverse.
pub fn apply_mask(payload: &mut [u8], key: &[u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Read exactly one frame from `reader`.
///
/// The payload is returned as received; masked frames still need
/// [`Frame::unmask`]. Fails with [`WsError::Io`] if the stream ends before a
/// full frame is available. RSV bits are ignored.
pub async fn read_frame<R>(reader: &mut R, max_payload: usize) -> Result<Frame, WsError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    reader.read_exact(&mut header).await?;

    let fin = header[0] & FIN_BIT != 0;
    let opcode = Opcode::from_u8(header[0] & OPCODE_MASK)?;
    let masked = header[1] & MASK_BIT != 0;

    let payload_len = match header[1] & LENGTH_MASK {
        126 => u64::from(reader.read_u16().await?),
        127 => reader.read_u64().await?,
        short => u64::from(short),
    };

    if payload_len > max_payload as u64 {
        return Err(WsError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let mask = if masked {
        let mut key = [0u8; 4];
        reader.read_exact(&mut key).await?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload).await?;

    Ok(Frame {
        fin,
        opcode,
        mask,
        payload,
    })
}
