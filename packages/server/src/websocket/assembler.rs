//! Reassembly of fragmented data messages (RFC 6455 Section 5.4).

use super::{
    error::WsError,
    frame::{Frame, Opcode},
};

/// Kind of a complete application message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Binary,
}

/// A complete application message, possibly stitched from several frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

/// Outcome of feeding one data frame to the assembler.
#[derive(Debug, PartialEq, Eq)]
pub enum Assembled {
    /// More fragments are expected.
    Pending,
    /// The frame completed a message.
    Complete(Message),
    /// A continuation arrived with no message in progress. Nothing was kept.
    OrphanContinuation,
}

/// Per-connection fragmentation accumulator.
///
/// Holds the chunks of the in-progress message together with the opcode of
/// its first fragment. Valid only between a non-final frame and the final
/// frame of the same message; cleared on reassembly. The accumulated size
/// never exceeds `max_message_size`.
#[derive(Debug)]
pub struct MessageAssembler {
    chunks: Vec<Vec<u8>>,
    opcode: Option<Opcode>,
    buffered: usize,
    max_message_size: usize,
}

impl MessageAssembler {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            chunks: Vec::new(),
            opcode: None,
            buffered: 0,
            max_message_size,
        }
    }

    /// Whether a fragmented message is in progress.
    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    /// Feed one unmasked data frame (Text, Binary or Continuation).
    ///
    /// # Errors
    ///
    /// - [`WsError::InterleavedMessage`] when a Text or Binary frame starts
    ///   while another message is still in progress.
    /// - [`WsError::PayloadTooLarge`] when the reassembled message would
    ///   exceed the configured limit.
    ///
    /// Either error drops the partial message.
    pub fn push(&mut self, frame: Frame) -> Result<Assembled, WsError> {
        if frame.opcode == Opcode::Continuation {
            if self.opcode.is_none() {
                return Ok(Assembled::OrphanContinuation);
            }
        } else {
            if self.opcode.is_some() {
                self.reset();
                return Err(WsError::InterleavedMessage);
            }
            if frame.fin {
                return Ok(Assembled::Complete(Message {
                    kind: kind_of(frame.opcode),
                    payload: frame.payload,
                }));
            }
            self.opcode = Some(frame.opcode);
        }

        let size = self.buffered + frame.payload.len();
        if size > self.max_message_size {
            self.reset();
            return Err(WsError::PayloadTooLarge {
                size: size as u64,
                max: self.max_message_size,
            });
        }
        self.buffered = size;
        self.chunks.push(frame.payload);

        if !frame.fin {
            return Ok(Assembled::Pending);
        }

        let kind = kind_of(self.opcode.unwrap_or(Opcode::Text));
        let mut payload = Vec::with_capacity(self.buffered);
        for chunk in self.chunks.drain(..) {
            payload.extend_from_slice(&chunk);
        }
        self.reset();
        Ok(Assembled::Complete(Message { kind, payload }))
    }

    fn reset(&mut self) {
        self.chunks.clear();
        self.opcode = None;
        self.buffered = 0;
    }
}

fn kind_of(opcode: Opcode) -> MessageKind {
    match opcode {
        Opcode::Binary => MessageKind::Binary,
        _ => MessageKind::Text,
    }
}
