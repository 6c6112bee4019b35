//! Newline-delimited framing for stream transports
//!
//! Over a raw byte stream every JSON message is framed as:
//! ```text
//! [ N bytes: UTF-8 JSON ][ '\n' ]
//! ```
//!
//! Message-oriented transports (WebSocket) do not need this.

use bytes::{Bytes, BytesMut};

use crate::codec::CodecError;

/// Maximum frame size (64 KiB), excluding the terminator
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Encode a text message into a newline-terminated frame
pub fn encode_line(text: &str) -> Result<Bytes, CodecError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge(text.len()));
    }

    let mut buf = BytesMut::with_capacity(text.len() + 1);
    buf.extend_from_slice(text.as_bytes());
    buf.extend_from_slice(b"\n");

    Ok(buf.freeze())
}

/// Decoder state machine for streaming decoding
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Partial frame data being accumulated
    buffer: BytesMut,
}

impl LineDecoder {
    /// Create a new line decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame from the buffer
    ///
    /// Blank lines are skipped. Call this repeatedly until it returns
    /// `Ok(None)` to drain all complete frames.
    pub fn decode_next(&mut self) -> Result<Option<Bytes>, CodecError> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }

            if line.len() > MAX_FRAME_SIZE {
                return Err(CodecError::FrameTooLarge(line.len()));
            }
            if !line.is_empty() {
                return Ok(Some(line.freeze()));
            }
        }

        if self.buffer.len() > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge(self.buffer.len()));
        }

        Ok(None)
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
