//! Line codec for the request/response channel
//!
//! Every message is one UTF-8 line:
//! ```text
//! [ N bytes: text ][ '\n' ]
//! ```
//!
//! A trailing `'\r'` before the terminator is tolerated on input. Outgoing
//! lines are truncated to the transport maximum at a character boundary and
//! never carry embedded line breaks.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Errors that can occur while decoding lines
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Line too long: {len} bytes (max: {max})")]
    LineTooLong { len: usize, max: usize },

    #[error("Line is not valid UTF-8")]
    InvalidUtf8,
}

/// Truncate `text` to at most `max_len` bytes without splitting a character
pub fn truncate(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Encode a line, truncated to `max_len` bytes of text plus the terminator
pub fn encode_line(text: &str, max_len: usize) -> Bytes {
    let text = truncate(text, max_len);
    let mut buf = BytesMut::with_capacity(text.len() + 1);
    encode_into(text, &mut buf);
    buf.freeze()
}

/// Encode a line into a provided buffer without truncation
pub fn encode_into(text: &str, buf: &mut BytesMut) {
    buf.reserve(text.len() + 1);
    for b in text.bytes() {
        // Keep framing intact: one message, one line
        buf.put_u8(if b == b'\n' || b == b'\r' { b' ' } else { b });
    }
    buf.put_u8(b'\n');
}

/// Try to decode one line from a buffer
///
/// Returns:
/// - `Ok(Some(line))` if a complete line was decoded (terminator stripped)
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the data is invalid
pub fn decode(buf: &mut BytesMut, max_len: usize) -> Result<Option<String>, CodecError> {
    let newline = match buf.iter().position(|b| *b == b'\n') {
        Some(pos) => pos,
        None => {
            if buf.len() > max_len {
                return Err(CodecError::LineTooLong {
                    len: buf.len(),
                    max: max_len,
                });
            }
            return Ok(None);
        }
    };

    let mut line = buf.split_to(newline);
    buf.advance(1);

    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }

    if line.len() > max_len {
        return Err(CodecError::LineTooLong {
            len: line.len(),
            max: max_len,
        });
    }

    String::from_utf8(line.to_vec())
        .map(Some)
        .map_err(|_| CodecError::InvalidUtf8)
}

/// Decoder state for streaming decoding
#[derive(Debug)]
pub struct LineDecoder {
    /// Partial line data being accumulated
    buffer: BytesMut,
    max_len: usize,
}

impl LineDecoder {
    /// Create a new line decoder accepting lines of up to `max_len` bytes
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            max_len,
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next line from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all complete lines
    pub fn decode_next(&mut self) -> Result<Option<String>, CodecError> {
        decode(&mut self.buffer, self.max_len)
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
