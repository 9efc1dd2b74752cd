//! One client session over a line-oriented stream

use super::traits::RequestHandler;
use crate::config::TransportConfig;
use autoupdate_shared::codec::{self, CodecError, LineDecoder};
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Size limits applied to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_request_len: usize,
    pub max_response_len: usize,
}

impl From<&TransportConfig> for SessionLimits {
    fn from(config: &TransportConfig) -> Self {
        Self {
            max_request_len: config.max_request_len,
            max_response_len: config.max_response_len,
        }
    }
}

/// Why a session ended
#[derive(Debug)]
pub enum SessionEnd {
    /// Client sent an empty request
    EmptyRequest,
    /// Handler declined to answer
    HandlerClosed,
    /// Client closed the connection
    Eof,
    Codec(CodecError),
    Io(io::Error),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::EmptyRequest => write!(f, "empty request"),
            SessionEnd::HandlerClosed => write!(f, "handler closed the session"),
            SessionEnd::Eof => write!(f, "client closed connection"),
            SessionEnd::Codec(e) => write!(f, "protocol error: {}", e),
            SessionEnd::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

/// Serve requests from `stream` until the session ends
///
/// The handler sees `None` exactly once, after the last request, unless it
/// ended the session itself.
pub async fn serve_session<S>(
    stream: S,
    handler: &dyn RequestHandler,
    limits: SessionLimits,
) -> SessionEnd
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut decoder = LineDecoder::new(limits.max_request_len);
    let mut read_buf = vec![0u8; 4096];

    let end = 'session: loop {
        // Process all complete lines
        loop {
            let line = match decoder.decode_next() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => break 'session SessionEnd::Codec(e),
            };
            if line.is_empty() {
                break 'session SessionEnd::EmptyRequest;
            }

            let Some(response) = handler.handle(Some(&line)).await else {
                break 'session SessionEnd::HandlerClosed;
            };
            let encoded = codec::encode_line(&response, limits.max_response_len);
            if let Err(e) = writer.write_all(&encoded).await {
                break 'session SessionEnd::Io(e);
            }
            if let Err(e) = writer.flush().await {
                break 'session SessionEnd::Io(e);
            }
        }

        match reader.read(&mut read_buf).await {
            Ok(0) => break SessionEnd::Eof,
            Ok(n) => decoder.extend(&read_buf[..n]),
            Err(e) => break SessionEnd::Io(e),
        }
    };

    match &end {
        SessionEnd::EmptyRequest | SessionEnd::Eof | SessionEnd::HandlerClosed => {
            info!("Session ended: {}", end)
        }
        SessionEnd::Codec(_) | SessionEnd::Io(_) => warn!("Session ended: {}", end),
    }

    if !matches!(end, SessionEnd::HandlerClosed) {
        debug!("Delivering end of session to handler");
        handler.handle(None).await;
    }
    end
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    /// Answers `echo:<request>` and forwards every call to a channel
    pub struct RecordingHandler {
        tx: mpsc::UnboundedSender<Option<String>>,
    }

    impl RecordingHandler {
        pub fn new() -> (Self, mpsc::UnboundedReceiver<Option<String>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (Self { tx }, rx)
        }
    }

    #[async_trait]
    impl RequestHandler for RecordingHandler {
        async fn handle(&self, request: Option<&str>) -> Option<String> {
            let _ = self.tx.send(request.map(str::to_string));
            request.map(|r| format!("echo:{}", r))
        }
    }

    /// Drain the channel until every sender is gone
    pub async fn collect(mut rx: mpsc::UnboundedReceiver<Option<String>>) -> Vec<Option<String>> {
        let mut calls = Vec::new();
        while let Some(call) = rx.recv().await {
            calls.push(call);
        }
        calls
    }
}
