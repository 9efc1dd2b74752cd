//! Loopback TCP transport

use super::session::{serve_session, SessionLimits};
use super::traits::{RequestHandler, ServerHandle, Transport};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub struct TcpTransport {
    address: SocketAddr,
    limits: SessionLimits,
}

impl TcpTransport {
    /// Only loopback addresses are accepted
    pub fn new(address: &str, limits: SessionLimits) -> Result<Self> {
        let address: SocketAddr = address
            .parse()
            .with_context(|| format!("invalid TCP address {:?}", address))?;
        if !address.ip().is_loopback() {
            bail!("TCP transport must bind a loopback address, got {}", address);
        }
        Ok(Self { address, limits })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn start(&self, handler: Arc<dyn RequestHandler>) -> Result<ServerHandle> {
        let listener = TcpListener::bind(self.address)
            .await
            .with_context(|| format!("binding {}", self.address))?;
        let local = listener.local_addr()?;

        let limits = self.limits;
        let task = tokio::spawn(async move {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!("Client connected from {}", peer);
                    if let Err(e) = stream.set_nodelay(true) {
                        error!("Failed to set TCP_NODELAY: {}", e);
                    }
                    serve_session(stream, handler.as_ref(), limits).await;
                }
                Err(e) => {
                    error!("Accept failed: {}", e);
                    handler.handle(None).await;
                }
            }
        });

        Ok(ServerHandle::new(self.name(), local.to_string(), task))
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}

#[cfg(test)]
mod tests {
    use super::super::session::recording::{collect, RecordingHandler};
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    const LIMITS: SessionLimits = SessionLimits {
        max_request_len: 256,
        max_response_len: 1024,
    };

    #[test]
    fn test_rejects_non_loopback() {
        assert!(TcpTransport::new("0.0.0.0:47600", LIMITS).is_err());
        assert!(TcpTransport::new("not-an-address", LIMITS).is_err());
        assert!(TcpTransport::new("127.0.0.1:47600", LIMITS).is_ok());
        assert!(TcpTransport::new("[::1]:47600", LIMITS).is_ok());
    }

    #[tokio::test]
    async fn test_serves_one_session() {
        let transport = TcpTransport::new("127.0.0.1:0", LIMITS).unwrap();
        let (handler, rx) = RecordingHandler::new();
        let handle = transport.start(Arc::new(handler)).await.unwrap();

        let stream = TcpStream::connect(handle.endpoint()).await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        write.write_all(b"log\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("echo:log"));

        // Closing the connection ends the session like an empty request
        drop(write);
        drop(lines);
        assert_eq!(collect(rx).await, vec![Some("log".to_string()), None]);
        handle.stop();
    }
}
