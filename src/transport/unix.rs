//! Unix domain socket transport

use super::session::{serve_session, SessionLimits};
use super::traits::{RequestHandler, ServerHandle, Transport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::{error, info, warn};

pub struct UnixSocketTransport {
    path: PathBuf,
    limits: SessionLimits,
}

impl UnixSocketTransport {
    pub fn new(path: impl Into<PathBuf>, limits: SessionLimits) -> Self {
        Self {
            path: path.into(),
            limits,
        }
    }
}

#[async_trait]
impl Transport for UnixSocketTransport {
    async fn start(&self, handler: Arc<dyn RequestHandler>) -> Result<ServerHandle> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating socket directory {:?}", parent))?;
        }

        // Remove stale socket file
        if self.path.exists() {
            if let Err(e) = tokio::fs::remove_file(&self.path).await {
                warn!("Failed to remove stale socket {:?}: {}", self.path, e);
            }
        }

        let listener = UnixListener::bind(&self.path)
            .with_context(|| format!("binding socket {:?}", self.path))?;

        let limits = self.limits;
        let task = tokio::spawn(async move {
            match listener.accept().await {
                Ok((stream, _)) => {
                    info!("Client connected");
                    serve_session(stream, handler.as_ref(), limits).await;
                }
                Err(e) => {
                    error!("Accept failed: {}", e);
                    handler.handle(None).await;
                }
            }
        });

        Ok(
            ServerHandle::new(self.name(), self.path.display().to_string(), task)
                .with_cleanup(self.path.clone()),
        )
    }

    fn name(&self) -> &'static str {
        "unix"
    }
}

#[cfg(test)]
mod tests {
    use super::super::session::recording::{collect, RecordingHandler};
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;

    const LIMITS: SessionLimits = SessionLimits {
        max_request_len: 256,
        max_response_len: 1024,
    };

    #[tokio::test]
    async fn test_serves_one_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.sock");
        let transport = UnixSocketTransport::new(&path, LIMITS);

        let (handler, rx) = RecordingHandler::new();
        let handle = transport.start(Arc::new(handler)).await.unwrap();
        assert_eq!(handle.name(), "unix");
        assert_eq!(handle.endpoint(), path.display().to_string());

        let stream = UnixStream::connect(&path).await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        write.write_all(b"STATUS\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("echo:STATUS"));

        write.write_all(b"\n").await.unwrap();
        assert_eq!(collect(rx).await, vec![Some("STATUS".to_string()), None]);
        assert_eq!(lines.next_line().await.unwrap(), None);

        handle.stop();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_replaces_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.sock");
        std::fs::write(&path, b"stale").unwrap();

        let transport = UnixSocketTransport::new(&path, LIMITS);
        let (handler, _rx) = RecordingHandler::new();
        let handle = transport.start(Arc::new(handler)).await.unwrap();

        assert!(UnixStream::connect(&path).await.is_ok());
        handle.stop();
    }

    #[tokio::test]
    async fn test_restart_after_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.sock");
        let transport = UnixSocketTransport::new(&path, LIMITS);

        for _ in 0..2 {
            let (handler, rx) = RecordingHandler::new();
            let handle = transport.start(Arc::new(handler)).await.unwrap();

            let mut stream = UnixStream::connect(&path).await.unwrap();
            stream.write_all(b"\n").await.unwrap();
            assert_eq!(collect(rx).await, vec![None]);
            handle.stop();
        }
    }
}
