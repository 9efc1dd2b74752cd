//! Transport trait abstraction for the local request/response channel

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Receives requests from a connected client
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle one request line. `None` means the session has ended.
    ///
    /// Returning `None` for a request ends the session without a response.
    async fn handle(&self, request: Option<&str>) -> Option<String>;
}

/// A started transport serving one client session
pub struct ServerHandle {
    name: &'static str,
    endpoint: String,
    task: JoinHandle<()>,
    cleanup: Option<PathBuf>,
}

impl ServerHandle {
    pub fn new(name: &'static str, endpoint: String, task: JoinHandle<()>) -> Self {
        Self {
            name,
            endpoint,
            task,
            cleanup: None,
        }
    }

    /// Remove `path` when the server is stopped
    pub fn with_cleanup(mut self, path: PathBuf) -> Self {
        self.cleanup = Some(path);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Where clients connect
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Stop serving and release the endpoint
    pub fn stop(self) {
        self.task.abort();
        if let Some(path) = self.cleanup {
            if std::fs::remove_file(&path).is_ok() {
                debug!("Removed {:?}", path);
            }
        }
    }
}

/// Factory for listening endpoints
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind and serve exactly one client connection in the background
    async fn start(&self, handler: Arc<dyn RequestHandler>) -> Result<ServerHandle>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
