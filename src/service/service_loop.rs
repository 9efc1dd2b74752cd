//! Service loop with start-up reconciliation and transport restarts

use super::context::{ServiceContext, SessionSignal};
use crate::command::CommandDispatcher;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Restart policy for a transport that fails to start
#[derive(Debug, Clone, Copy)]
pub struct RestartPolicy {
    /// Initial delay
    pub delay: Duration,
    /// Maximum delay
    pub max_delay: Duration,
}

/// Keeps one transport session alive until shutdown
pub struct ServiceLoop {
    ctx: Arc<ServiceContext>,
    transport: Arc<dyn Transport>,
    policy: RestartPolicy,
}

impl ServiceLoop {
    pub fn new(
        ctx: Arc<ServiceContext>,
        transport: Arc<dyn Transport>,
        policy: RestartPolicy,
    ) -> Self {
        Self {
            ctx,
            transport,
            policy,
        }
    }

    /// Run until `shutdown` turns true or its sender goes away
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Service main function running");
        self.ctx.status.reconcile();

        let mut restart_delay = self.policy.delay;

        while !*shutdown.borrow() {
            let session = Arc::new(SessionSignal::new());
            session.begin();
            let dispatcher = Arc::new(CommandDispatcher::new(self.ctx.clone(), session.clone()));

            info!("Starting {} transport", self.transport.name());
            let handle = match self.transport.start(dispatcher).await {
                Ok(handle) => {
                    restart_delay = self.policy.delay; // Reset delay
                    handle
                }
                Err(e) => {
                    error!("Failed to start {} transport: {:#}", self.transport.name(), e);
                    tokio::select! {
                        _ = tokio::time::sleep(restart_delay) => {}
                        _ = shutdown_requested(&mut shutdown) => break,
                    }
                    // Exponential backoff
                    restart_delay = std::cmp::min(restart_delay * 2, self.policy.max_delay);
                    continue;
                }
            };
            info!("{} transport listening on {}", handle.name(), handle.endpoint());

            tokio::select! {
                _ = session.disconnected() => {
                    info!("Client disconnected");
                    handle.stop();
                }
                _ = shutdown_requested(&mut shutdown) => {
                    handle.stop();
                    break;
                }
            }
        }

        info!("Leaving service main function");
    }
}

/// Resolves when shutdown is signalled or can no longer be signalled
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
