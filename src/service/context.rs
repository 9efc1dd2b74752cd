//! Shared service state

use crate::installer::InstallerRunner;
use crate::logbuf::LogBuffer;
use crate::status::StatusStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Everything the command handlers act on
pub struct ServiceContext {
    pub log_buffer: LogBuffer,
    pub status: Arc<StatusStore>,
    pub runner: InstallerRunner,
}

impl ServiceContext {
    pub fn new(log_buffer: LogBuffer, status: Arc<StatusStore>, runner: InstallerRunner) -> Self {
        Self {
            log_buffer,
            status,
            runner,
        }
    }
}

/// Connected flag of the current session, shared between the dispatcher
/// and the service loop
#[derive(Debug, Default)]
pub struct SessionSignal {
    connected: AtomicBool,
    notify: Notify,
}

impl SessionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a new session as connected
    pub fn begin(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Clear the connected flag and wake the service loop
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Resolve once the flag is cleared
    pub async fn disconnected(&self) {
        loop {
            // Stored permit covers a disconnect that lands before we wait
            let notified = self.notify.notified();
            if !self.is_connected() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::InstallerConfig;
    use crate::installer::spies::{LaunchScript, SpyLauncher};
    use crate::trust::fakes::FakeProvider;
    use crate::trust::{AllowList, TrustValidator};

    pub struct TestContext {
        pub dir: tempfile::TempDir,
        pub ctx: Arc<ServiceContext>,
        pub launcher: Arc<SpyLauncher>,
    }

    /// Context over a temporary data directory with scripted collaborators
    pub fn test_context(provider: FakeProvider, script: LaunchScript) -> TestContext {
        let dir = tempfile::tempdir().expect("tempdir");
        let status_path = dir.path().join("status.sau");

        let status = Arc::new(StatusStore::new(&status_path));
        let launcher = Arc::new(SpyLauncher::new(script, status_path));
        let validator = Arc::new(TrustValidator::new(Arc::new(provider), AllowList::builtin()));
        let runner = InstallerRunner::new(
            validator,
            status.clone(),
            launcher.clone(),
            InstallerConfig::default(),
            dir.path().join("msiexec.log"),
        );

        TestContext {
            ctx: Arc::new(ServiceContext::new(LogBuffer::default(), status, runner)),
            dir,
            launcher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_disconnect_before_wait() {
        let signal = SessionSignal::new();
        signal.begin();
        signal.disconnect();
        tokio::time::timeout(Duration::from_secs(1), signal.disconnected())
            .await
            .expect("already disconnected");
    }

    #[tokio::test]
    async fn test_disconnect_wakes_waiter() {
        let signal = Arc::new(SessionSignal::new());
        signal.begin();

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.disconnected().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        signal.disconnect();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter released")
            .unwrap();
        assert!(!signal.is_connected());
    }
}
