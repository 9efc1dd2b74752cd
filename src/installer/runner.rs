//! Installer runner - validate, record, launch, wait, merge

use super::launcher::{Invocation, ProcessLauncher};
use super::msi_log;
use crate::config::InstallerConfig;
use crate::status::StatusStore;
use crate::trust::TrustValidator;
use autoupdate_shared::state_machine::{InstallRun, RunEvent, TransitionResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs one installer at a time to completion
pub struct InstallerRunner {
    validator: Arc<TrustValidator>,
    status: Arc<StatusStore>,
    launcher: Arc<dyn ProcessLauncher>,
    config: InstallerConfig,
    log_path: PathBuf,
}

impl InstallerRunner {
    pub fn new(
        validator: Arc<TrustValidator>,
        status: Arc<StatusStore>,
        launcher: Arc<dyn ProcessLauncher>,
        config: InstallerConfig,
        log_path: PathBuf,
    ) -> Self {
        Self {
            validator,
            status,
            launcher,
            config,
            log_path,
        }
    }

    /// Run the installer at `path`; true iff it exited with code zero
    pub async fn run(&self, path: &Path) -> bool {
        let mut run = InstallRun::new();

        // The validator logs its own outcome line
        if !self.validate(path).await {
            self.apply(&mut run, RunEvent::TrustRejected);
            return false;
        }

        self.remove_stale_log();
        self.apply(&mut run, RunEvent::TrustAccepted);

        let invocation = Invocation::render(&self.config, path, &self.log_path);
        info!("Installer command: {}", invocation);

        let mut process = match self.launcher.launch(&invocation).await {
            Ok(process) => process,
            Err(e) => {
                error!("Failed to run installer: {}", e);
                self.apply(&mut run, RunEvent::LaunchFailed);
                return false;
            }
        };
        self.apply(&mut run, RunEvent::Launched);
        info!("Installer launched, waiting to finish");

        let code = match process.wait().await {
            Ok(code) => code,
            Err(e) => {
                error!("Failed waiting for installer: {}", e);
                None
            }
        };
        info!("Installer finished, exit code: {:?}", code);
        self.apply(&mut run, RunEvent::Exited { code });

        msi_log::merge(&self.log_path);
        run.succeeded()
    }

    /// Trust checks run on a blocking thread under the caller's dispatcher
    async fn validate(&self, path: &Path) -> bool {
        let validator = self.validator.clone();
        let target = path.to_path_buf();
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());

        tokio::task::spawn_blocking(move || {
            tracing::dispatcher::with_default(&dispatch, || validator.validate(&target))
        })
        .await
        .unwrap_or_else(|e| {
            error!("Trust validation task failed: {}", e);
            false
        })
    }

    fn apply(&self, run: &mut InstallRun, event: RunEvent) {
        match run.process_event(event) {
            TransitionResult::Success { phase, persist } => {
                debug!("Install run now {:?}", phase);
                if let Some(status) = persist {
                    if let Err(e) = self.status.write(status) {
                        error!("{}", e);
                    }
                }
            }
            TransitionResult::Invalid { from, event } => {
                warn!("Ignoring {:?} in install phase {:?}", event, from);
            }
        }
    }

    fn remove_stale_log(&self) {
        match std::fs::remove_file(&self.log_path) {
            Ok(()) => debug!("Removed previous installer log {:?}", self.log_path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Cannot remove previous installer log {:?}: {}", self.log_path, e),
        }
    }
}
