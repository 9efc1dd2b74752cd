//! Persisted install status with an in-memory cache

use autoupdate_shared::{InstallStatus, StatusToken};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("cannot write status file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot remove status file {path:?}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Single-slot status storage
///
/// The cache is filled by [`StatusStore::write`] and by start-up
/// reconciliation. Until then reads fall back to the file.
pub struct StatusStore {
    path: PathBuf,
    cache: Mutex<Option<InstallStatus>>,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cache(&self) -> MutexGuard<'_, Option<InstallStatus>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status: the cache if set, else the persisted token
    pub fn read(&self) -> InstallStatus {
        if let Some(status) = *self.cache() {
            return status;
        }
        self.persisted_token()
            .map(StatusToken::status)
            .unwrap_or_default()
    }

    /// Persist `status` and update the cache
    ///
    /// The cache is updated even when the file write fails, so the running
    /// service still reports what it observed.
    pub fn write(&self, status: InstallStatus) -> Result<(), StatusError> {
        *self.cache() = Some(status);

        match status.persisted_token() {
            Some(token) => {
                if let Some(dir) = self.path.parent() {
                    fs::create_dir_all(dir).map_err(|source| StatusError::Write {
                        path: self.path.clone(),
                        source,
                    })?;
                }
                fs::write(&self.path, token.as_str()).map_err(|source| StatusError::Write {
                    path: self.path.clone(),
                    source,
                })?;
                debug!("Status file {:?} set to {}", self.path, token);
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => debug!("Status file {:?} removed", self.path),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StatusError::Remove {
                        path: self.path.clone(),
                        source,
                    })
                }
            },
        }
        Ok(())
    }

    /// Start-up reconciliation: adopt the persisted outcome into the cache
    ///
    /// A `PENDING` or `SUCCESS` token becomes [`InstallStatus::Finished`],
    /// `FAILED` stays failed, missing or unrecognised content means no
    /// prior install.
    pub fn reconcile(&self) -> InstallStatus {
        let status = match self.persisted_token() {
            Some(token) => {
                let status = token.reconciled_status();
                info!("Persisted status {} reconciled to {}", token, status);
                status
            }
            None => {
                info!("No prior install recorded");
                InstallStatus::None
            }
        };
        *self.cache() = Some(status);
        status
    }

    fn persisted_token(&self) -> Option<StatusToken> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = StatusToken::parse(&content);
                if token.is_none() {
                    warn!("Unrecognised content in status file {:?}", self.path);
                }
                token
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Cannot read status file {:?}: {}", self.path, e);
                None
            }
        }
    }
}
