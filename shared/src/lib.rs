//! Auto-update shared protocol types
//!
//! This crate provides the request vocabulary, response tokens, install status
//! representations and the line codec used between the update service and its
//! local clients.

pub mod codec;
pub mod request;
pub mod state_machine;

pub use request::Request;

use std::fmt;

/// Response tokens written back to the client
pub mod response {
    /// Installer ran and exited with code zero
    pub const OK: &str = "OK";
    /// Generic failure token, also used for unrecognised requests
    pub const ERROR: &str = "ERROR";
    /// Last install is known to have finished
    pub const FINISHED: &str = "FINISHED";
    /// Last install failed to launch
    pub const FAILED: &str = "FAILED";
    /// No install outcome is known
    pub const INVALID: &str = "INVALID";
}

/// Transport limits shared by both ends of the channel
pub mod limits {
    /// Default maximum response length in bytes
    pub const DEFAULT_MAX_RESPONSE_LEN: usize = 1024;

    /// Default maximum request length in bytes (excluding the line terminator)
    pub const DEFAULT_MAX_REQUEST_LEN: usize = 4096;
}

/// Outcome of the most recent install, as seen by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallStatus {
    /// No install is known
    #[default]
    None,
    /// An install was started and has not been observed to end
    Pending,
    /// The installer was launched (provisional) or observed to finish
    Finished,
    /// The installer could not be launched
    Failed,
}

impl InstallStatus {
    /// Token reported for the `status` request
    pub fn response_token(self) -> &'static str {
        match self {
            InstallStatus::Finished => response::FINISHED,
            InstallStatus::Failed => response::FAILED,
            InstallStatus::None | InstallStatus::Pending => response::INVALID,
        }
    }

    /// Persisted token for this status; `None` has no persisted form
    pub fn persisted_token(self) -> Option<StatusToken> {
        match self {
            InstallStatus::None => None,
            InstallStatus::Pending => Some(StatusToken::Pending),
            InstallStatus::Finished => Some(StatusToken::Success),
            InstallStatus::Failed => Some(StatusToken::Failed),
        }
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallStatus::None => write!(f, "none"),
            InstallStatus::Pending => write!(f, "pending"),
            InstallStatus::Finished => write!(f, "finished"),
            InstallStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Single-word token stored in the sentinel status file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusToken {
    Pending,
    /// Provisional success marker, written once the installer has launched
    Success,
    Failed,
}

impl StatusToken {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusToken::Pending => "PENDING",
            StatusToken::Success => "SUCCESS",
            StatusToken::Failed => "FAILED",
        }
    }

    /// Parse persisted content. Matching is case-insensitive and ignores
    /// surrounding whitespace; anything else is unrecognised.
    pub fn parse(content: &str) -> Option<Self> {
        let token = content.trim();
        [StatusToken::Pending, StatusToken::Success, StatusToken::Failed]
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(token))
    }

    /// Status a plain read maps this token to
    pub fn status(self) -> InstallStatus {
        match self {
            StatusToken::Pending => InstallStatus::Pending,
            StatusToken::Success => InstallStatus::Finished,
            StatusToken::Failed => InstallStatus::Failed,
        }
    }

    /// Status adopted when this token is found at service start-up.
    ///
    /// A pending or launched install is taken as finished: the service only
    /// restarts after the installer process has handed control back.
    pub fn reconciled_status(self) -> InstallStatus {
        match self {
            StatusToken::Pending | StatusToken::Success => InstallStatus::Finished,
            StatusToken::Failed => InstallStatus::Failed,
        }
    }
}

impl fmt::Display for StatusToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
