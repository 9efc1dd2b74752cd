//! Platform trust capability
//!
//! The service only needs two things from the platform: "is the signature on
//! this file valid" and "which certificates signed it". Both are behind
//! [`TrustProvider`] so the decision logic stays independent of how the
//! signature is stored and checked.

use super::allowlist::Thumbprint;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Why signature verification failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyFailure {
    #[error("The file is not signed")]
    NoSignature,

    #[error("The signature is present, but specifically disallowed")]
    ExplicitlyDistrusted,

    #[error("The signature is present, but not trusted")]
    NotTrusted,

    #[error("The signer was not explicitly trusted and policy has disabled user trust")]
    PolicyBlocked,

    #[error("An unknown error occurred trying to verify the signature: {detail}")]
    Unknown { detail: String },
}

/// Failure to open or parse the signature container
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("cannot read signature container: {0}")]
    Io(#[from] io::Error),

    #[error("malformed signature container: {0}")]
    Malformed(String),
}

/// Signature verification and signer enumeration for installer files
pub trait TrustProvider: Send + Sync {
    /// Verify the file's signature. Revocation is not consulted and nothing
    /// is ever shown to a user.
    fn verify_signature(&self, path: &Path) -> Result<(), VerifyFailure>;

    /// Thumbprints of every certificate that signed the file
    fn signer_thumbprints(&self, path: &Path) -> Result<Vec<Thumbprint>, ContainerError>;

    /// Human-readable name for this provider
    fn name(&self) -> &'static str;
}
