//! Installer trust validation
//!
//! Signature verification and signer enumeration come from a
//! [`TrustProvider`]; [`TrustValidator`] combines them with the [`AllowList`].

mod allowlist;
mod detached;
mod provider;
mod validator;

pub use allowlist::{AllowList, Thumbprint, ThumbprintParseError, BUILTIN_THUMBPRINTS};
pub use detached::{file_digest, key_thumbprint, DetachedSignatureProvider};
pub use provider::{ContainerError, TrustProvider, VerifyFailure};
pub use validator::{TrustError, TrustValidator};

#[cfg(test)]
pub(crate) use detached::fixtures;
#[cfg(test)]
pub(crate) use validator::fakes;
