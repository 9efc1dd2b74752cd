//! Installer trust decision
//!
//! A file is trusted when its signature verifies AND at least one signer is
//! on the allow-list. Every decision logs exactly one outcome line.

use super::allowlist::AllowList;
use super::provider::{ContainerError, TrustProvider, VerifyFailure};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Why an installer was rejected
#[derive(Error, Debug)]
pub enum TrustError {
    #[error("{0}")]
    Signature(#[from] VerifyFailure),

    #[error("{0}")]
    Container(#[from] ContainerError),

    #[error("signed by an unknown certificate")]
    UnknownSigner,
}

pub struct TrustValidator {
    provider: Arc<dyn TrustProvider>,
    allow_list: AllowList,
}

impl TrustValidator {
    pub fn new(provider: Arc<dyn TrustProvider>, allow_list: AllowList) -> Self {
        Self {
            provider,
            allow_list,
        }
    }

    /// Decide whether the installer at `path` may be run
    pub fn validate(&self, path: &Path) -> bool {
        match self.check(path) {
            Ok(()) => {
                info!("The file {:?} is signed and the signature was verified", path);
                true
            }
            Err(TrustError::Signature(reason)) => {
                error!("Signature check failed for {:?}: {}", path, reason);
                false
            }
            Err(TrustError::Container(reason)) => {
                error!("Could not read signers of {:?}: {}", path, reason);
                false
            }
            Err(TrustError::UnknownSigner) => {
                error!("The file {:?} is signed by an unknown certificate", path);
                false
            }
        }
    }

    /// Run both checks without logging
    pub fn check(&self, path: &Path) -> Result<(), TrustError> {
        self.provider.verify_signature(path)?;

        let signers = self.provider.signer_thumbprints(path)?;
        if signers.iter().any(|t| self.allow_list.contains(t)) {
            Ok(())
        } else {
            Err(TrustError::UnknownSigner)
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::super::allowlist::Thumbprint;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider that counts calls
    pub struct FakeProvider {
        pub verify: Result<(), VerifyFailure>,
        pub signers: Option<Vec<Thumbprint>>,
        pub verify_calls: AtomicUsize,
        pub signer_calls: AtomicUsize,
    }

    impl FakeProvider {
        pub fn new(verify: Result<(), VerifyFailure>, signers: Option<Vec<Thumbprint>>) -> Self {
            Self {
                verify,
                signers,
                verify_calls: AtomicUsize::new(0),
                signer_calls: AtomicUsize::new(0),
            }
        }

        pub fn trusted() -> Self {
            Self::new(Ok(()), Some(vec![super::super::BUILTIN_THUMBPRINTS[0]]))
        }

        pub fn rejecting(reason: VerifyFailure) -> Self {
            Self::new(Err(reason), None)
        }
    }

    impl TrustProvider for FakeProvider {
        fn verify_signature(&self, _path: &Path) -> Result<(), VerifyFailure> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            self.verify.clone()
        }

        fn signer_thumbprints(&self, _path: &Path) -> Result<Vec<Thumbprint>, ContainerError> {
            self.signer_calls.fetch_add(1, Ordering::SeqCst);
            self.signers
                .clone()
                .ok_or_else(|| ContainerError::Malformed("no signer info".into()))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::allowlist::{Thumbprint, BUILTIN_THUMBPRINTS};
    use super::super::detached::{fixtures, DetachedSignatureProvider};
    use super::fakes::FakeProvider;
    use super::*;
    use crate::logbuf::{BufferLayer, LogBuffer};
    use std::sync::atomic::Ordering;
    use tracing_subscriber::prelude::*;

    fn validate_logged(validator: &TrustValidator, path: &Path) -> (bool, Vec<String>) {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::registry().with(BufferLayer::new(buffer.clone()));
        let accepted =
            tracing::subscriber::with_default(subscriber, || validator.validate(path));

        let mut lines = Vec::new();
        loop {
            let line = buffer.pull_one();
            if line.is_empty() {
                break;
            }
            lines.push(line);
        }
        (accepted, lines)
    }

    #[test]
    fn test_trusted_signer_accepted() {
        let validator = TrustValidator::new(Arc::new(FakeProvider::trusted()), AllowList::builtin());
        let (accepted, lines) = validate_logged(&validator, Path::new("/tmp/pkg.msi"));

        assert!(accepted);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("is signed and the signature was verified"));
    }

    #[test]
    fn test_each_verify_failure_rejects_without_enumerating_signers() {
        let reasons = [
            (VerifyFailure::NoSignature, "not signed"),
            (VerifyFailure::ExplicitlyDistrusted, "specifically disallowed"),
            (VerifyFailure::NotTrusted, "not trusted"),
            (VerifyFailure::PolicyBlocked, "policy has disabled user trust"),
            (
                VerifyFailure::Unknown {
                    detail: "boom".into(),
                },
                "boom",
            ),
        ];

        for (reason, expected) in reasons {
            let provider = Arc::new(FakeProvider::rejecting(reason));
            let validator = TrustValidator::new(provider.clone(), AllowList::builtin());
            let (accepted, lines) = validate_logged(&validator, Path::new("/tmp/pkg.msi"));

            assert!(!accepted);
            assert_eq!(lines.len(), 1);
            assert!(lines[0].contains(expected), "got {:?}", lines[0]);
            assert_eq!(provider.signer_calls.load(Ordering::SeqCst), 0);
        }
    }

    #[test]
    fn test_unknown_signer_rejected() {
        let provider = FakeProvider::new(Ok(()), Some(vec![Thumbprint([0xab; 20])]));
        let validator = TrustValidator::new(Arc::new(provider), AllowList::builtin());
        let (accepted, lines) = validate_logged(&validator, Path::new("/tmp/pkg.msi"));

        assert!(!accepted);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("unknown certificate"));
    }

    #[test]
    fn test_any_allowed_signer_is_enough() {
        let provider = FakeProvider::new(
            Ok(()),
            Some(vec![Thumbprint([0xab; 20]), BUILTIN_THUMBPRINTS[1]]),
        );
        let validator = TrustValidator::new(Arc::new(provider), AllowList::builtin());
        assert!(validator.check(Path::new("/tmp/pkg.msi")).is_ok());
    }

    #[test]
    fn test_unreadable_signer_info_rejected() {
        let provider = FakeProvider::new(Ok(()), None);
        let validator = TrustValidator::new(Arc::new(provider), AllowList::builtin());
        assert!(matches!(
            validator.check(Path::new("/tmp/pkg.msi")),
            Err(TrustError::Container(_))
        ));
    }

    #[test]
    fn test_detached_provider_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let key = fixtures::signing_key(3);
        let path = fixtures::write_signed(dir.path(), "pkg.msi", b"payload", &key);
        let provider = Arc::new(DetachedSignatureProvider::default());

        // Valid signature, but the key is not on the compiled-in list
        let validator = TrustValidator::new(provider.clone(), AllowList::builtin());
        assert!(matches!(
            validator.check(&path),
            Err(TrustError::UnknownSigner)
        ));

        let allowed = AllowList::new([fixtures::thumbprint_of(&key)]);
        let validator = TrustValidator::new(provider, allowed);
        assert!(validator.check(&path).is_ok());
    }
}
