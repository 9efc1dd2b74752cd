//! Detached signature envelope provider
//!
//! An installer `X` is signed by shipping `X.sig` next to it:
//! ```text
//! { "public_key": "<hex, 32 bytes>", "signature": "<hex, 64 bytes>" }
//! ```
//! The signature is Ed25519 over the SHA-256 digest of `X`. The signer
//! thumbprint is the first 20 bytes of SHA-256 over the public key.

use super::allowlist::{Thumbprint, THUMBPRINT_LEN};
use super::provider::{ContainerError, TrustProvider, VerifyFailure};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Extension appended to the installer file name
pub const ENVELOPE_EXTENSION: &str = "sig";

#[derive(Debug, Deserialize)]
struct Envelope {
    public_key: String,
    signature: String,
}

/// Verifies `<installer>.sig` envelopes
#[derive(Debug, Default)]
pub struct DetachedSignatureProvider {
    distrusted: HashSet<Thumbprint>,
}

impl DetachedSignatureProvider {
    pub fn new(distrusted: impl IntoIterator<Item = Thumbprint>) -> Self {
        Self {
            distrusted: distrusted.into_iter().collect(),
        }
    }

    /// Path of the envelope belonging to `installer`
    pub fn envelope_path(installer: &Path) -> PathBuf {
        let mut name = OsString::from(installer.as_os_str());
        name.push(".");
        name.push(ENVELOPE_EXTENSION);
        PathBuf::from(name)
    }

    fn read_envelope(installer: &Path) -> Result<Envelope, ContainerError> {
        let raw = std::fs::read(Self::envelope_path(installer))?;
        serde_json::from_slice(&raw).map_err(|e| ContainerError::Malformed(e.to_string()))
    }

    fn decode_key(envelope: &Envelope) -> Result<VerifyingKey, ContainerError> {
        let mut key = [0u8; 32];
        hex::decode_to_slice(envelope.public_key.trim(), &mut key)
            .map_err(|e| ContainerError::Malformed(format!("public_key: {}", e)))?;
        VerifyingKey::from_bytes(&key)
            .map_err(|e| ContainerError::Malformed(format!("public_key: {}", e)))
    }

    fn decode_signature(envelope: &Envelope) -> Result<Signature, ContainerError> {
        let mut sig = [0u8; 64];
        hex::decode_to_slice(envelope.signature.trim(), &mut sig)
            .map_err(|e| ContainerError::Malformed(format!("signature: {}", e)))?;
        Ok(Signature::from_bytes(&sig))
    }
}

/// Thumbprint of a signing key
pub fn key_thumbprint(key: &VerifyingKey) -> Thumbprint {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; THUMBPRINT_LEN];
    bytes.copy_from_slice(&digest[..THUMBPRINT_LEN]);
    Thumbprint(bytes)
}

/// SHA-256 of a file's contents, streamed
pub fn file_digest(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().into())
}

impl TrustProvider for DetachedSignatureProvider {
    fn verify_signature(&self, path: &Path) -> Result<(), VerifyFailure> {
        let envelope = match Self::read_envelope(path) {
            Ok(envelope) => envelope,
            Err(ContainerError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(VerifyFailure::NoSignature)
            }
            Err(e) => {
                return Err(VerifyFailure::Unknown {
                    detail: e.to_string(),
                })
            }
        };

        let unknown = |e: ContainerError| VerifyFailure::Unknown {
            detail: e.to_string(),
        };
        let key = Self::decode_key(&envelope).map_err(unknown)?;
        let signature = Self::decode_signature(&envelope).map_err(unknown)?;

        if self.distrusted.contains(&key_thumbprint(&key)) {
            return Err(VerifyFailure::ExplicitlyDistrusted);
        }

        let digest = file_digest(path).map_err(|e| VerifyFailure::Unknown {
            detail: format!("cannot read {:?}: {}", path, e),
        })?;

        key.verify_strict(&digest, &signature)
            .map_err(|_| VerifyFailure::NotTrusted)
    }

    fn signer_thumbprints(&self, path: &Path) -> Result<Vec<Thumbprint>, ContainerError> {
        let envelope = Self::read_envelope(path)?;
        let key = Self::decode_key(&envelope)?;
        Ok(vec![key_thumbprint(&key)])
    }

    fn name(&self) -> &'static str {
        "detached-ed25519"
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Signed installer fixtures for tests across the crate

    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    pub fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    /// Write an installer with `body` and a matching envelope signed by `key`
    pub fn write_signed(dir: &Path, name: &str, body: &[u8], key: &SigningKey) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).expect("write installer");
        let digest = file_digest(&path).expect("digest");
        let signature = key.sign(&digest);
        let envelope = serde_json::json!({
            "public_key": hex::encode(key.verifying_key().as_bytes()),
            "signature": hex::encode(signature.to_bytes()),
        });
        std::fs::write(
            DetachedSignatureProvider::envelope_path(&path),
            envelope.to_string(),
        )
        .expect("write envelope");
        path
    }

    pub fn thumbprint_of(key: &SigningKey) -> Thumbprint {
        key_thumbprint(&key.verifying_key())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_envelope_path_appends_extension() {
        assert_eq!(
            DetachedSignatureProvider::envelope_path(Path::new("/tmp/pkg.msi")),
            PathBuf::from("/tmp/pkg.msi.sig")
        );
    }

    #[test]
    fn test_valid_signature() {
        let dir = tempfile::tempdir().unwrap();
        let key = signing_key(1);
        let path = write_signed(dir.path(), "pkg.msi", b"payload", &key);

        let provider = DetachedSignatureProvider::default();
        assert_eq!(provider.verify_signature(&path), Ok(()));
        assert_eq!(provider.signer_thumbprints(&path).unwrap(), vec![thumbprint_of(&key)]);
    }

    #[test]
    fn test_missing_envelope_is_no_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.msi");
        std::fs::write(&path, b"payload").unwrap();

        let provider = DetachedSignatureProvider::default();
        assert_eq!(provider.verify_signature(&path), Err(VerifyFailure::NoSignature));
        assert!(matches!(
            provider.signer_thumbprints(&path),
            Err(ContainerError::Io(_))
        ));
    }

    #[test]
    fn test_tampered_payload_is_not_trusted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_signed(dir.path(), "pkg.msi", b"payload", &signing_key(1));
        std::fs::write(&path, b"payload, modified").unwrap();

        let provider = DetachedSignatureProvider::default();
        assert_eq!(provider.verify_signature(&path), Err(VerifyFailure::NotTrusted));
    }

    #[test]
    fn test_distrusted_key() {
        let dir = tempfile::tempdir().unwrap();
        let key = signing_key(9);
        let path = write_signed(dir.path(), "pkg.msi", b"payload", &key);

        let provider = DetachedSignatureProvider::new([thumbprint_of(&key)]);
        assert_eq!(
            provider.verify_signature(&path),
            Err(VerifyFailure::ExplicitlyDistrusted)
        );
    }

    #[test]
    fn test_malformed_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.msi");
        std::fs::write(&path, b"payload").unwrap();
        std::fs::write(DetachedSignatureProvider::envelope_path(&path), "{not json").unwrap();

        let provider = DetachedSignatureProvider::default();
        assert!(matches!(
            provider.verify_signature(&path),
            Err(VerifyFailure::Unknown { .. })
        ));
        assert!(matches!(
            provider.signer_thumbprints(&path),
            Err(ContainerError::Malformed(_))
        ));
    }
}
