//! Signer thumbprints trusted to sign installers
//!
//! Whenever a new signing certificate is taken into use its thumbprint has to
//! be added to [`BUILTIN_THUMBPRINTS`], or packages signed with it will be
//! rejected. Old entries stay so legacy packages keep validating.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a certificate thumbprint in bytes
pub const THUMBPRINT_LEN: usize = 20;

/// Current and past release signing certificates
pub const BUILTIN_THUMBPRINTS: &[Thumbprint] = &[
    // e846d3fb2a93007e921c3affcd7032f0186f116a
    Thumbprint([
        0xe8, 0x46, 0xd3, 0xfb, 0x2a, 0x93, 0x00, 0x7e, 0x92, 0x1c, 0x3a, 0xff, 0xcd, 0x70,
        0x32, 0xf0, 0x18, 0x6f, 0x11, 0x6a,
    ]),
    // 99b3333ac4457a4e21a527cc11040b28c15c1d3f
    Thumbprint([
        0x99, 0xb3, 0x33, 0x3a, 0xc4, 0x45, 0x7a, 0x4e, 0x21, 0xa5, 0x27, 0xcc, 0x11, 0x04,
        0x0b, 0x28, 0xc1, 0x5c, 0x1d, 0x3f,
    ]),
];

/// Fixed-length hash identifying a signing certificate
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Thumbprint(pub [u8; THUMBPRINT_LEN]);

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid thumbprint {input:?}: expected {THUMBPRINT_LEN} hex-encoded bytes")]
pub struct ThumbprintParseError {
    input: String,
}

impl FromStr for Thumbprint {
    type Err = ThumbprintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; THUMBPRINT_LEN];
        hex::decode_to_slice(s.trim(), &mut bytes).map_err(|_| ThumbprintParseError {
            input: s.to_string(),
        })?;
        Ok(Thumbprint(bytes))
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thumbprint({})", self)
    }
}

/// Immutable set of trusted thumbprints
#[derive(Debug, Clone)]
pub struct AllowList {
    entries: Vec<Thumbprint>,
}

impl AllowList {
    /// The compiled-in list
    pub fn builtin() -> Self {
        Self::new(BUILTIN_THUMBPRINTS.iter().copied())
    }

    pub fn new(entries: impl IntoIterator<Item = Thumbprint>) -> Self {
        let mut list: Vec<Thumbprint> = Vec::new();
        for entry in entries {
            if !list.contains(&entry) {
                list.push(entry);
            }
        }
        Self { entries: list }
    }

    /// The compiled-in list plus configured additions
    pub fn with_additional<S: AsRef<str>>(extra: &[S]) -> Result<Self, ThumbprintParseError> {
        let parsed = extra
            .iter()
            .map(|s| s.as_ref().parse::<Thumbprint>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(BUILTIN_THUMBPRINTS.iter().copied().chain(parsed)))
    }

    pub fn contains(&self, thumbprint: &Thumbprint) -> bool {
        self.entries.contains(thumbprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
