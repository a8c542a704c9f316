//! Digest algorithms used for fingerprinting.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Digest algorithm backing a fingerprint.
///
/// MD5 matches fingerprints produced by browser uploaders; SHA-256 is the
/// native choice for `splicectl`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Md5,
    #[default]
    Sha256,
}

impl DigestAlgorithm {
    /// Length of the lowercase hex encoding of a digest.
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }

    /// Infer the algorithm from a hex digest length.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            32 => Some(Self::Md5),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }

    /// Create an incremental hasher for this algorithm.
    pub fn hasher(self) -> SampleHasher {
        match self {
            Self::Md5 => SampleHasher::Md5(Md5::new()),
            Self::Sha256 => SampleHasher::Sha256(Sha256::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(format!("unknown digest algorithm: {other}")),
        }
    }
}

/// Incremental hasher over the sampled windows of a file.
pub enum SampleHasher {
    Md5(Md5),
    Sha256(Sha256),
}

impl SampleHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
        }
    }

    /// Finalize and return the digest as lowercase hex.
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => to_hex(&h.finalize()),
            Self::Sha256(h) => to_hex(&h.finalize()),
        }
    }
}

/// Encode bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
