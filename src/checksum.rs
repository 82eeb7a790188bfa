//! Checksum utilities for fragment identity and artifact integrity

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    fn digest(data: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(data)))
    }

    pub fn from_text(content: &str) -> Self {
        Self::digest(content.as_bytes())
    }

    /// Compute checksum of a value's canonical JSON encoding.
    ///
    /// Field order is fixed by the struct definitions, so equal values always
    /// encode to equal bytes.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        let canonical = serde_json::to_vec(value).unwrap_or_default();
        Self::digest(&canonical)
    }

    /// First 12 hex digits, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &str) -> bool {
        *self == Self::from_text(content)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
