// Submission signing
// Decision: HMAC-SHA256, lowercase hex on the wire
// Decision: Canonical message is "<seconds>:<state>", or ":<state>" when the
// submitter leaves the timestamp to the server
//
// The key is loaded once per process and passed by reference; it is never
// transmitted and never printed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::door::DoorState;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex encoded signature
pub const SIGNATURE_HEX_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key file is empty")]
    Empty,

    #[error("key rejected by HMAC: {0}")]
    Invalid(String),
}

/// Shared secret used by agent and server
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

impl SigningKey {
    /// Build a key from raw bytes. Surrounding ASCII whitespace is stripped
    /// so a trailing newline in a key file does not change the key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let trimmed = bytes.trim_ascii();
        if trimmed.is_empty() {
            return Err(KeyError::Empty);
        }
        let mac = HmacSha256::new_from_slice(trimmed).map_err(|e| KeyError::Invalid(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Load the key file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| KeyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    fn digest(&self, message: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Canonical byte string covered by the signature
pub fn canonical_message(timestamp: Option<i64>, state: DoorState) -> String {
    match timestamp {
        Some(seconds) => format!("{}:{}", seconds, state.as_str()),
        None => format!(":{}", state.as_str()),
    }
}

/// Sign `(timestamp, state)`, returning the hex encoded HMAC
pub fn sign(key: &SigningKey, timestamp: Option<i64>, state: DoorState) -> String {
    hex::encode(key.digest(&canonical_message(timestamp, state)))
}

/// Check a hex encoded signature in constant time
pub fn verify(key: &SigningKey, timestamp: Option<i64>, state: DoorState, signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let expected = key.digest(&canonical_message(timestamp, state));
    if provided.len() != expected.len() {
        return false;
    }
    expected.ct_eq(provided.as_slice()).into()
}
