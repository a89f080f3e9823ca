//! SHA-256 content digests
//!
//! All digests are 64-character lowercase hex.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::canonical::to_canonical_string;
use super::errors::{HashingError, HashingResult};

/// Input accepted by [`digest`]
#[derive(Debug, Clone, Copy)]
pub enum DigestInput<'a> {
    /// UTF-8 text, hashed as its bytes
    Text(&'a str),
    /// Raw bytes
    Bytes(&'a [u8]),
    /// A structured value, canonicalised before hashing
    Structured(&'a Value),
}

impl<'a> From<&'a str> for DigestInput<'a> {
    fn from(s: &'a str) -> Self {
        DigestInput::Text(s)
    }
}

impl<'a> From<&'a String> for DigestInput<'a> {
    fn from(s: &'a String) -> Self {
        DigestInput::Text(s.as_str())
    }
}

impl<'a> From<&'a [u8]> for DigestInput<'a> {
    fn from(b: &'a [u8]) -> Self {
        DigestInput::Bytes(b)
    }
}

impl<'a> From<&'a Vec<u8>> for DigestInput<'a> {
    fn from(b: &'a Vec<u8>) -> Self {
        DigestInput::Bytes(b.as_slice())
    }
}

impl<'a> From<&'a Value> for DigestInput<'a> {
    fn from(v: &'a Value) -> Self {
        DigestInput::Structured(v)
    }
}

/// Computes the hex SHA-256 digest of a text, byte or structured input.
pub fn digest<'a>(input: impl Into<DigestInput<'a>>) -> String {
    match input.into() {
        DigestInput::Text(s) => sha256_hex(s.as_bytes()),
        DigestInput::Bytes(b) => sha256_hex(b),
        DigestInput::Structured(v) => sha256_hex(to_canonical_string(v).as_bytes()),
    }
}

/// Digests any serializable value through its canonical JSON form.
///
/// # Errors
///
/// Returns `HashingError::NotRepresentable` when serde_json cannot encode
/// the value (for example a non-finite float).
pub fn digest_serializable<T: Serialize + ?Sized>(value: &T) -> HashingResult<String> {
    let json = serde_json::to_value(value)
        .map_err(|e| HashingError::NotRepresentable(e.to_string()))?;
    Ok(digest(&json))
}

/// Raw SHA-256 as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// True if `s` has the shape of a digest produced by this module.
pub fn is_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Constant-time equality for digests received from untrusted callers.
pub fn digests_equal(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
