//! JSON Canonicalization Scheme (RFC 8785).
//!
//! Every byte sequence that is hashed or signed goes through
//! [`CanonicalBytes::new`], so two semantically equal JSON documents always
//! produce the same digest regardless of key order or whitespace.

use serde::Serialize;

use crate::error::CryptoError;

/// Bytes produced by JCS canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    pub fn new(value: &impl Serialize) -> Result<Self, CryptoError> {
        serde_jcs::to_string(value)
            .map(|s| Self(s.into_bytes()))
            .map_err(|e| CryptoError::Canonicalization(e.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Canonicalize a value. Shorthand for [`CanonicalBytes::new`].
pub fn canonicalize(value: &impl Serialize) -> Result<CanonicalBytes, CryptoError> {
    CanonicalBytes::new(value)
}
