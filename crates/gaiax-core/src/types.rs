use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// W3C Decentralized Identifier.
/// Format: `did:<method>:<method-specific-id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse a DID from a full URI string. DID URLs (with `#fragment`,
    /// `?query` or `/path`) are rejected; use [`Did::from_url`] for those.
    pub fn new(uri: impl Into<String>) -> Result<Self, CoreError> {
        let uri = uri.into();
        let mut parts = uri.splitn(3, ':');
        let scheme = parts.next().unwrap_or_default();
        let method = parts.next().unwrap_or_default();
        let identifier = parts.next().unwrap_or_default();

        if scheme != "did" {
            return Err(CoreError::InvalidDid(format!(
                "DID must start with 'did:', got: {}",
                uri
            )));
        }
        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(CoreError::InvalidDid(format!(
                "DID method must be lowercase alphanumeric, got: {}",
                uri
            )));
        }
        if identifier.is_empty() || identifier.contains(['#', '?', '/']) {
            return Err(CoreError::InvalidDid(format!(
                "DID must have format 'did:<method>:<identifier>', got: {}",
                uri
            )));
        }
        Ok(Self(uri))
    }

    /// Extract the DID from a DID URL such as `did:web:example.com#key-1`.
    pub fn from_url(did_url: &str) -> Result<Self, CoreError> {
        let end = did_url.find(['#', '?', '/']).unwrap_or(did_url.len());
        Self::new(&did_url[..end])
    }

    /// Build a `did:web` identifier for a domain. A port separator is
    /// percent-encoded as required by the method.
    pub fn web(domain: &str) -> Self {
        Self(format!("did:web:{}", domain.replace(':', "%3A")))
    }

    /// Get the full DID URI.
    pub fn uri(&self) -> &str {
        &self.0
    }

    /// Extract the method (web, key, ...).
    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    /// Extract the method-specific identifier.
    pub fn identifier(&self) -> &str {
        self.0.splitn(3, ':').nth(2).unwrap_or_default()
    }

    /// Build a DID URL pointing at a fragment of this DID's document.
    pub fn with_fragment(&self, fragment: &str) -> String {
        format!("{}#{}", self.0, fragment)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Did {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Key types a trust anchor may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    /// Ed25519 (EdDSA signatures).
    Ed25519,
    /// RSA (RSASSA-PKCS1-v1_5 with SHA-256).
    Rsa,
}

impl KeyType {
    /// JWK `kty` value for this key type.
    pub fn jwk_kty(&self) -> &'static str {
        match self {
            Self::Ed25519 => "OKP",
            Self::Rsa => "RSA",
        }
    }

    /// JWS `alg` value of the signature suite bound to this key type.
    pub fn jws_alg(&self) -> &'static str {
        match self {
            Self::Ed25519 => "EdDSA",
            Self::Rsa => "RS256",
        }
    }

    /// Key type that a JWS `alg` value requires.
    pub fn from_jws_alg(alg: &str) -> Result<Self, CoreError> {
        match alg {
            "EdDSA" => Ok(Self::Ed25519),
            "RS256" => Ok(Self::Rsa),
            other => Err(CoreError::UnsupportedKeyType(format!(
                "unsupported JWS algorithm: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "Ed25519"),
            Self::Rsa => write!(f, "RSA"),
        }
    }
}

impl FromStr for KeyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" | "eddsa" | "okp" => Ok(Self::Ed25519),
            "rsa" | "rs256" => Ok(Self::Rsa),
            other => Err(CoreError::UnsupportedKeyType(other.to_string())),
        }
    }
}
