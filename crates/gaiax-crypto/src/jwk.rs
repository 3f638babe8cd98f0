//! JSON Web Key (RFC 7517) encoding of trust-anchor public keys.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use gaiax_core::KeyType;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::keys::PublicKey;

/// A public JWK with optional X.509 chain (`x5c`) and chain URL (`x5u`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Base64 (standard alphabet) DER certificates, leaf first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5u: Option<String>,
}

impl Jwk {
    /// Encode a public key. `alg` is set to the JWS algorithm bound to the key type.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let (crv, x, n, e) = match key {
            PublicKey::Ed25519(vk) => (
                Some("Ed25519".to_string()),
                Some(URL_SAFE_NO_PAD.encode(vk.as_bytes())),
                None,
                None,
            ),
            PublicKey::Rsa(pk) => (
                None,
                None,
                Some(URL_SAFE_NO_PAD.encode(pk.n().to_bytes_be())),
                Some(URL_SAFE_NO_PAD.encode(pk.e().to_bytes_be())),
            ),
        };
        Self {
            kty: key.key_type().jwk_kty().to_string(),
            crv,
            x,
            n,
            e,
            alg: Some(key.key_type().jws_alg().to_string()),
            x5c: None,
            x5u: None,
        }
    }

    /// Attach the DER certificate chain (leaf first).
    pub fn with_x5c<'a>(mut self, chain: impl IntoIterator<Item = &'a [u8]>) -> Self {
        self.x5c = Some(chain.into_iter().map(|der| STANDARD.encode(der)).collect());
        self
    }

    /// Attach the URL where the PEM chain is published.
    pub fn with_x5u(mut self, url: impl Into<String>) -> Self {
        self.x5u = Some(url.into());
        self
    }

    /// Key type declared by `kty` (and `crv` for OKP keys).
    pub fn key_type(&self) -> Result<KeyType, CryptoError> {
        match (self.kty.as_str(), self.crv.as_deref()) {
            ("OKP", Some("Ed25519")) => Ok(KeyType::Ed25519),
            ("OKP", crv) => Err(CryptoError::InvalidJwk(format!(
                "unsupported OKP curve: {}",
                crv.unwrap_or("<none>")
            ))),
            ("RSA", _) => Ok(KeyType::Rsa),
            (kty, _) => Err(CryptoError::InvalidJwk(format!("unsupported kty: {}", kty))),
        }
    }

    /// Decode into a public key.
    pub fn to_public_key(&self) -> Result<PublicKey, CryptoError> {
        match self.key_type()? {
            KeyType::Ed25519 => {
                let x = self.member("x", self.x.as_deref())?;
                PublicKey::ed25519_from_bytes(&x)
            }
            KeyType::Rsa => {
                let n = self.member("n", self.n.as_deref())?;
                let e = self.member("e", self.e.as_deref())?;
                RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
                    .map(PublicKey::Rsa)
                    .map_err(|e| CryptoError::InvalidJwk(format!("invalid RSA key: {}", e)))
            }
        }
    }

    /// Decode the `x5c` chain into DER certificates.
    pub fn x5c_der(&self) -> Result<Vec<Vec<u8>>, CryptoError> {
        self.x5c
            .iter()
            .flatten()
            .map(|cert| {
                STANDARD
                    .decode(cert)
                    .map_err(|e| CryptoError::InvalidJwk(format!("invalid x5c entry: {}", e)))
            })
            .collect()
    }

    fn member(&self, name: &str, value: Option<&str>) -> Result<Vec<u8>, CryptoError> {
        let value =
            value.ok_or_else(|| CryptoError::InvalidJwk(format!("missing '{}' member", name)))?;
        URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| CryptoError::InvalidJwk(format!("invalid '{}' member: {}", name, e)))
    }
}
