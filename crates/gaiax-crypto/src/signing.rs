//! Detached JWS with unencoded payload (RFC 7515 + RFC 7797).
//!
//! The compact form is `<b64url(header)>..<b64url(signature)>`; the payload
//! is carried out of band and signed as raw bytes (`b64: false`).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use gaiax_core::KeyType;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

/// Linked-data proof type produced with these signatures.
pub const JWS_SIGNATURE_TYPE: &str = "JsonWebSignature2020";

/// Protected header of a detached JWS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    pub b64: bool,
    pub crit: Vec<String>,
}

impl JwsHeader {
    /// Header for an unencoded-payload signature with the suite of `key_type`.
    pub fn detached(key_type: KeyType) -> Self {
        Self {
            alg: key_type.jws_alg().to_string(),
            b64: false,
            crit: vec!["b64".to_string()],
        }
    }

    /// Decode the protected header of a compact detached JWS.
    pub fn from_jws(jws: &str) -> Result<Self, CryptoError> {
        let (encoded_header, _) = split_detached(jws)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded_header)
            .map_err(|e| CryptoError::InvalidJws(format!("header is not base64url: {}", e)))?;
        let header: Self = serde_json::from_slice(&bytes)
            .map_err(|e| CryptoError::InvalidJws(format!("header is not valid JSON: {}", e)))?;
        if header.b64 || !header.crit.iter().any(|c| c == "b64") {
            return Err(CryptoError::InvalidJws(
                "expected an unencoded payload (b64=false, crit=[b64])".into(),
            ));
        }
        Ok(header)
    }

    /// Key type required by the `alg` value.
    pub fn key_type(&self) -> Result<KeyType, CryptoError> {
        KeyType::from_jws_alg(&self.alg).map_err(|e| CryptoError::InvalidJws(e.to_string()))
    }

    fn encode(&self) -> Result<String, CryptoError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| CryptoError::InvalidJws(format!("header encoding failed: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

fn split_detached(jws: &str) -> Result<(&str, &str), CryptoError> {
    let mut parts = jws.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(""), Some(signature), None)
            if !header.is_empty() && !signature.is_empty() =>
        {
            Ok((header, signature))
        }
        _ => Err(CryptoError::InvalidJws(
            "expected detached compact form '<header>..<signature>'".into(),
        )),
    }
}

fn signing_input(encoded_header: &str, payload: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(encoded_header.len() + 1 + payload.len());
    input.extend_from_slice(encoded_header.as_bytes());
    input.push(b'.');
    input.extend_from_slice(payload);
    input
}

/// Sign `payload` and return the detached compact JWS.
pub fn sign_detached(key: &PrivateKey, payload: &[u8]) -> Result<String, CryptoError> {
    let encoded_header = JwsHeader::detached(key.key_type()).encode()?;
    let signature = key.sign(&signing_input(&encoded_header, payload))?;
    tracing::trace!(alg = key.key_type().jws_alg(), payload_len = payload.len(), "signed detached JWS");
    Ok(format!(
        "{}..{}",
        encoded_header,
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verify a detached compact JWS over `payload`. The header algorithm must
/// match the type of `key`.
pub fn verify_detached(jws: &str, payload: &[u8], key: &PublicKey) -> Result<(), CryptoError> {
    let header = JwsHeader::from_jws(jws)?;
    key.ensure_type(header.key_type()?)?;
    let (encoded_header, encoded_signature) = split_detached(jws)?;
    let signature = URL_SAFE_NO_PAD
        .decode(encoded_signature)
        .map_err(|e| CryptoError::InvalidJws(format!("signature is not base64url: {}", e)))?;
    key.verify(&signing_input(encoded_header, payload), &signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_roundtrip_ed25519() {
        let key = PrivateKey::ed25519_from_seed(&[11u8; 32]);
        let jws = sign_detached(&key, b"payload").unwrap();
        assert!(jws.contains(".."));
        assert!(verify_detached(&jws, b"payload", &key.public_key()).is_ok());
    }

    #[test]
    fn test_detached_tampered_payload() {
        let key = PrivateKey::ed25519_from_seed(&[11u8; 32]);
        let jws = sign_detached(&key, b"payload").unwrap();
        assert!(matches!(
            verify_detached(&jws, b"payloaD", &key.public_key()),
            Err(CryptoError::SignatureVerificationFailed)
        ));
    }

    #[test]
    fn test_header_contents() {
        let key = PrivateKey::ed25519_from_seed(&[11u8; 32]);
        let jws = sign_detached(&key, b"x").unwrap();
        let header = JwsHeader::from_jws(&jws).unwrap();
        assert_eq!(header, JwsHeader::detached(KeyType::Ed25519));
        assert_eq!(header.alg, "EdDSA");
    }

    #[test]
    fn test_algorithm_key_mismatch() {
        let signer = PrivateKey::ed25519_from_seed(&[11u8; 32]);
        let jws = sign_detached(&signer, b"x").unwrap();
        let rsa = PrivateKey::generate(KeyType::Rsa).unwrap();
        assert!(matches!(
            verify_detached(&jws, b"x", &rsa.public_key()),
            Err(CryptoError::KeyTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_attached_form_rejected() {
        assert!(JwsHeader::from_jws("aaa.bbb.ccc").is_err());
        assert!(JwsHeader::from_jws("aaa..").is_err());
        assert!(JwsHeader::from_jws("not-a-jws").is_err());
    }

    #[test]
    fn test_encoded_payload_header_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"EdDSA","b64":true,"crit":[]}"#);
        let jws = format!("{}..AAAA", header);
        assert!(JwsHeader::from_jws(&jws).is_err());
    }
}
