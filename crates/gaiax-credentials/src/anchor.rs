use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gaiax_core::KeyType;
use gaiax_crypto::{
    validate_chain, Certificate, CertificateChain, ChainReport, PrivateKey, PublicKey, TrustRoots,
};

use crate::error::CredentialError;

/// Where a trust anchor came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorSource {
    /// Certificate chain and key files given by the user.
    UserSupplied { cert_path: PathBuf, key_path: PathBuf },
    /// Obtained from a certificate issuance server.
    Issued { server: String },
}

/// A certificate chain (leaf first) together with the private key of the leaf.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    chain: CertificateChain,
    key: PrivateKey,
    source: AnchorSource,
}

impl TrustAnchor {
    /// Pair a chain with its leaf key. The key must be the one certified by
    /// the leaf certificate.
    pub fn new(
        chain: CertificateChain,
        key: PrivateKey,
        source: AnchorSource,
    ) -> Result<Self, CredentialError> {
        let certified = chain.leaf().public_key()?;
        if certified.key_type() != key.key_type() {
            return Err(CredentialError::KeyTypeMismatch {
                expected: certified.key_type(),
                found: key.key_type(),
            });
        }
        if certified != key.public_key() {
            return Err(CredentialError::AnchorMismatch(format!(
                "private key does not belong to certificate '{}'",
                chain.leaf().subject()
            )));
        }
        Ok(Self { chain, key, source })
    }

    /// Load a PEM certificate chain and PEM private key from files.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, CredentialError> {
        let chain = CertificateChain::load(cert_path)?;
        let key = PrivateKey::load(key_path)?;
        let anchor = Self::new(
            chain,
            key,
            AnchorSource::UserSupplied {
                cert_path: cert_path.to_path_buf(),
                key_path: key_path.to_path_buf(),
            },
        )?;
        tracing::info!(
            cert = %cert_path.display(),
            subject = %anchor.leaf().subject(),
            key_type = %anchor.key_type(),
            "loaded trust anchor"
        );
        Ok(anchor)
    }

    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    pub fn leaf(&self) -> &Certificate {
        self.chain.leaf()
    }

    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    pub fn source(&self) -> &AnchorSource {
        &self.source
    }

    pub fn key_type(&self) -> KeyType {
        self.key.key_type()
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    /// First DNS name of the leaf certificate.
    pub fn domain(&self) -> Option<String> {
        self.leaf().dns_names().into_iter().next()
    }

    /// Prove the chain resolves to one of `roots` at `at`. With
    /// `allow_self_signed`, a self-signed leaf counts as its own root.
    pub fn ensure_trusted(
        &self,
        roots: &TrustRoots,
        allow_self_signed: bool,
        at: DateTime<Utc>,
    ) -> Result<ChainReport, CredentialError> {
        let mut roots = roots.clone();
        if allow_self_signed && self.leaf().is_self_signed() {
            roots.add(self.leaf().clone());
        }
        validate_chain(&self.chain, &roots, at)
            .map_err(|e| CredentialError::UntrustedAnchor(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaiax_crypto::{generate_certificate, CertificateProfile};

    fn self_signed(seed: u8) -> (CertificateChain, PrivateKey) {
        let key = PrivateKey::ed25519_from_seed(&[seed; 32]);
        let cert =
            generate_certificate(&CertificateProfile::for_domain("provider.example"), &key, None)
                .unwrap();
        (CertificateChain::new(vec![cert]).unwrap(), key)
    }

    fn user_source() -> AnchorSource {
        AnchorSource::UserSupplied {
            cert_path: "cert.pem".into(),
            key_path: "key.pem".into(),
        }
    }

    #[test]
    fn test_matching_key_accepted() {
        let (chain, key) = self_signed(1);
        let anchor = TrustAnchor::new(chain, key, user_source()).unwrap();
        assert_eq!(anchor.key_type(), KeyType::Ed25519);
        assert_eq!(anchor.domain().as_deref(), Some("provider.example"));
    }

    #[test]
    fn test_other_key_same_type() {
        let (chain, _) = self_signed(1);
        let other = PrivateKey::ed25519_from_seed(&[2; 32]);
        assert!(matches!(
            TrustAnchor::new(chain, other, user_source()),
            Err(CredentialError::AnchorMismatch(_))
        ));
    }

    #[test]
    fn test_key_type_mismatch() {
        let (chain, _) = self_signed(1);
        let rsa = PrivateKey::generate(KeyType::Rsa).unwrap();
        assert!(matches!(
            TrustAnchor::new(chain, rsa, user_source()),
            Err(CredentialError::KeyTypeMismatch {
                expected: KeyType::Ed25519,
                found: KeyType::Rsa
            })
        ));
    }

    #[test]
    fn test_self_signed_trust_policy() {
        let (chain, key) = self_signed(3);
        let anchor = TrustAnchor::new(chain, key, user_source()).unwrap();
        let roots = TrustRoots::new();
        assert!(matches!(
            anchor.ensure_trusted(&roots, false, Utc::now()),
            Err(CredentialError::UntrustedAnchor(_))
        ));
        let report = anchor.ensure_trusted(&roots, true, Utc::now()).unwrap();
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let (chain, key) = self_signed(4);
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, chain.to_pem()).unwrap();
        std::fs::write(&key_path, key.to_pkcs8_pem().unwrap().as_str()).unwrap();

        let anchor = TrustAnchor::load(&cert_path, &key_path).unwrap();
        assert_eq!(anchor.public_key(), key.public_key());
        assert!(matches!(anchor.source(), AnchorSource::UserSupplied { .. }));
    }
}
