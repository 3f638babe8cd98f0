//! Shared fixtures for the cross-crate tests: self-signed parties with their
//! key material on disk, API specifications and an in-process clearing house.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use gaiax_core::Did;
use gaiax_credentials::document::CREDENTIALS_CONTEXT;
use gaiax_credentials::signer::PROOF_PURPOSE;
use gaiax_credentials::{signing_payload, AnchorSource, ProofOptions, SelfDescriptionDocument, TrustAnchor};
use gaiax_crypto::{
    generate_certificate, sign_detached, CertificateChain, CertificateProfile, PrivateKey,
    JWS_SIGNATURE_TYPE,
};
use gaiax_gateway::{GatewayError, GatewayTransport};
use gaiax_identity::{DidDocument, LocalDidResolver};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const MINIMAL_OPENAPI: &str = r#"
openapi: 3.0.3
info:
  title: Weather API
  version: "1.2.0"
  description: Hourly forecasts for European cities
servers:
  - url: https://api.provider.example/v1
paths: {}
"#;

/// A participant holding a self-signed Ed25519 trust anchor for `domain`.
pub struct Party {
    pub domain: String,
    pub anchor: TrustAnchor,
    pub did_document: DidDocument,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    dir: TempDir,
}

impl Party {
    pub fn new(domain: &str, seed: u8) -> Self {
        let dir = TempDir::new().unwrap();
        let key = PrivateKey::ed25519_from_seed(&[seed; 32]);
        let cert =
            generate_certificate(&CertificateProfile::for_domain(domain), &key, None).unwrap();
        let chain = CertificateChain::new(vec![cert]).unwrap();

        let cert_path = dir.path().join(format!("{}.cert.pem", domain));
        let key_path = dir.path().join(format!("{}.key.pem", domain));
        std::fs::write(&cert_path, chain.to_pem()).unwrap();
        std::fs::write(&key_path, key.to_pkcs8_pem().unwrap().as_str()).unwrap();

        let did_document =
            DidDocument::from_certificate_chain(&Did::web(domain), &chain, None).unwrap();
        let anchor = TrustAnchor::new(chain, key, AnchorSource::Issued {
            server: "https://issuer.example".into(),
        })
        .unwrap();
        Self {
            domain: domain.to_string(),
            anchor,
            did_document,
            cert_path,
            key_path,
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` next to the party's key material.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

/// Resolver that knows the DID documents of `parties`.
pub fn resolver_for(parties: &[&Party]) -> LocalDidResolver {
    let resolver = LocalDidResolver::new();
    for party in parties {
        resolver.insert(party.did_document.clone());
    }
    resolver
}

/// In-process clearing house: fails the first `failures` submissions with a
/// transient error, then issues a signed compliance credential bound to the
/// submitted document.
pub struct ClearingHouse {
    party: Party,
    failures: AtomicU32,
    calls: AtomicU32,
}

impl ClearingHouse {
    pub fn new(failures: u32) -> Self {
        Self {
            party: Party::new("compliance.example", 200),
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    pub fn party(&self) -> &Party {
        &self.party
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn issue(&self, document: &SelfDescriptionDocument) -> Result<Value, GatewayError> {
        let integrity = document
            .integrity()
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let mut credential = json!({
            "@context": [CREDENTIALS_CONTEXT],
            "type": ["VerifiableCredential"],
            "id": format!("https://{}/credentials/{}", self.party.domain, self.calls()),
            "issuer": self.party.did_document.id,
            "issuanceDate": Utc::now().to_rfc3339(),
            "credentialSubject": [{
                "type": "gx:compliance",
                "id": document.credential_subject["id"],
                "gx:integrity": integrity,
            }]
        });
        let options = ProofOptions {
            proof_type: JWS_SIGNATURE_TYPE.into(),
            created: Utc::now().to_rfc3339(),
            proof_purpose: PROOF_PURPOSE.into(),
            verification_method: self.party.did_document.assertion_key().unwrap().id.clone(),
        };
        let payload = signing_payload(&credential, &options)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let jws = sign_detached(self.party.anchor.key(), &payload)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        credential["proof"] = json!({
            "type": options.proof_type,
            "created": options.created,
            "proofPurpose": options.proof_purpose,
            "verificationMethod": options.verification_method,
            "jws": jws,
        });
        Ok(credential)
    }
}

#[async_trait]
impl GatewayTransport for ClearingHouse {
    async fn submit(&self, endpoint: &str, presentation: &Value) -> Result<Value, GatewayError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            tracing::debug!(attempt, endpoint, "clearing house timing out");
            return Err(GatewayError::Transient("request timed out".into()));
        }
        let document: SelfDescriptionDocument =
            serde_json::from_value(presentation["verifiableCredential"][0].clone())
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        self.issue(&document)
    }
}
