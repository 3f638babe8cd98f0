//! Proof Signer: attaches a `JsonWebSignature2020` proof made with the
//! trust-anchor key.

use chrono::{DateTime, SecondsFormat, Utc};
use gaiax_core::{DocumentEvent, DocumentLifecycle, KeyType};
use gaiax_crypto::{canonicalize, sha256, sign_detached, verify_detached, PublicKey, JWS_SIGNATURE_TYPE};
use gaiax_identity::VerificationMethod;
use serde::Serialize;

use crate::anchor::TrustAnchor;
use crate::document::{Proof, ProofOptions, SelfDescriptionDocument};
use crate::error::CredentialError;

pub const PROOF_PURPOSE: &str = "assertionMethod";

/// Signs assembled documents with the key of a trust anchor.
pub struct ProofSigner<'a> {
    anchor: &'a TrustAnchor,
    algorithm: Option<KeyType>,
}

impl<'a> ProofSigner<'a> {
    pub fn new(anchor: &'a TrustAnchor) -> Self {
        Self {
            anchor,
            algorithm: None,
        }
    }

    /// Require a JWS algorithm (`EdDSA` or `RS256`). Signing fails when the
    /// anchor key cannot produce it.
    pub fn with_algorithm(mut self, alg: &str) -> Result<Self, CredentialError> {
        self.algorithm = Some(KeyType::from_jws_alg(alg)?);
        Ok(self)
    }

    /// Sign `document`, returning the signed copy with `issuanceDate` and
    /// `proof` set to `created`. `verification_method` must publish the
    /// anchor's public key.
    pub fn sign(
        &self,
        document: &SelfDescriptionDocument,
        verification_method: &VerificationMethod,
        created: DateTime<Utc>,
    ) -> Result<SelfDescriptionDocument, CredentialError> {
        DocumentLifecycle::transition(document.state(), DocumentEvent::Sign)
            .map_err(|e| CredentialError::InvalidState(e.to_string()))?;

        let key_type = self.anchor.key_type();
        if let Some(expected) = self.algorithm.filter(|alg| *alg != key_type) {
            return Err(CredentialError::KeyTypeMismatch {
                expected,
                found: key_type,
            });
        }
        let method_type = verification_method
            .key_type()
            .map_err(|e| CredentialError::Signing(e.to_string()))?;
        if method_type != key_type {
            return Err(CredentialError::KeyTypeMismatch {
                expected: method_type,
                found: key_type,
            });
        }
        let published = verification_method
            .public_key()
            .map_err(|e| CredentialError::Signing(e.to_string()))?;
        if published != self.anchor.public_key() {
            return Err(CredentialError::Signing(format!(
                "verification method {} does not publish the trust anchor key",
                verification_method.id
            )));
        }

        let created = created.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut signed = document.clone();
        signed.issuance_date = Some(created.clone());
        let options = ProofOptions {
            proof_type: JWS_SIGNATURE_TYPE.to_string(),
            created,
            proof_purpose: PROOF_PURPOSE.to_string(),
            verification_method: verification_method.id.clone(),
        };
        let payload = signing_payload(&signed.unsigned_content(), &options)?;
        let jws = sign_detached(self.anchor.key(), &payload)
            .map_err(|e| CredentialError::Signing(e.to_string()))?;

        tracing::info!(
            id = %signed.id,
            verification_method = %options.verification_method,
            alg = key_type.jws_alg(),
            "signed self-description"
        );

        signed.proof = Some(Proof {
            proof_type: options.proof_type,
            created: options.created,
            proof_purpose: options.proof_purpose,
            verification_method: options.verification_method,
            jws,
        });
        Ok(signed)
    }
}

/// Bytes covered by a proof signature: `sha256(JCS(options)) ||
/// sha256(JCS(content))`, where `content` is the credential without its
/// proof (and, for Self-Descriptions, without the conformity record).
pub fn signing_payload(
    content: &impl Serialize,
    options: &ProofOptions,
) -> Result<Vec<u8>, CredentialError> {
    let mut payload = sha256(canonicalize(options)?.as_bytes()).to_vec();
    payload.extend_from_slice(&sha256(canonicalize(content)?.as_bytes()));
    Ok(payload)
}

/// Verify the document proof against `key`.
pub fn verify_proof(
    document: &SelfDescriptionDocument,
    key: &PublicKey,
) -> Result<(), CredentialError> {
    let proof = document
        .proof
        .as_ref()
        .ok_or_else(|| CredentialError::InvalidDocument("document has no proof".into()))?;
    let payload = signing_payload(&document.unsigned_content(), &proof.options())?;
    verify_detached(&proof.jws, &payload, key)?;
    Ok(())
}
