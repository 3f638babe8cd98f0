use std::collections::BTreeSet;
use std::path::Path;

use gaiax_core::{Did, DocumentEvent, DocumentLifecycle, DocumentState};
use gaiax_crypto::{canonicalize, integrity, verify_integrity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CredentialError;

pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const JWS_2020_CONTEXT: &str = "https://w3id.org/security/suites/jws-2020/v1";
pub const TRUST_FRAMEWORK_CONTEXT: &str =
    "https://registry.lab.gaia-x.eu/development/api/trusted-shape-registry/v1/shapes/jsonld/trustframework#";

pub const VERIFIABLE_CREDENTIAL_TYPE: &str = "VerifiableCredential";
pub const SERVICE_OFFERING_TYPE: &str = "gx:ServiceOffering";
pub const INTEGRITY_CLAIM: &str = "gx:integrity";

/// Linked-data proof attached by the proof signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: String,
    pub proof_purpose: String,
    pub verification_method: String,
    pub jws: String,
}

impl Proof {
    /// Proof options: every member except the signature value.
    pub fn options(&self) -> ProofOptions {
        ProofOptions {
            proof_type: self.proof_type.clone(),
            created: self.created.clone(),
            proof_purpose: self.proof_purpose.clone(),
            verification_method: self.verification_method.clone(),
        }
    }
}

/// The signed proof members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOptions {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: String,
    pub proof_purpose: String,
    pub verification_method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConformityStatus {
    Accepted,
    Rejected,
}

/// Outcome of a clearing-house compliance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConformityRecord {
    pub status: ConformityStatus,
    /// Identifier of the issuing clearing-house instance.
    pub instance: String,
    pub endpoint: String,
    /// Compliance credential returned by the clearing house.
    pub credential: Value,
}

impl ConformityRecord {
    pub fn accepted(instance: &str, endpoint: &str, credential: Value) -> Self {
        Self {
            status: ConformityStatus::Accepted,
            instance: instance.to_string(),
            endpoint: endpoint.to_string(),
            credential,
        }
    }

    /// Subjects of the compliance credential (object or array form).
    pub fn subjects(&self) -> Vec<&Value> {
        match self.credential.get("credentialSubject") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(subject @ Value::Object(_)) => vec![subject],
            _ => Vec::new(),
        }
    }

    /// `gx:integrity` of the first subject that carries one.
    pub fn integrity(&self) -> Option<&str> {
        self.subjects()
            .into_iter()
            .find_map(|s| s.get(INTEGRITY_CLAIM).and_then(Value::as_str))
    }

    /// Issuer of the compliance credential, in string or object form.
    pub fn issuer(&self) -> Option<&str> {
        match self.credential.get("issuer")? {
            Value::String(s) => Some(s),
            Value::Object(obj) => obj.get("id").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Gaia-X Self-Description: a JSON-LD verifiable credential whose subject is
/// a `gx:ServiceOffering`. Field order is fixed so serialization is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfDescriptionDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "@type")]
    pub types: Vec<String>,
    pub id: String,
    pub issuer: String,
    #[serde(
        rename = "issuanceDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub issuance_date: Option<String>,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conformity: Option<ConformityRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl SelfDescriptionDocument {
    /// Lifecycle state implied by the document contents.
    pub fn state(&self) -> DocumentState {
        match (&self.proof, &self.conformity) {
            (None, _) => DocumentState::Assembled,
            (Some(_), None) => DocumentState::Signed,
            (Some(_), Some(_)) => DocumentState::ConformityEnriched,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.proof.is_some()
    }

    /// The content covered by the proof: no proof, no conformity record.
    pub fn unsigned_content(&self) -> Self {
        Self {
            proof: None,
            conformity: None,
            ..self.clone()
        }
    }

    /// The signed document as submitted to a clearing house.
    pub fn signed_content(&self) -> Self {
        Self {
            conformity: None,
            ..self.clone()
        }
    }

    /// `sha256-<hex>` of the canonical signed content.
    pub fn integrity(&self) -> Result<String, CredentialError> {
        Ok(integrity(&canonicalize(&self.signed_content())?))
    }

    /// Merge a conformity record, returning the enriched document. The record
    /// must be accepted and its integrity binding must match this document;
    /// on any failure `self` is left untouched.
    pub fn with_conformity(&self, record: ConformityRecord) -> Result<Self, CredentialError> {
        DocumentLifecycle::transition(self.state(), DocumentEvent::Enrich)
            .map_err(|e| CredentialError::InvalidState(e.to_string()))?;
        if record.status != ConformityStatus::Accepted {
            return Err(CredentialError::ConformityRejected(format!(
                "instance '{}' did not accept the document",
                record.instance
            )));
        }
        let found = record.integrity().ok_or_else(|| {
            CredentialError::InvalidDocument(format!(
                "compliance credential has no '{}'",
                INTEGRITY_CLAIM
            ))
        })?;
        let canonical = canonicalize(&self.signed_content())?;
        if !verify_integrity(&canonical, found) {
            return Err(CredentialError::IntegrityMismatch {
                expected: integrity(&canonical),
                found: found.to_string(),
            });
        }
        Ok(Self {
            conformity: Some(record),
            ..self.clone()
        })
    }

    /// Every DID referenced by the document (issuer, proof, provider and
    /// compliance issuer), without duplicates.
    pub fn referenced_dids(&self) -> BTreeSet<String> {
        let mut refs = vec![self.issuer.clone()];
        if let Some(proof) = &self.proof {
            refs.push(proof.verification_method.clone());
        }
        if let Some(provider) = self.credential_subject.get("gx:providedBy") {
            match provider {
                Value::String(s) => refs.push(s.clone()),
                other => {
                    if let Some(id) = other.get("id").and_then(Value::as_str) {
                        refs.push(id.to_string());
                    }
                }
            }
        }
        if let Some(record) = &self.conformity {
            if let Some(issuer) = record.issuer() {
                refs.push(issuer.to_string());
            }
            if let Some(vm) = record
                .credential
                .pointer("/proof/verificationMethod")
                .and_then(Value::as_str)
            {
                refs.push(vm.to_string());
            }
        }
        refs.iter()
            .filter_map(|r| Did::from_url(r).ok())
            .map(|did| did.uri().to_string())
            .collect()
    }

    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        serde_json::from_str(json).map_err(|e| CredentialError::InvalidDocument(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, CredentialError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CredentialError::InvalidDocument(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let json = std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Write the document next to `path` under a temporary name, then rename
    /// it into place so readers never observe a partial file.
    pub fn save_atomic(&self, path: &Path) -> Result<(), CredentialError> {
        let io_err = |source: std::io::Error| CredentialError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "self_description.json".to_string());
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));
        std::fs::write(&tmp, self.to_json_pretty()?).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)
    }
}
