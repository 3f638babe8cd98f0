use std::path::Path;

use gaiax_core::{Did, KeyType};
use gaiax_crypto::{Certificate, CertificateChain, Jwk, PublicKey};
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";
pub const JWS_2020_CONTEXT: &str = "https://w3id.org/security/suites/jws-2020/v1";
pub const VERIFICATION_METHOD_TYPE: &str = "JsonWebKey2020";

/// A `JsonWebKey2020` verification method within a DID Document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// DID URL of the method (e.g., "did:web:example.com#JWK2020-RSA").
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    /// The DID that controls this verification method.
    pub controller: String,
    pub public_key_jwk: Jwk,
}

impl VerificationMethod {
    /// Conventional fragment for a trust-anchor key of the given type.
    pub fn fragment_for(key_type: KeyType) -> String {
        format!("JWK2020-{}", key_type)
    }

    pub fn public_key(&self) -> Result<PublicKey, IdentityError> {
        Ok(self.public_key_jwk.to_public_key()?)
    }

    pub fn key_type(&self) -> Result<KeyType, IdentityError> {
        Ok(self.public_key_jwk.key_type()?)
    }

    /// Certificate chain published in the JWK `x5c` member, if any.
    pub fn certificate_chain(&self) -> Result<Option<CertificateChain>, IdentityError> {
        let ders = self.public_key_jwk.x5c_der()?;
        if ders.is_empty() {
            return Ok(None);
        }
        let certs = ders
            .into_iter()
            .map(Certificate::from_der)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(CertificateChain::new(certs)?))
    }
}

/// W3C DID Document as published for `did:web`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default)]
    pub assertion_method: Vec<String>,
}

impl DidDocument {
    /// Create an empty document for `did`.
    pub fn new(did: &Did) -> Self {
        Self {
            context: vec![DID_CONTEXT.to_string(), JWS_2020_CONTEXT.to_string()],
            id: did.uri().to_string(),
            verification_method: Vec::new(),
            assertion_method: Vec::new(),
        }
    }

    /// Build a document whose single assertion key is the leaf key of
    /// `chain`, publishing the chain in `x5c` and optionally its URL in `x5u`.
    pub fn from_certificate_chain(
        did: &Did,
        chain: &CertificateChain,
        x5u: Option<String>,
    ) -> Result<Self, IdentityError> {
        let key = chain.leaf().public_key()?;
        let mut jwk =
            Jwk::from_public_key(&key).with_x5c(chain.certificates().iter().map(Certificate::der));
        if let Some(url) = x5u {
            jwk = jwk.with_x5u(url);
        }
        let mut doc = Self::new(did);
        doc.add_verification_method(&VerificationMethod::fragment_for(key.key_type()), jwk);
        tracing::debug!(did = %did, key_type = %key.key_type(), "built DID document");
        Ok(doc)
    }

    /// Add a verification method usable for assertions. Returns its id.
    pub fn add_verification_method(&mut self, fragment: &str, jwk: Jwk) -> String {
        let id = format!("{}#{}", self.id, fragment);
        self.verification_method.push(VerificationMethod {
            id: id.clone(),
            method_type: VERIFICATION_METHOD_TYPE.to_string(),
            controller: self.id.clone(),
            public_key_jwk: jwk,
        });
        self.assertion_method.push(id.clone());
        id
    }

    pub fn did(&self) -> Result<Did, IdentityError> {
        Ok(Did::new(self.id.as_str())?)
    }

    /// Look up a verification method by absolute DID URL or by `#fragment`.
    pub fn verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        let absolute = if id.starts_with('#') {
            format!("{}{}", self.id, id)
        } else {
            id.to_string()
        };
        self.verification_method.iter().find(|vm| {
            vm.id == absolute || (vm.id.starts_with('#') && format!("{}{}", self.id, vm.id) == absolute)
        })
    }

    /// Whether the verification method `id` is listed under `assertionMethod`.
    pub fn is_assertion_method(&self, id: &str) -> bool {
        let Some(vm) = self.verification_method(id) else {
            return false;
        };
        self.assertion_method
            .iter()
            .filter_map(|reference| self.verification_method(reference))
            .any(|authorised| authorised.id == vm.id)
    }

    /// The first verification method referenced by `assertionMethod`.
    pub fn assertion_key(&self) -> Option<&VerificationMethod> {
        self.assertion_method
            .iter()
            .find_map(|id| self.verification_method(id))
    }

    /// Check structural consistency: a valid DID, methods controlled by it
    /// and assertion references that exist.
    pub fn validate(&self) -> Result<(), IdentityError> {
        let did = self.did()?;
        for vm in &self.verification_method {
            if !vm.id.starts_with('#') && Did::from_url(&vm.id)? != did {
                return Err(IdentityError::InvalidDocument(format!(
                    "verification method {} does not belong to {}",
                    vm.id, did
                )));
            }
            vm.key_type()?;
        }
        for reference in &self.assertion_method {
            if self.verification_method(reference).is_none() {
                return Err(IdentityError::VerificationMethodNotFound(reference.clone()));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, IdentityError> {
        let doc: Self = serde_json::from_str(json)
            .map_err(|e| IdentityError::InvalidDocument(e.to_string()))?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> Result<String, IdentityError> {
        serde_json::to_string_pretty(self).map_err(|e| IdentityError::InvalidDocument(e.to_string()))
    }

    /// Load and validate a DID document from a JSON file.
    pub fn load(path: &Path) -> Result<Self, IdentityError> {
        let json = std::fs::read_to_string(path).map_err(|source| IdentityError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<(), IdentityError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| IdentityError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, self.to_json_pretty()?).map_err(|source| IdentityError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
