use std::sync::OnceLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{
    ConformityStatus, CREDENTIALS_CONTEXT, JWS_2020_CONTEXT, SERVICE_OFFERING_TYPE,
    TRUST_FRAMEWORK_CONTEXT, VERIFIABLE_CREDENTIAL_TYPE,
};
use crate::error::CredentialError;

/// Profile used when none is configured.
pub const DEFAULT_PROFILE: &str = "gx-22.10";

const DOCUMENT_SCHEMA: &str = include_str!("../schemas/self-description.schema.json");

/// Trust-framework constraints a Self-Description must satisfy: contexts,
/// types and mandatory credential-subject claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaProfile {
    /// Unique profile identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Trust framework release the profile pins.
    pub trust_framework: String,
    pub contexts: Vec<String>,
    pub types: Vec<String>,
    /// `type` of the credential subject.
    pub subject_type: String,
    /// Claims the credential subject must carry.
    pub required_claims: Vec<String>,
    pub description: String,
}

impl SchemaProfile {
    /// First required claim absent from `subject`.
    pub fn missing_claim<'a>(&'a self, subject: &Value) -> Option<&'a str> {
        self.required_claims
            .iter()
            .find(|claim| claim_missing(subject, claim))
            .map(String::as_str)
    }

    /// Check a document against the JSON Schema and this profile. Returns
    /// every failure found; an empty list means the document conforms.
    pub fn check_document(&self, document: &Value) -> Result<Vec<String>, CredentialError> {
        let mut failures: Vec<String> = document_validator()?
            .iter_errors(document)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();

        let contexts = string_array(document, "@context");
        for context in &self.contexts {
            if !contexts.contains(&context.as_str()) {
                failures.push(format!("@context: missing '{}'", context));
            }
        }
        let types = string_array(document, "@type");
        for ty in &self.types {
            if !types.contains(&ty.as_str()) {
                failures.push(format!("@type: missing '{}'", ty));
            }
        }

        if let Some(subject) = document.get("credentialSubject").filter(|s| s.is_object()) {
            if subject.get("type").and_then(Value::as_str) != Some(self.subject_type.as_str()) {
                failures.push(format!(
                    "/credentialSubject/type: expected '{}'",
                    self.subject_type
                ));
            }
            for claim in &self.required_claims {
                if claim_missing(subject, claim) {
                    failures.push(format!("/credentialSubject: missing claim '{}'", claim));
                }
            }
        }

        if let Some(status) = document.pointer("/conformity/status") {
            if serde_json::from_value::<ConformityStatus>(status.clone()).ok()
                != Some(ConformityStatus::Accepted)
            {
                failures.push("/conformity/status: conformity was not accepted".to_string());
            }
        }

        Ok(failures)
    }
}

fn string_array<'a>(document: &'a Value, key: &str) -> Vec<&'a str> {
    document
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn claim_missing(subject: &Value, claim: &str) -> bool {
    match subject.get(claim) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn document_validator() -> Result<&'static jsonschema::Validator, CredentialError> {
    static VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema: Value = serde_json::from_str(DOCUMENT_SCHEMA).map_err(|e| e.to_string())?;
            jsonschema::options()
                .with_draft(jsonschema::Draft::Draft7)
                .build(&schema)
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| CredentialError::InvalidSchema(e.clone()))
}

/// Registry of schema profiles.
pub struct SchemaRegistry {
    profiles: DashMap<String, SchemaProfile>,
}

impl SchemaRegistry {
    /// Create a new registry with built-in profiles.
    pub fn new() -> Self {
        let registry = Self {
            profiles: DashMap::new(),
        };
        registry.register_builtins();
        registry
    }

    /// Register built-in profiles.
    fn register_builtins(&self) {
        let base = SchemaProfile {
            id: DEFAULT_PROFILE.into(),
            name: "Gaia-X Service Offering (22.10)".into(),
            trust_framework: "22.10".into(),
            contexts: vec![
                CREDENTIALS_CONTEXT.into(),
                JWS_2020_CONTEXT.into(),
                TRUST_FRAMEWORK_CONTEXT.into(),
            ],
            types: vec![
                VERIFIABLE_CREDENTIAL_TYPE.into(),
                SERVICE_OFFERING_TYPE.into(),
            ],
            subject_type: SERVICE_OFFERING_TYPE.into(),
            required_claims: vec![
                "gx:providedBy".into(),
                "gx:name".into(),
                "gx:endpoint".into(),
                "gx:policy".into(),
                "gx:dataAccountExport".into(),
            ],
            description: "Service offering credential for Trust Framework 22.10".into(),
        };

        let mut strict = base.clone();
        strict.id = format!("{}-strict", DEFAULT_PROFILE);
        strict.name = "Gaia-X Service Offering (22.10, strict)".into();
        strict
            .required_claims
            .extend(["gx:termsAndConditions".into(), "gx:description".into()]);
        strict.description =
            "Service offering credential requiring terms and conditions and a description".into();

        self.profiles.insert(base.id.clone(), base);
        self.profiles.insert(strict.id.clone(), strict);
    }

    /// Register a custom profile.
    pub fn register(&self, profile: SchemaProfile) -> Result<(), CredentialError> {
        if profile.contexts.is_empty() || profile.required_claims.is_empty() {
            return Err(CredentialError::InvalidSchema(
                "profile must name at least one context and one required claim".into(),
            ));
        }
        self.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Get a profile by ID.
    pub fn get(&self, id: &str) -> Option<SchemaProfile> {
        self.profiles.get(id).map(|entry| entry.clone())
    }

    /// Get a profile by ID, adding extra required claims.
    pub fn resolve(&self, id: &str, extra_claims: &[String]) -> Result<SchemaProfile, CredentialError> {
        let mut profile = self
            .get(id)
            .ok_or_else(|| CredentialError::SchemaNotFound(id.to_string()))?;
        for claim in extra_claims {
            if !profile.required_claims.contains(claim) {
                profile.required_claims.push(claim.clone());
            }
        }
        Ok(profile)
    }

    /// List all profile IDs, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.profiles.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of registered profiles.
    pub fn count(&self) -> usize {
        self.profiles.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conforming() -> Value {
        json!({
            "@context": [CREDENTIALS_CONTEXT, JWS_2020_CONTEXT, TRUST_FRAMEWORK_CONTEXT],
            "@type": [VERIFIABLE_CREDENTIAL_TYPE, SERVICE_OFFERING_TYPE],
            "id": "urn:uuid:1",
            "issuer": "did:web:provider.example",
            "credentialSubject": {
                "type": SERVICE_OFFERING_TYPE,
                "gx:providedBy": {"id": "did:web:provider.example"},
                "gx:name": "svc",
                "gx:endpoint": [{"gx:endpointURL": "https://api.example.com"}],
                "gx:policy": "default: allow",
                "gx:dataAccountExport": {"gx:requestType": "API"}
            }
        })
    }

    #[test]
    fn test_builtin_profiles() {
        let registry = SchemaRegistry::new();
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.list(), vec!["gx-22.10", "gx-22.10-strict"]);
        let strict = registry.get("gx-22.10-strict").unwrap();
        assert!(strict
            .required_claims
            .contains(&"gx:termsAndConditions".to_string()));
    }

    #[test]
    fn test_conforming_document() {
        let profile = SchemaRegistry::new().get(DEFAULT_PROFILE).unwrap();
        assert!(profile.check_document(&conforming()).unwrap().is_empty());
    }

    #[test]
    fn test_strict_profile_reports_missing_claims() {
        let profile = SchemaRegistry::new().get("gx-22.10-strict").unwrap();
        let failures = profile.check_document(&conforming()).unwrap();
        assert_eq!(failures.len(), 2);
        assert!(failures[0].contains("gx:termsAndConditions"));
    }

    #[test]
    fn test_shape_violations() {
        let profile = SchemaRegistry::new().get(DEFAULT_PROFILE).unwrap();
        let mut doc = conforming();
        doc["issuer"] = json!("not a did");
        doc.as_object_mut().unwrap().remove("@type");
        let failures = profile.check_document(&doc).unwrap();
        assert!(failures.iter().any(|f| f.contains("/issuer")));
        assert!(failures.iter().any(|f| f.contains("@type")));
    }

    #[test]
    fn test_rejected_conformity_fails() {
        let profile = SchemaRegistry::new().get(DEFAULT_PROFILE).unwrap();
        let mut doc = conforming();
        doc["conformity"] = json!({
            "status": "rejected",
            "instance": "lab",
            "endpoint": "https://x",
            "credential": {"issuer": "did:web:x", "credentialSubject": {}}
        });
        let failures = profile.check_document(&doc).unwrap();
        assert_eq!(failures, vec!["/conformity/status: conformity was not accepted"]);
    }

    #[test]
    fn test_resolve_with_extra_claims() {
        let registry = SchemaRegistry::new();
        let profile = registry
            .resolve(DEFAULT_PROFILE, &["gx:keyword".to_string()])
            .unwrap();
        assert_eq!(profile.missing_claim(&conforming()["credentialSubject"]), Some("gx:keyword"));
        assert!(matches!(
            registry.resolve("unknown", &[]),
            Err(CredentialError::SchemaNotFound(_))
        ));
    }

    #[test]
    fn test_register_invalid_profile() {
        let registry = SchemaRegistry::new();
        let mut profile = registry.get(DEFAULT_PROFILE).unwrap();
        profile.id = "empty".into();
        profile.required_claims.clear();
        assert!(registry.register(profile).is_err());
    }
}
