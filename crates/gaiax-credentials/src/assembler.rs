//! Credential Assembler: service descriptor + trust anchor to an unsigned
//! Self-Description.

use gaiax_core::{Did, SchemaConfig};
use gaiax_crypto::{canonicalize, sha256_hex};
use gaiax_identity::DidDocument;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::anchor::TrustAnchor;
use crate::descriptor::ServiceDescriptor;
use crate::document::SelfDescriptionDocument;
use crate::error::CredentialError;
use crate::schema::{SchemaProfile, SchemaRegistry};

pub const DEFAULT_POLICY: &str = "default: allow";
const DEFAULT_FORMAT_TYPE: &str = "application/json";

/// Builds unsigned Self-Descriptions for one schema profile. Assembly is
/// deterministic: the same inputs always yield the same bytes.
#[derive(Debug, Clone)]
pub struct CredentialAssembler {
    profile: SchemaProfile,
    policy: String,
    terms_and_conditions: Option<String>,
}

impl CredentialAssembler {
    pub fn new(profile: SchemaProfile) -> Self {
        Self {
            profile,
            policy: DEFAULT_POLICY.to_string(),
            terms_and_conditions: None,
        }
    }

    /// Resolve the configured profile and apply the configured policy and
    /// fallback terms and conditions.
    pub fn from_config(
        registry: &SchemaRegistry,
        config: &SchemaConfig,
    ) -> Result<Self, CredentialError> {
        let profile = registry.resolve(&config.profile, &config.required_claims)?;
        let mut assembler = Self::new(profile).with_policy(config.policy.clone());
        if let Some(url) = &config.terms_and_conditions {
            assembler = assembler.with_terms_and_conditions(url.clone());
        }
        Ok(assembler)
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    /// Terms-and-conditions URL used when the descriptor has none.
    pub fn with_terms_and_conditions(mut self, url: impl Into<String>) -> Self {
        self.terms_and_conditions = Some(url.into());
        self
    }

    pub fn profile(&self) -> &SchemaProfile {
        &self.profile
    }

    /// Assemble the unsigned document. The issuer is the DID of
    /// `did_document` when given, else `did:web:<domain>` of the anchor leaf.
    pub fn assemble(
        &self,
        descriptor: &ServiceDescriptor,
        anchor: &TrustAnchor,
        did_document: Option<&DidDocument>,
    ) -> Result<SelfDescriptionDocument, CredentialError> {
        let issuer = match did_document {
            Some(doc) => doc.did()?,
            None => anchor
                .domain()
                .map(|domain| Did::web(&domain))
                .ok_or_else(|| incomplete("issuer"))?,
        };

        let mut subject = self.subject(descriptor, &issuer)?;
        if let Some(claim) = self.profile.missing_claim(&subject) {
            return Err(incomplete(claim));
        }

        let canonical = canonicalize(&subject)?;
        let mut seed = issuer.uri().as_bytes().to_vec();
        seed.extend_from_slice(canonical.as_bytes());
        let id = format!("urn:uuid:{}", Uuid::new_v5(&Uuid::NAMESPACE_URL, &seed));
        if let Value::Object(map) = &mut subject {
            map.insert("id".into(), json!(format!("{}#subject", id)));
        }

        tracing::info!(
            id = %id,
            issuer = %issuer,
            service = %descriptor.name,
            profile = %self.profile.id,
            "assembled self-description"
        );

        Ok(SelfDescriptionDocument {
            context: self.profile.contexts.clone(),
            types: self.profile.types.clone(),
            id,
            issuer: issuer.uri().to_string(),
            issuance_date: None,
            credential_subject: subject,
            conformity: None,
            proof: None,
        })
    }

    fn subject(&self, descriptor: &ServiceDescriptor, issuer: &Did) -> Result<Value, CredentialError> {
        if descriptor.name.trim().is_empty() {
            return Err(incomplete("gx:name"));
        }
        if descriptor.endpoints.is_empty() {
            return Err(incomplete("gx:endpoint"));
        }

        let conformity = json!([{
            "gx:title": format!("{} {}", descriptor.api.kind, descriptor.api.version),
            "gx:standardReference": descriptor.api.standard_reference(),
            "gx:publisher": descriptor.api.publisher(),
        }]);
        let endpoints: Vec<Value> = descriptor
            .endpoints
            .iter()
            .map(|endpoint| {
                let mut entry = Map::new();
                entry.insert("gx:endpointURL".into(), json!(endpoint.url));
                if let Some(protocol) = &endpoint.protocol {
                    entry.insert("gx:protocol".into(), json!(protocol));
                }
                entry.insert("gx:standardConformity".into(), conformity.clone());
                Value::Object(entry)
            })
            .collect();

        let mut subject = Map::new();
        subject.insert("type".into(), json!(self.profile.subject_type));
        subject.insert("gx:name".into(), json!(descriptor.name));
        if let Some(description) = &descriptor.description {
            subject.insert("gx:description".into(), json!(description));
        }
        subject.insert("gx:version".into(), json!(descriptor.version));
        subject.insert("gx:providedBy".into(), json!({ "id": issuer.uri() }));
        subject.insert("gx:endpoint".into(), Value::Array(endpoints));

        let terms = descriptor
            .terms_of_service
            .as_ref()
            .or(self.terms_and_conditions.as_ref());
        if let Some(url) = terms {
            subject.insert(
                "gx:termsAndConditions".into(),
                json!({ "gx:URL": url, "gx:hash": sha256_hex(url.as_bytes()) }),
            );
        }
        if let Some(license) = &descriptor.license {
            subject.insert("gx:license".into(), json!(license));
        }
        subject.insert("gx:policy".into(), json!(self.policy));
        subject.insert(
            "gx:dataAccountExport".into(),
            json!({
                "gx:requestType": "API",
                "gx:accessType": "digital",
                "gx:formatType": descriptor
                    .content_types
                    .first()
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_FORMAT_TYPE),
            }),
        );
        Ok(Value::Object(subject))
    }
}

fn incomplete(claim: &str) -> CredentialError {
    CredentialError::IncompleteDescriptor {
        claim: claim.to_string(),
    }
}
