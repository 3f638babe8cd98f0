//! Validator: schema, DID resolution, certificate-chain and proof checks on
//! Self-Description files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gaiax_crypto::{validate_chain, verify_detached, TrustRoots};
use gaiax_identity::{DidDocument, DidResolver, VerificationMethod};
use serde_json::Value;

use crate::document::{Proof, SelfDescriptionDocument};
use crate::error::CredentialError;
use crate::schema::SchemaProfile;
use crate::signer::{signing_payload, verify_proof, PROOF_PURPOSE};

pub const CHECK_SCHEMA: &str = "schema";
pub const CHECK_DID_RESOLUTION: &str = "did_resolution";
pub const CHECK_CERTIFICATE_CHAIN: &str = "certificate_chain";
pub const CHECK_PROOF: &str = "proof";

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Passed,
    Failed(Vec<String>),
    Skipped(String),
}

/// An individual validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    pub status: CheckStatus,
}

impl CheckResult {
    fn from_failures(name: &str, failures: Vec<String>) -> Self {
        let status = if failures.is_empty() {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed(failures)
        };
        Self {
            name: name.to_string(),
            status,
        }
    }

    fn skipped(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Skipped(reason.into()),
        }
    }

    pub fn passed(&self) -> bool {
        !matches!(self.status, CheckStatus::Failed(_))
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            CheckStatus::Passed => write!(f, "{}: passed", self.name),
            CheckStatus::Skipped(reason) => write!(f, "{}: skipped ({})", self.name, reason),
            CheckStatus::Failed(failures) => {
                write!(f, "{}: failed", self.name)?;
                for failure in failures {
                    write!(f, "\n  - {}", failure)?;
                }
                Ok(())
            }
        }
    }
}

/// Result of validating one document.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub checks: Vec<CheckResult>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether no check failed. Skipped checks do not count as failures.
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(CheckResult::passed)
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Every failure, prefixed with its check name.
    pub fn failures(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter_map(|c| match &c.status {
                CheckStatus::Failed(failures) => Some(
                    failures
                        .iter()
                        .map(|f| format!("{}: {}", c.name, f))
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// A proof found in a document: the Self-Description's own proof or the
/// one carried by its compliance credential.
struct EmbeddedProof {
    label: &'static str,
    proof: Proof,
    /// Signed content of a compliance credential, without its proof.
    content: Option<Value>,
}

/// Validates Self-Descriptions. Holds only read-only state, so one validator
/// can serve concurrent validations.
pub struct Validator {
    profile: SchemaProfile,
    resolver: Arc<dyn DidResolver>,
    roots: TrustRoots,
    allow_self_signed: bool,
    at: Option<DateTime<Utc>>,
}

impl Validator {
    pub fn new(profile: SchemaProfile, resolver: Arc<dyn DidResolver>, roots: TrustRoots) -> Self {
        Self {
            profile,
            resolver,
            roots,
            allow_self_signed: false,
            at: None,
        }
    }

    /// Accept self-signed leaf certificates as their own trust root.
    pub fn allow_self_signed(mut self, allow: bool) -> Self {
        self.allow_self_signed = allow;
        self
    }

    /// Check certificate validity at a fixed time instead of now.
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    /// Read and validate a document file. Errors only when the file cannot
    /// be read or is not JSON.
    pub async fn validate_file(&self, path: &Path) -> Result<ValidationReport, CredentialError> {
        let content = read_document(path)?;
        let json: Value = serde_json::from_str(&content).map_err(|e| {
            CredentialError::InvalidDocument(format!("{}: {}", path.display(), e))
        })?;
        let report = self.validate(&json).await;
        tracing::info!(
            path = %path.display(),
            valid = report.is_valid(),
            warnings = report.warnings.len(),
            "validated credential file"
        );
        Ok(report)
    }

    /// Validate several files concurrently, preserving input order.
    pub async fn validate_files(
        &self,
        paths: &[PathBuf],
    ) -> Vec<(PathBuf, Result<ValidationReport, CredentialError>)> {
        let reports =
            futures::future::join_all(paths.iter().map(|path| self.validate_file(path))).await;
        paths.iter().cloned().zip(reports).collect()
    }

    /// Run every check on `document`. Validation failures are reported, not
    /// returned as errors.
    pub async fn validate(&self, document: &Value) -> ValidationReport {
        let mut report = ValidationReport::default();

        report.checks.push(match self.profile.check_document(document) {
            Ok(failures) => CheckResult::from_failures(CHECK_SCHEMA, failures),
            Err(e) => CheckResult::from_failures(CHECK_SCHEMA, vec![e.to_string()]),
        });

        let parsed: SelfDescriptionDocument = match serde_json::from_value(document.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                let reason = format!("document could not be parsed: {}", e);
                for name in [CHECK_DID_RESOLUTION, CHECK_CERTIFICATE_CHAIN, CHECK_PROOF] {
                    report.checks.push(CheckResult::skipped(name, reason.clone()));
                }
                return report;
            }
        };
        let proofs = embedded_proofs(&parsed);

        let (resolved, failures) = self.resolve_dids(&parsed, &proofs).await;
        report
            .checks
            .push(CheckResult::from_failures(CHECK_DID_RESOLUTION, failures));

        if proofs.is_empty() {
            report
                .checks
                .push(CheckResult::skipped(CHECK_CERTIFICATE_CHAIN, "document is not signed"));
        } else {
            let mut failures = Vec::new();
            for embedded in &proofs {
                match lookup(&resolved, &embedded.proof.verification_method) {
                    Some(vm) => self.check_chain(embedded.label, vm, &mut failures, &mut report.warnings),
                    None => failures.push(format!(
                        "{}: verification method {} is unavailable",
                        embedded.label, embedded.proof.verification_method
                    )),
                }
            }
            report
                .checks
                .push(CheckResult::from_failures(CHECK_CERTIFICATE_CHAIN, failures));
        }

        report.checks.push(self.check_proofs(&parsed, &proofs, &resolved));

        for check in &report.checks {
            tracing::debug!(check = %check.name, passed = check.passed(), "validation check");
        }
        report
    }

    async fn resolve_dids(
        &self,
        document: &SelfDescriptionDocument,
        proofs: &[EmbeddedProof],
    ) -> (BTreeMap<String, DidDocument>, Vec<String>) {
        let mut resolved = BTreeMap::new();
        let mut failures = Vec::new();
        for did in document.referenced_dids() {
            match self.resolver.resolve(&did).await {
                Ok(did_document) => {
                    resolved.insert(did, did_document);
                }
                Err(e) => failures.push(format!("cannot resolve {}: {}", did, e)),
            }
        }
        for embedded in proofs {
            let vm = &embedded.proof.verification_method;
            let did = vm.split('#').next().unwrap_or_default();
            if let Some(did_document) = resolved.get(did) {
                if did_document.verification_method(vm).is_none() {
                    failures.push(format!(
                        "verification method {} not found in DID document of {}",
                        vm, did
                    ));
                } else if !did_document.is_assertion_method(vm) {
                    failures.push(format!(
                        "verification method {} is not an assertion method of {}",
                        vm, did
                    ));
                }
            }
        }
        (resolved, failures)
    }

    fn check_chain(
        &self,
        label: &str,
        vm: &VerificationMethod,
        failures: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let chain = match vm.certificate_chain() {
            Ok(Some(chain)) => chain,
            Ok(None) => {
                failures.push(format!("{}: {} publishes no x5c certificate chain", label, vm.id));
                return;
            }
            Err(e) => {
                failures.push(format!("{}: {}", label, e));
                return;
            }
        };
        match (chain.leaf().public_key(), vm.public_key()) {
            (Ok(certified), Ok(published)) if certified == published => {}
            (Ok(_), Ok(_)) => failures.push(format!(
                "{}: leaf certificate key differs from the key of {}",
                label, vm.id
            )),
            (Err(e), _) => failures.push(format!("{}: {}", label, e)),
            (_, Err(e)) => failures.push(format!("{}: {}", label, e)),
        }

        let mut roots = self.roots.clone();
        if self.allow_self_signed && chain.leaf().is_self_signed() {
            roots.add(chain.leaf().clone());
        }
        match validate_chain(&chain, &roots, self.at.unwrap_or_else(Utc::now)) {
            Ok(chain_report) => warnings.extend(
                chain_report
                    .warnings
                    .iter()
                    .map(|w| format!("{}: {}", label, w)),
            ),
            Err(e) => failures.push(format!("{}: {}", label, e)),
        }
    }

    fn check_proofs(
        &self,
        document: &SelfDescriptionDocument,
        proofs: &[EmbeddedProof],
        resolved: &BTreeMap<String, DidDocument>,
    ) -> CheckResult {
        if proofs.is_empty() {
            return CheckResult::skipped(CHECK_PROOF, "document is not signed");
        }
        let mut failures = Vec::new();
        for embedded in proofs {
            if embedded.proof.proof_purpose != PROOF_PURPOSE {
                failures.push(format!(
                    "{}: proof purpose '{}' is not '{}'",
                    embedded.label, embedded.proof.proof_purpose, PROOF_PURPOSE
                ));
                continue;
            }
            if !is_authorised(resolved, &embedded.proof.verification_method) {
                failures.push(format!(
                    "{}: {} is not authorised for {}",
                    embedded.label, embedded.proof.verification_method, PROOF_PURPOSE
                ));
                continue;
            }
            let key = match lookup(resolved, &embedded.proof.verification_method)
                .map(VerificationMethod::public_key)
            {
                Some(Ok(key)) => key,
                Some(Err(e)) => {
                    failures.push(format!("{}: {}", embedded.label, e));
                    continue;
                }
                None => {
                    failures.push(format!(
                        "{}: verification method {} is unavailable",
                        embedded.label, embedded.proof.verification_method
                    ));
                    continue;
                }
            };
            let verified = match &embedded.content {
                None => verify_proof(document, &key),
                Some(content) => signing_payload(content, &embedded.proof.options()).and_then(
                    |payload| verify_detached(&embedded.proof.jws, &payload, &key).map_err(Into::into),
                ),
            };
            if let Err(e) = verified {
                failures.push(format!("{}: {}", embedded.label, e));
            }
        }

        if let Some(record) = &document.conformity {
            match (record.integrity(), document.integrity()) {
                (Some(found), Ok(expected)) if found.eq_ignore_ascii_case(&expected) => {}
                (Some(found), Ok(expected)) => failures.push(format!(
                    "compliance credential integrity {} does not match document integrity {}",
                    found, expected
                )),
                (None, _) => {
                    failures.push("compliance credential carries no gx:integrity".to_string())
                }
                (_, Err(e)) => failures.push(e.to_string()),
            }
        }
        CheckResult::from_failures(CHECK_PROOF, failures)
    }
}

const SELF_DESCRIPTION: &str = "self-description";
const COMPLIANCE_CREDENTIAL: &str = "compliance credential";

fn embedded_proofs(document: &SelfDescriptionDocument) -> Vec<EmbeddedProof> {
    let mut proofs = Vec::new();
    if let Some(proof) = &document.proof {
        proofs.push(EmbeddedProof {
            label: SELF_DESCRIPTION,
            proof: proof.clone(),
            content: None,
        });
    }
    if let Some(record) = &document.conformity {
        let mut content = record.credential.clone();
        let proof = content
            .as_object_mut()
            .and_then(|obj| obj.remove("proof"))
            .and_then(|p| serde_json::from_value::<Proof>(p).ok());
        if let Some(proof) = proof {
            proofs.push(EmbeddedProof {
                label: COMPLIANCE_CREDENTIAL,
                proof,
                content: Some(content),
            });
        }
    }
    proofs
}

fn lookup<'a>(
    resolved: &'a BTreeMap<String, DidDocument>,
    verification_method: &str,
) -> Option<&'a VerificationMethod> {
    let did = verification_method.split('#').next()?;
    resolved.get(did)?.verification_method(verification_method)
}

/// Whether the DID controller lists `verification_method` as an assertion key.
fn is_authorised(resolved: &BTreeMap<String, DidDocument>, verification_method: &str) -> bool {
    verification_method
        .split('#')
        .next()
        .and_then(|did| resolved.get(did))
        .is_some_and(|doc| doc.is_assertion_method(verification_method))
}

fn read_document(path: &Path) -> Result<String, CredentialError> {
    std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
        path: path.display().to_string(),
        source,
    })
}
