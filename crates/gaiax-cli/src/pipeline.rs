//! The `build-self-description` flow as an explicit sequence of typed steps:
//! extract → trust anchor → assemble → sign → conformity → persist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use gaiax_core::{AssistantConfig, Did, DocumentEvent, DocumentLifecycle, DocumentState, KeyType};
use gaiax_credentials::{
    extract_service, AnchorSource, CredentialAssembler, ProofSigner, SchemaRegistry,
    SelfDescriptionDocument, TrustAnchor,
};
use gaiax_crypto::{certificate_request, CertificateProfile, PrivateKey, TrustRoots};
use gaiax_gateway::{GatewayClient, GatewayTransport, IssuanceClient};
use gaiax_identity::{DidDocument, WellKnown};

/// Where the trust anchor comes from.
#[derive(Debug, Clone)]
pub enum AnchorInput {
    /// PEM certificate chain and private key supplied by the user.
    Files { cert: PathBuf, key: PathBuf },
    /// Generate a key and have a certificate for `domain` issued by `server`.
    Issue {
        server: String,
        domain: String,
        key_type: KeyType,
    },
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub api_spec: PathBuf,
    pub anchor: AnchorInput,
    /// Published DID document of the issuer; derived from the anchor when absent.
    pub did_document: Option<PathBuf>,
    /// Clearing-house instance to obtain a conformity credential from.
    pub conformity_instance: Option<String>,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub document: SelfDescriptionDocument,
    pub output: PathBuf,
    pub state: DocumentState,
    /// Trust-anchor warnings (self-signed, non-EV).
    pub warnings: Vec<String>,
}

pub struct SelfDescriptionPipeline<'a, T: GatewayTransport> {
    config: &'a AssistantConfig,
    registry: SchemaRegistry,
    gateway: GatewayClient<T>,
}

impl<'a, T: GatewayTransport> SelfDescriptionPipeline<'a, T> {
    pub fn new(config: &'a AssistantConfig, gateway: GatewayClient<T>) -> Self {
        Self {
            config,
            registry: SchemaRegistry::new(),
            gateway,
        }
    }

    pub fn gateway(&self) -> &GatewayClient<T> {
        &self.gateway
    }

    pub async fn run(&self, request: &BuildRequest) -> anyhow::Result<BuildOutcome> {
        let mut state = DocumentState::Draft;

        let descriptor = extract_service(&request.api_spec)?;
        let anchor = self.trust_anchor(&request.anchor, &request.output).await?;

        let roots = TrustRoots::load(&self.config.trust.roots)?;
        let report = anchor.ensure_trusted(&roots, self.config.trust.allow_self_signed, Utc::now())?;
        let warnings: Vec<String> = report.warnings.iter().map(ToString::to_string).collect();
        for warning in &warnings {
            tracing::warn!(warning = %warning, "trust anchor");
        }

        let did_document = match &request.did_document {
            Some(path) => DidDocument::load(path)?,
            None => {
                let domain = anchor
                    .domain()
                    .context("trust anchor certificate names no domain")?;
                DidDocument::from_certificate_chain(
                    &Did::web(&domain),
                    anchor.chain(),
                    Some(WellKnown::certificate_chain_url(&domain)),
                )?
            }
        };

        let assembler = CredentialAssembler::from_config(&self.registry, &self.config.schema)?;
        let document = assembler.assemble(&descriptor, &anchor, Some(&did_document))?;
        state = DocumentLifecycle::transition(state, DocumentEvent::Assemble)?;

        let verification_method = did_document
            .assertion_key()
            .with_context(|| format!("DID document {} has no assertion method", did_document.id))?;
        let mut signer = ProofSigner::new(&anchor);
        if let Some(alg) = &self.config.signing.algorithm {
            signer = signer.with_algorithm(alg)?;
        }
        let mut document = signer.sign(&document, verification_method, Utc::now())?;
        state = DocumentLifecycle::transition(state, DocumentEvent::Sign)?;

        if let Some(instance) = &request.conformity_instance {
            let record = self.gateway.submit(&document, instance).await?;
            document = document.with_conformity(record)?;
            state = DocumentLifecycle::transition(state, DocumentEvent::Enrich)?;
        }

        document.save_atomic(&request.output)?;
        state = DocumentLifecycle::transition(state, DocumentEvent::Persist)?;

        tracing::info!(
            id = %document.id,
            output = %request.output.display(),
            state = %state,
            "self-description written"
        );
        Ok(BuildOutcome {
            document,
            output: request.output.clone(),
            state,
            warnings,
        })
    }

    async fn trust_anchor(&self, input: &AnchorInput, output: &Path) -> anyhow::Result<TrustAnchor> {
        match input {
            AnchorInput::Files { cert, key } => Ok(TrustAnchor::load(cert, key)?),
            AnchorInput::Issue {
                server,
                domain,
                key_type,
            } => {
                let dir = output.parent().unwrap_or_else(|| Path::new("."));
                let key_path = dir.join(format!("{}.key.pem", domain));
                let cert_path = dir.join(format!("{}.cert.pem", domain));
                if let Some(existing) = [&key_path, &cert_path].into_iter().find(|p| p.exists()) {
                    anyhow::bail!(
                        "{} already exists; pass it with --trust-anchor-cert/--trust-anchor-key \
                         or move it away before requesting a new certificate",
                        existing.display()
                    );
                }

                let key = PrivateKey::generate(*key_type)?;
                let csr = certificate_request(&CertificateProfile::for_domain(domain), &key)?;
                let client = IssuanceClient::new(
                    server,
                    Duration::from_secs(self.config.gateway.timeout_secs),
                )?;
                let chain = client.request(&csr).await?;

                crate::commands::write_secret(&key_path, key.to_pkcs8_pem()?.as_str(), false)?;
                crate::commands::write_output(&cert_path, &chain.to_pem(), false)?;
                tracing::info!(
                    key = %key_path.display(),
                    cert = %cert_path.display(),
                    "stored issued trust anchor"
                );

                Ok(TrustAnchor::new(
                    chain,
                    key,
                    AnchorSource::Issued {
                        server: server.clone(),
                    },
                )?)
            }
        }
    }
}
