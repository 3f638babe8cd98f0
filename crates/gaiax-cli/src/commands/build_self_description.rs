//! `gaiax-sd build-self-description` — Generate a signed Self-Description
//! from an API specification.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use gaiax_core::{AssistantConfig, KeyType};
use gaiax_gateway::{GatewayClient, HttpTransport};

use crate::pipeline::{AnchorInput, BuildRequest, SelfDescriptionPipeline};

#[derive(Args, Debug)]
pub struct BuildSelfDescriptionArgs {
    /// Path to the OpenAPI or AsyncAPI specification.
    #[arg(long)]
    pub openapi_file: PathBuf,

    /// Path to save the generated Self-Description.
    #[arg(long, default_value = "./self_description.json")]
    pub output_file: PathBuf,

    /// Path to the trust anchor certificate chain. A certificate is issued
    /// automatically when not provided.
    #[arg(long, requires = "trust_anchor_key")]
    pub trust_anchor_cert: Option<PathBuf>,

    /// Path to the trust anchor private key.
    #[arg(long, requires = "trust_anchor_cert")]
    pub trust_anchor_key: Option<PathBuf>,

    /// Published DID document of the issuer. Derived from the trust anchor
    /// when not provided.
    #[arg(long)]
    pub did_document: Option<PathBuf>,

    /// Domain to request a certificate for when none is provided.
    #[arg(long)]
    pub domain: Option<String>,

    /// Key type of an automatically issued trust anchor (rsa, ed25519).
    #[arg(long, default_value = "rsa")]
    pub key_type: KeyType,

    /// Issuance server. Defaults to `issuance.server_url` of the config.
    #[arg(long)]
    pub issuance_server: Option<String>,

    /// Clearing-house instance (name from the config or URL). Defaults to
    /// `gateway.default_instance`.
    #[arg(long)]
    pub instance: Option<String>,

    /// Do not request a conformity credential.
    #[arg(long, conflicts_with = "instance")]
    pub skip_conformity: bool,
}

pub async fn run(args: &BuildSelfDescriptionArgs, config: &AssistantConfig) -> anyhow::Result<()> {
    println!("Parsing API specification at '{}'...", args.openapi_file.display());

    let anchor = match (&args.trust_anchor_cert, &args.trust_anchor_key) {
        (Some(cert), Some(key)) => {
            println!(
                "Using provided trust anchor certificate and key: {}, {}",
                cert.display(),
                key.display()
            );
            AnchorInput::Files {
                cert: cert.clone(),
                key: key.clone(),
            }
        }
        _ => {
            let server = args
                .issuance_server
                .clone()
                .or_else(|| config.issuance.server_url.clone())
                .context(
                    "no trust anchor given and no issuance server configured \
                     (pass --trust-anchor-cert/--trust-anchor-key or --issuance-server)",
                )?;
            let domain = args
                .domain
                .clone()
                .context("--domain is required to request a trust anchor certificate")?;
            println!("Requesting a trust anchor certificate for '{}' from '{}'...", domain, server);
            AnchorInput::Issue {
                server,
                domain,
                key_type: args.key_type,
            }
        }
    };

    let conformity_instance = if args.skip_conformity {
        None
    } else {
        Some(
            args.instance
                .clone()
                .unwrap_or_else(|| config.gateway.default_instance.clone()),
        )
    };

    let gateway = GatewayClient::new(HttpTransport::new(&config.gateway)?, config.gateway.clone());
    let pipeline = SelfDescriptionPipeline::new(config, gateway);
    let outcome = pipeline
        .run(&BuildRequest {
            api_spec: args.openapi_file.clone(),
            anchor,
            did_document: args.did_document.clone(),
            conformity_instance,
            output: args.output_file.clone(),
        })
        .await?;

    for warning in &outcome.warnings {
        println!("  Warning: {}", warning);
    }
    println!("Self-Description {} ({})", outcome.document.id, outcome.state);
    if let Some(record) = &outcome.document.conformity {
        println!("  Conformity: {} via {}", record.instance, record.endpoint);
    }
    println!("Self-Description saved at '{}'.", outcome.output.display());
    Ok(())
}
