//! `gaiax-sd get-cert` — Retrieve an issued certificate chain.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use gaiax_core::AssistantConfig;
use gaiax_gateway::{IssuanceClient, RetryPolicy};

use super::write_output;

#[derive(Args, Debug)]
pub struct GetCertArgs {
    /// ID of the certificate to retrieve.
    #[arg(long)]
    pub cert_id: String,

    /// URL of the server to fetch the certificate from. Defaults to
    /// `issuance.server_url` of the config.
    #[arg(long)]
    pub server_url: Option<String>,

    /// Where to save the chain. Defaults to `<cert-id>.cert.pem`.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

pub async fn run(args: &GetCertArgs, config: &AssistantConfig) -> anyhow::Result<()> {
    let server = args
        .server_url
        .as_deref()
        .or(config.issuance.server_url.as_deref())
        .context("no issuance server: pass --server-url or set issuance.server_url")?;

    println!("Fetching certificate '{}' from '{}'...", args.cert_id, server);
    let client = IssuanceClient::new(server, Duration::from_secs(config.gateway.timeout_secs))?
        .with_retry_policy(RetryPolicy::from_config(&config.gateway));
    let chain = client.fetch(&args.cert_id).await?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.cert.pem", args.cert_id)));
    write_output(&output, &chain.to_pem(), args.force)?;

    println!("Certificate retrieved:");
    println!("  Subject: {}", chain.leaf().subject());
    println!("  Issuer:  {}", chain.leaf().issuer());
    println!("  Chain:   {} certificate(s)", chain.len());
    println!("  Saved:   {}", output.display());
    Ok(())
}
