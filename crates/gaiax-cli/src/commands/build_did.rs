//! `gaiax-sd build-did` — Build a `did:web` document from a certificate chain.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use gaiax_core::{Did, KeyType};
use gaiax_crypto::CertificateChain;
use gaiax_identity::{DidDocument, WellKnown};

#[derive(Args, Debug)]
pub struct BuildDidArgs {
    /// Type of key to use for the DID (rsa, ed25519).
    #[arg(long, default_value = "rsa")]
    pub key_type: KeyType,

    /// Path to save the generated DID document.
    #[arg(long, default_value = "./did.json")]
    pub did_output: PathBuf,

    /// Trust-anchor certificate chain (PEM, leaf first).
    #[arg(long)]
    pub cert: PathBuf,

    /// Domain of the `did:web` identifier. Defaults to the certificate's
    /// first DNS name.
    #[arg(long)]
    pub domain: Option<String>,

    /// URL of the published chain (`x5u`). Defaults to the `.well-known`
    /// location on the domain.
    #[arg(long)]
    pub x5u: Option<String>,
}

pub fn run(args: &BuildDidArgs) -> anyhow::Result<()> {
    println!("Building DID with key type '{}'...", args.key_type);
    let chain = CertificateChain::load(&args.cert)?;
    let found = chain.leaf().key_type()?;
    if found != args.key_type {
        anyhow::bail!(
            "certificate {} holds a {} key, expected {}",
            args.cert.display(),
            found,
            args.key_type
        );
    }

    let domain = match &args.domain {
        Some(domain) => domain.clone(),
        None => chain
            .leaf()
            .dns_names()
            .into_iter()
            .next()
            .context("certificate names no domain; pass --domain")?,
    };
    let x5u = args
        .x5u
        .clone()
        .unwrap_or_else(|| WellKnown::certificate_chain_url(&domain));
    let did = Did::web(&domain);
    let document = DidDocument::from_certificate_chain(&did, &chain, Some(x5u))?;
    document.save(&args.did_output)?;

    println!("DID: {}", did);
    for vm in &document.verification_method {
        println!("  Verification method: {}", vm.id);
    }
    println!("DID document saved at '{}'.", args.did_output.display());
    Ok(())
}
