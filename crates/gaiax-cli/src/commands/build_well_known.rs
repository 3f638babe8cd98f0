//! `gaiax-sd build-well-known` — Publish DID files into a `.well-known` directory.

use std::path::PathBuf;

use clap::Args;
use gaiax_crypto::CertificateChain;
use gaiax_identity::{DidDocument, WellKnown};

#[derive(Args, Debug)]
pub struct BuildWellKnownArgs {
    /// Directory to host the '.well-known' files.
    #[arg(long, default_value = "./.well-known")]
    pub well_known_dir: PathBuf,

    /// Path to the DID document to serve.
    #[arg(long, default_value = "./did.json")]
    pub did_document: PathBuf,

    /// Certificate chain (PEM) to publish next to the DID document.
    #[arg(long)]
    pub cert_chain: Option<PathBuf>,
}

pub fn run(args: &BuildWellKnownArgs) -> anyhow::Result<()> {
    println!(
        "Setting up '{}' with DID document '{}'...",
        args.well_known_dir.display(),
        args.did_document.display()
    );
    let document = DidDocument::load(&args.did_document)?;
    let chain = args
        .cert_chain
        .as_deref()
        .map(CertificateChain::load)
        .transpose()?;

    let published = WellKnown::publish(&args.well_known_dir, &document, chain.as_ref())?;
    println!("Published for {}:", document.id);
    println!("  {}", published.did_document.display());
    if let Some(path) = &published.certificate_chain {
        println!("  {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaiax_core::Did;
    use gaiax_crypto::{generate_certificate, CertificateProfile, PrivateKey};
    use tempfile::TempDir;

    #[test]
    fn test_publish_document_and_chain() {
        let dir = TempDir::new().unwrap();
        let key = PrivateKey::ed25519_from_seed(&[4; 32]);
        let cert =
            generate_certificate(&CertificateProfile::for_domain("provider.example"), &key, None)
                .unwrap();
        let chain = CertificateChain::new(vec![cert]).unwrap();
        let chain_path = dir.path().join("chain.pem");
        std::fs::write(&chain_path, chain.to_pem()).unwrap();
        let did_path = dir.path().join("did.json");
        DidDocument::from_certificate_chain(&Did::web("provider.example"), &chain, None)
            .unwrap()
            .save(&did_path)
            .unwrap();

        let args = BuildWellKnownArgs {
            well_known_dir: dir.path().join("site/.well-known"),
            did_document: did_path,
            cert_chain: Some(chain_path),
        };
        run(&args).unwrap();

        let published = DidDocument::load(&args.well_known_dir.join("did.json")).unwrap();
        assert_eq!(published.id, "did:web:provider.example");
        let served = CertificateChain::load(&args.well_known_dir.join("x509CertificateChain.pem"))
            .unwrap();
        assert_eq!(served.leaf().der(), chain.leaf().der());
    }
}
