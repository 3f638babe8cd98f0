//! `gaiax-sd prepare-cert` — Generate a trust-anchor key and certificate.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use gaiax_core::KeyType;
use gaiax_crypto::{
    certificate_request, generate_certificate, Certificate, CertificateChain, CertificateProfile,
    PrivateKey,
};

use super::{write_output, write_secret};

#[derive(Args, Debug)]
pub struct PrepareCertArgs {
    /// Name of the certificate to prepare: the domain it is issued for.
    #[arg(long)]
    pub cert_name: String,

    /// Directory to save the prepared key and certificate.
    #[arg(long, default_value = "./")]
    pub output_dir: PathBuf,

    /// Key type (rsa, ed25519).
    #[arg(long, default_value = "rsa")]
    pub key_type: KeyType,

    /// CA certificate (PEM) to issue from instead of self-signing.
    #[arg(long, requires = "ca_key")]
    pub ca_cert: Option<PathBuf>,

    /// Private key (PEM) of the CA certificate.
    #[arg(long, requires = "ca_cert")]
    pub ca_key: Option<PathBuf>,

    /// Also write a PKCS#10 signing request for an external CA.
    #[arg(long)]
    pub csr: bool,

    /// Overwrite existing files.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &PrepareCertArgs) -> anyhow::Result<()> {
    let profile = CertificateProfile::for_domain(&args.cert_name);
    let key = PrivateKey::generate(args.key_type)?;

    let issuer = match (&args.ca_cert, &args.ca_key) {
        (Some(cert), Some(key)) => {
            let chain = CertificateChain::load(cert)?;
            let ca_key = PrivateKey::load(key)?;
            Some((chain.leaf().clone(), ca_key))
        }
        _ => None,
    };
    let cert = generate_certificate(
        &profile,
        &key,
        issuer.as_ref().map(|(cert, key)| (cert, key)),
    )
    .with_context(|| format!("cannot generate certificate for {}", args.cert_name))?;

    let mut certs: Vec<Certificate> = vec![cert];
    if let Some((ca, _)) = issuer {
        certs.push(ca);
    }
    let chain = CertificateChain::new(certs)?;

    let key_path = args.output_dir.join(format!("{}.key.pem", args.cert_name));
    let cert_path = args.output_dir.join(format!("{}.cert.pem", args.cert_name));
    write_secret(&key_path, key.to_pkcs8_pem()?.as_str(), args.force)?;
    write_output(&cert_path, &chain.to_pem(), args.force)?;

    println!("Certificate '{}' prepared ({}):", args.cert_name, args.key_type);
    println!("  Key:         {}", key_path.display());
    println!("  Certificate: {}", cert_path.display());
    if chain.leaf().is_self_signed() {
        println!("  Note: self-signed; clearing houses expect a certificate from a trusted CA.");
    }

    if args.csr {
        let csr_path = args.output_dir.join(format!("{}.csr.pem", args.cert_name));
        write_output(&csr_path, &certificate_request(&profile, &key)?, args.force)?;
        println!("  CSR:         {}", csr_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(dir: &TempDir, name: &str) -> PrepareCertArgs {
        PrepareCertArgs {
            cert_name: name.into(),
            output_dir: dir.path().to_path_buf(),
            key_type: KeyType::Ed25519,
            ca_cert: None,
            ca_key: None,
            csr: false,
            force: false,
        }
    }

    #[test]
    fn test_self_signed_with_csr() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, "provider.example");
        args.csr = true;
        run(&args).unwrap();

        let chain = CertificateChain::load(&dir.path().join("provider.example.cert.pem")).unwrap();
        let key = PrivateKey::load(&dir.path().join("provider.example.key.pem")).unwrap();
        assert!(chain.leaf().is_self_signed());
        assert_eq!(chain.leaf().public_key().unwrap(), key.public_key());
        let csr = std::fs::read_to_string(dir.path().join("provider.example.csr.pem")).unwrap();
        assert!(csr.contains("CERTIFICATE REQUEST"));
    }

    #[test]
    fn test_issued_by_ca_appends_ca() {
        let dir = TempDir::new().unwrap();
        let ca_key = PrivateKey::ed25519_from_seed(&[9; 32]);
        let ca = generate_certificate(
            &CertificateProfile {
                common_name: "Test CA".into(),
                is_ca: true,
                ..Default::default()
            },
            &ca_key,
            None,
        )
        .unwrap();
        let ca_cert = dir.path().join("ca.pem");
        let ca_key_path = dir.path().join("ca.key.pem");
        std::fs::write(&ca_cert, ca.to_pem()).unwrap();
        std::fs::write(&ca_key_path, ca_key.to_pkcs8_pem().unwrap().as_str()).unwrap();

        let mut args = args(&dir, "provider.example");
        args.ca_cert = Some(ca_cert);
        args.ca_key = Some(ca_key_path);
        run(&args).unwrap();

        let chain = CertificateChain::load(&dir.path().join("provider.example.cert.pem")).unwrap();
        assert_eq!(chain.len(), 2);
        assert!(chain.leaf().is_issued_by(&ca));
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, "provider.example");
        run(&args).unwrap();
        assert!(run(&args).is_err());
        args.force = true;
        run(&args).unwrap();
    }
}
