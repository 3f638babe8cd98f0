//! `.well-known` publication of a DID document and its certificate chain.

use std::path::{Path, PathBuf};

use gaiax_crypto::CertificateChain;

use crate::did::DID_DOCUMENT_FILE;
use crate::document::DidDocument;
use crate::error::IdentityError;

/// File name of the PEM chain referenced by `x5u`.
pub const CERTIFICATE_CHAIN_FILE: &str = "x509CertificateChain.pem";

/// Paths written by [`WellKnown::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFiles {
    pub did_document: PathBuf,
    pub certificate_chain: Option<PathBuf>,
}

/// A `.well-known` directory served under `https://<domain>/.well-known/`.
pub struct WellKnown;

impl WellKnown {
    /// URL of the certificate chain published for `domain`.
    pub fn certificate_chain_url(domain: &str) -> String {
        format!("https://{}/.well-known/{}", domain, CERTIFICATE_CHAIN_FILE)
    }

    /// Write `did.json` (and the PEM chain when given) into `dir`, creating it
    /// if needed. Existing files are replaced.
    pub fn publish(
        dir: &Path,
        document: &DidDocument,
        chain: Option<&CertificateChain>,
    ) -> Result<PublishedFiles, IdentityError> {
        document.validate()?;
        std::fs::create_dir_all(dir).map_err(|source| IdentityError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let did_document = dir.join(DID_DOCUMENT_FILE);
        document.save(&did_document)?;

        let certificate_chain = match chain {
            Some(chain) => {
                let path = dir.join(CERTIFICATE_CHAIN_FILE);
                std::fs::write(&path, chain.to_pem()).map_err(|source| IdentityError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Some(path)
            }
            None => None,
        };

        tracing::info!(
            dir = %dir.display(),
            did = %document.id,
            with_chain = certificate_chain.is_some(),
            "published .well-known files"
        );
        Ok(PublishedFiles {
            did_document,
            certificate_chain,
        })
    }
}
