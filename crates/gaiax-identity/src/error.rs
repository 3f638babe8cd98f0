use gaiax_core::CoreError;
use gaiax_crypto::{CertificateError, CryptoError};

/// Identity layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("DID not found: {0}")]
    DidNotFound(String),

    #[error("DID resolution failed: {0}")]
    DidResolution(String),

    #[error("unsupported DID method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid DID document: {0}")]
    InvalidDocument(String),

    #[error("verification method not found: {0}")]
    VerificationMethodNotFound(String),

    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),
}
