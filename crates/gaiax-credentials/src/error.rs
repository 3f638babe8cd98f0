use gaiax_core::{CoreError, KeyType};
use gaiax_crypto::{CertificateError, CryptoError};
use gaiax_identity::IdentityError;

/// API specification extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid YAML/JSON: {reason}")]
    Parse { path: String, reason: String },

    #[error("{path}: missing or invalid field '{field}'")]
    Schema { path: String, field: String },
}

/// Self-Description assembly, signing and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("incomplete service descriptor: cannot derive mandatory claim '{claim}'")]
    IncompleteDescriptor { claim: String },

    #[error("key type mismatch: expected {expected}, found {found}")]
    KeyTypeMismatch { expected: KeyType, found: KeyType },

    #[error("trust anchor mismatch: {0}")]
    AnchorMismatch(String),

    #[error("untrusted trust anchor: {0}")]
    UntrustedAnchor(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid document state: {0}")]
    InvalidState(String),

    #[error("conformity rejected: {0}")]
    ConformityRejected(String),

    #[error("integrity mismatch: expected {expected}, found {found}")]
    IntegrityMismatch { expected: String, found: String },

    #[error("schema profile not found: {0}")]
    SchemaNotFound(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("certificate error: {0}")]
    Certificate(#[from] CertificateError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<CryptoError> for CredentialError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::KeyTypeMismatch { expected, found } => {
                Self::KeyTypeMismatch { expected, found }
            }
            other => Self::Crypto(other),
        }
    }
}
