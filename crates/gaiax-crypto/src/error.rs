use gaiax_core::KeyType;

/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGenerationError(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key type mismatch: expected {expected}, found {found}")]
    KeyTypeMismatch { expected: KeyType, found: KeyType },

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("signing failed: {0}")]
    SigningError(String),

    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    #[error("invalid JWS: {0}")]
    InvalidJws(String),

    #[error("invalid JWK: {0}")]
    InvalidJwk(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// X.509 certificate errors.
#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("invalid PEM: {0}")]
    Pem(String),

    #[error("invalid certificate: {0}")]
    Parse(String),

    #[error("certificate chain is empty")]
    EmptyChain,

    #[error("certificate '{subject}' is not valid at {at}")]
    OutsideValidity { subject: String, at: String },

    #[error("certificate '{subject}' is not signed by '{issuer}'")]
    BrokenChain { subject: String, issuer: String },

    #[error("certificate '{subject}' is not a CA and cannot issue certificates")]
    NotCertificateAuthority { subject: String },

    #[error("certificate chain ending at '{subject}' does not resolve to a trusted root")]
    UntrustedRoot { subject: String },

    #[error("certificate generation failed: {0}")]
    Generation(String),

    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Key(#[from] CryptoError),
}
