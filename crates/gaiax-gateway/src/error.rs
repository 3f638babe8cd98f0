use gaiax_credentials::CredentialError;
use gaiax_crypto::CertificateError;

/// Clearing-house and issuance-server errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("document is not signed; refusing to submit")]
    Unsigned,

    #[error("unknown clearing-house instance '{0}'")]
    UnknownInstance(String),

    /// Terminal rejection (4xx other than 408/429). Never retried.
    #[error("request rejected with status {status}: {message}")]
    Rejected {
        status: u16,
        message: String,
        body: String,
    },

    /// Timeout, connection failure, 408, 429 or 5xx. Retried.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A non-idempotent request failed after it may have reached the server.
    /// Not retried.
    #[error("outcome unknown, not retried: {0}")]
    Unconfirmed(String),

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("certificate error: {0}")]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl GatewayError {
    /// Whether the failure may succeed when repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
