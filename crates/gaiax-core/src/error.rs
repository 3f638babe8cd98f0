use crate::lifecycle::DocumentState;

/// Core errors shared by every crate of the assistant.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid document state transition from {from} to {to}")]
    InvalidStateTransition {
        from: DocumentState,
        to: DocumentState,
    },

    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("configuration error in {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
