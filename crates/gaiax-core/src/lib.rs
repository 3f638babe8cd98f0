//! Gaia-X Core — Fundamental types, errors, lifecycle and configuration for
//! the Gaia-X Self-Description assistant.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod types;

pub use config::{
    AssistantConfig, GatewayConfig, IssuanceConfig, LoggingConfig, SchemaConfig, SigningConfig,
    TrustConfig,
};
pub use error::CoreError;
pub use lifecycle::{DocumentEvent, DocumentLifecycle, DocumentState};
pub use types::{Did, KeyType};
