//! Gaia-X Gateway — talks to Digital Clearing House (GXDCH) instances.
//!
//! Provides:
//! - Conformity submission of signed Self-Descriptions ([`GatewayClient`])
//! - A pluggable transport with an HTTP implementation ([`HttpTransport`])
//! - Bounded exponential-backoff retry for transient failures ([`RetryPolicy`])
//! - Trust-anchor certificate issuance ([`IssuanceClient`])

pub mod client;
pub mod error;
pub mod issuance;
pub mod retry;
pub mod transport;

pub use client::{build_presentation, GatewayClient};
pub use error::GatewayError;
pub use issuance::IssuanceClient;
pub use retry::RetryPolicy;
pub use transport::{GatewayTransport, HttpTransport, CREDENTIAL_OFFERS_PATH};
