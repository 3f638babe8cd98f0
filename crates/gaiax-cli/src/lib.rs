//! gaiax-sd — Gaia-X Self-Description assistant.
//!
//! Subcommands map one-to-one to core operations:
//! - `prepare-cert` — trust-anchor key and certificate (self-signed or CA-issued)
//! - `get-cert` — fetch an issued certificate chain
//! - `build-did` — `did:web` document from a certificate chain
//! - `build-self-description` — extract, assemble, sign, certify and persist
//! - `build-well-known` — publish the DID document and chain
//! - `validate-credentials` — validate credential files concurrently

pub mod commands;
pub mod pipeline;

pub use pipeline::{AnchorInput, BuildOutcome, BuildRequest, SelfDescriptionPipeline};
