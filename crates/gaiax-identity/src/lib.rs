//! Gaia-X Identity Layer
//!
//! Provides the identity primitives a Self-Description depends on:
//! - `did:web` identifiers and their HTTPS document locations
//! - DID Documents with `JsonWebKey2020` verification methods
//! - DID resolution (local, web, composite)
//! - `.well-known` publication of the DID document and certificate chain

pub mod did;
pub mod did_resolver;
pub mod document;
pub mod error;
pub mod well_known;

pub use did::{did_web_document_url, did_web_domain};
pub use did_resolver::{CompositeDidResolver, DidResolver, LocalDidResolver, WebDidResolver};
pub use document::{DidDocument, VerificationMethod};
pub use error::IdentityError;
pub use well_known::{PublishedFiles, WellKnown};
