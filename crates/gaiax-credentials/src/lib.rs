//! Gaia-X Credentials — API spec extraction, Self-Description assembly,
//! proof signing, schema profiles and validation.

pub mod anchor;
pub mod assembler;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod extractor;
pub mod schema;
pub mod signer;
pub mod validator;

pub use anchor::{AnchorSource, TrustAnchor};
pub use assembler::CredentialAssembler;
pub use descriptor::{ApiKind, ApiSpecification, Endpoint, Provider, ServiceDescriptor};
pub use document::{ConformityRecord, ConformityStatus, Proof, ProofOptions, SelfDescriptionDocument};
pub use error::{CredentialError, ExtractError};
pub use extractor::{extract_service, extract_service_from_str};
pub use schema::{SchemaProfile, SchemaRegistry, DEFAULT_PROFILE};
pub use signer::{signing_payload, verify_proof, ProofSigner};
pub use validator::{CheckResult, CheckStatus, ValidationReport, Validator};
