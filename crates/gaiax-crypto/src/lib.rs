pub mod canonical;
pub mod certificate;
pub mod error;
pub mod hashing;
pub mod jwk;
pub mod keys;
pub mod signing;

pub use canonical::{canonicalize, CanonicalBytes};
pub use certificate::{
    certificate_request, generate_certificate, validate_chain, Certificate, CertificateChain,
    CertificateProfile, ChainReport, ChainWarning, TrustRoots,
};
pub use error::{CertificateError, CryptoError};
pub use hashing::{integrity, sha256, sha256_hex, verify_integrity, Hash};
pub use jwk::Jwk;
pub use keys::{PrivateKey, PublicKey};
pub use signing::{sign_detached, verify_detached, JwsHeader, JWS_SIGNATURE_TYPE};
