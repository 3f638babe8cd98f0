//! `did:web` method: mapping identifiers to HTTPS document locations.

use gaiax_core::Did;
use url::Url;

use crate::error::IdentityError;

/// File name of a DID document served by `did:web`.
pub const DID_DOCUMENT_FILE: &str = "did.json";

fn web_segments(did: &Did) -> Result<Vec<String>, IdentityError> {
    if did.method() != "web" {
        return Err(IdentityError::UnsupportedMethod(did.method().to_string()));
    }
    let segments: Vec<String> = did
        .identifier()
        .split(':')
        .map(|s| s.replace("%3A", ":").replace("%3a", ":"))
        .collect();
    if segments.iter().any(String::is_empty) {
        return Err(IdentityError::DidResolution(format!(
            "malformed did:web identifier: {}",
            did
        )));
    }
    Ok(segments)
}

/// Host (and optional port) a `did:web` identifier points at.
pub fn did_web_domain(did: &Did) -> Result<String, IdentityError> {
    let mut segments = web_segments(did)?;
    Ok(segments.swap_remove(0))
}

/// HTTPS location of the DID document for a `did:web` identifier.
///
/// `did:web:example.com` maps to `https://example.com/.well-known/did.json`,
/// `did:web:example.com:user:alice` to `https://example.com/user/alice/did.json`.
pub fn did_web_document_url(did: &Did) -> Result<Url, IdentityError> {
    let segments = web_segments(did)?;
    let (domain, path) = segments.split_first().ok_or_else(|| {
        IdentityError::DidResolution(format!("malformed did:web identifier: {}", did))
    })?;
    let location = if path.is_empty() {
        format!("https://{}/.well-known/{}", domain, DID_DOCUMENT_FILE)
    } else {
        format!("https://{}/{}/{}", domain, path.join("/"), DID_DOCUMENT_FILE)
    };
    Url::parse(&location)
        .map_err(|e| IdentityError::DidResolution(format!("invalid URL for {}: {}", did, e)))
}
