use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use gaiax_core::Did;

use crate::did::did_web_document_url;
use crate::document::DidDocument;
use crate::error::IdentityError;

/// Trait for resolving DIDs to their documents.
#[async_trait]
pub trait DidResolver: Send + Sync {
    /// Resolve a DID (or DID URL) to its DID Document.
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError>;
}

/// Resolves DIDs from documents held in memory, e.g. loaded from local files
/// before they are published.
#[derive(Default)]
pub struct LocalDidResolver {
    documents: DashMap<String, DidDocument>,
}

impl LocalDidResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under its own id.
    pub fn insert(&self, document: DidDocument) {
        self.documents.insert(document.id.clone(), document);
    }

    /// Load a DID document file and register it.
    pub fn load_file(&self, path: &Path) -> Result<Did, IdentityError> {
        let document = DidDocument::load(path)?;
        let did = document.did()?;
        tracing::debug!(did = %did, path = %path.display(), "registered local DID document");
        self.insert(document);
        Ok(did)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DidResolver for LocalDidResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        let did = Did::from_url(did)?;
        self.documents
            .get(did.uri())
            .map(|doc| doc.clone())
            .ok_or_else(|| IdentityError::DidNotFound(did.to_string()))
    }
}

/// Resolves `did:web` identifiers over HTTPS.
pub struct WebDidResolver {
    client: reqwest::Client,
}

impl WebDidResolver {
    pub fn new(timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::DidResolution(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: url::Url) -> Result<DidDocument, IdentityError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/did+json, application/json")
            .send()
            .await
            .map_err(|e| IdentityError::DidResolution(format!("GET {}: {}", url, e)))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IdentityError::DidNotFound(url.to_string()));
        }
        if !response.status().is_success() {
            return Err(IdentityError::DidResolution(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| IdentityError::DidResolution(format!("GET {}: {}", url, e)))?;
        DidDocument::from_json(&body)
    }
}

#[async_trait]
impl DidResolver for WebDidResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        let did = Did::from_url(did)?;
        let url = did_web_document_url(&did)?;
        tracing::debug!(did = %did, url = %url, "resolving did:web");
        let document = self.fetch(url).await?;
        if document.id != did.uri() {
            return Err(IdentityError::InvalidDocument(format!(
                "document id {} does not match {}",
                document.id, did
            )));
        }
        Ok(document)
    }
}

/// Composite resolver that tries multiple resolvers in order.
///
/// Returns the first successful resolution, or the last error.
pub struct CompositeDidResolver {
    resolvers: Vec<Box<dyn DidResolver>>,
}

impl CompositeDidResolver {
    /// Create a new composite resolver with no backends.
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Add a resolver to the chain.
    pub fn add_resolver(&mut self, resolver: Box<dyn DidResolver>) {
        self.resolvers.push(resolver);
    }

    /// Number of registered resolvers.
    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }
}

impl Default for CompositeDidResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DidResolver for CompositeDidResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        let mut last_error = IdentityError::DidResolution("no resolvers configured".into());

        for resolver in &self.resolvers {
            match resolver.resolve(did).await {
                Ok(doc) => return Ok(doc),
                Err(e) => {
                    tracing::debug!(did = did, error = %e, "resolver failed, trying next");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
