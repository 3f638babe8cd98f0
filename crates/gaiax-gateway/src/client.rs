//! Conformity Gateway Client: submits signed Self-Descriptions to a GXDCH
//! instance and turns the response into a [`ConformityRecord`].

use gaiax_core::GatewayConfig;
use gaiax_credentials::document::CREDENTIALS_CONTEXT;
use gaiax_credentials::{ConformityRecord, SelfDescriptionDocument};
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::retry::RetryPolicy;
use crate::transport::GatewayTransport;

/// Wrap the signed content of `document` in a `VerifiablePresentation`.
pub fn build_presentation(document: &SelfDescriptionDocument) -> Result<Value, GatewayError> {
    let credential = serde_json::to_value(document.signed_content())
        .map_err(|e| GatewayError::InvalidResponse(format!("cannot encode document: {}", e)))?;
    Ok(json!({
        "@context": [CREDENTIALS_CONTEXT],
        "type": ["VerifiablePresentation"],
        "verifiableCredential": [credential],
    }))
}

/// Client for the compliance service of the configured clearing houses.
pub struct GatewayClient<T: GatewayTransport> {
    transport: T,
    config: GatewayConfig,
    policy: RetryPolicy,
}

impl<T: GatewayTransport> GatewayClient<T> {
    pub fn new(transport: T, config: GatewayConfig) -> Self {
        let policy = RetryPolicy::from_config(&config);
        Self {
            transport,
            config,
            policy,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit a signed document to `instance` (a configured instance name or
    /// an `http(s)` URL). Unsigned documents are refused before any request.
    pub async fn submit(
        &self,
        document: &SelfDescriptionDocument,
        instance: &str,
    ) -> Result<ConformityRecord, GatewayError> {
        if !document.is_signed() {
            return Err(GatewayError::Unsigned);
        }
        let endpoint = self
            .config
            .endpoint_for(instance)
            .ok_or_else(|| GatewayError::UnknownInstance(instance.to_string()))?;
        let presentation = build_presentation(document)?;

        let transport = &self.transport;
        let target = endpoint.as_str();
        let body = &presentation;
        let credential = self
            .policy
            .run(move |attempt| {
                tracing::debug!(attempt, endpoint = target, "submitting for conformity");
                transport.submit(target, body)
            })
            .await?;

        tracing::info!(
            id = %document.id,
            instance = instance,
            endpoint = %endpoint,
            "conformity credential received"
        );
        Ok(ConformityRecord::accepted(instance, &endpoint, credential))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gaiax_credentials::{ConformityStatus, Proof};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted outcomes, one per submission.
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<Value, GatewayError>>>,
        calls: AtomicU32,
        last_endpoint: Mutex<Option<String>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Result<Value, GatewayError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
                last_endpoint: Mutex::new(None),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GatewayTransport for ScriptedTransport {
        async fn submit(&self, endpoint: &str, presentation: &Value) -> Result<Value, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_endpoint.lock().unwrap() = Some(endpoint.to_string());
            assert_eq!(presentation["type"][0], "VerifiablePresentation");
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::Transient("script exhausted".into())))
        }
    }

    fn client(outcomes: Vec<Result<Value, GatewayError>>) -> GatewayClient<ScriptedTransport> {
        GatewayClient::new(ScriptedTransport::new(outcomes), GatewayConfig::default())
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            })
    }

    fn document(signed: bool) -> SelfDescriptionDocument {
        let mut doc: SelfDescriptionDocument = serde_json::from_value(json!({
            "@context": [CREDENTIALS_CONTEXT],
            "@type": ["VerifiableCredential", "gx:ServiceOffering"],
            "id": "urn:uuid:1",
            "issuer": "did:web:provider.example",
            "credentialSubject": {"type": "gx:ServiceOffering"}
        }))
        .unwrap();
        if signed {
            doc.proof = Some(Proof {
                proof_type: "JsonWebSignature2020".into(),
                created: "2024-01-01T00:00:00Z".into(),
                proof_purpose: "assertionMethod".into(),
                verification_method: "did:web:provider.example#JWK2020-Ed25519".into(),
                jws: "eyJhbGciOiJFZERTQSJ9..c2ln".into(),
            });
        }
        doc
    }

    #[tokio::test]
    async fn test_two_timeouts_then_accepted() {
        let client = client(vec![
            Err(GatewayError::Transient("timed out".into())),
            Err(GatewayError::Transient("timed out".into())),
            Ok(json!({"issuer": "did:web:compliance.lab.gaia-x.eu"})),
        ]);
        let record = client.submit(&document(true), "gaia-x-lab").await.unwrap();
        assert_eq!(record.status, ConformityStatus::Accepted);
        assert_eq!(record.instance, "gaia-x-lab");
        assert_eq!(record.endpoint, "https://compliance.lab.gaia-x.eu/v1");
        assert_eq!(client.transport().calls(), 3);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let client = client(vec![Err(GatewayError::Rejected {
            status: 400,
            message: "invalid shape".into(),
            body: "{}".into(),
        })]);
        let err = client.submit(&document(true), "gaia-x-lab").await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status: 400, .. }));
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let client = client(vec![]);
        let err = client.submit(&document(true), "gaia-x-lab").await.unwrap_err();
        assert!(matches!(err, GatewayError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(client.transport().calls(), 3);
    }

    #[tokio::test]
    async fn test_unsigned_document_refused() {
        let client = client(vec![Ok(json!({}))]);
        let err = client.submit(&document(false), "gaia-x-lab").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unsigned));
        assert_eq!(client.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_instance_resolution() {
        let client = client(vec![Ok(json!({})), Ok(json!({}))]);
        assert!(matches!(
            client.submit(&document(true), "nowhere").await,
            Err(GatewayError::UnknownInstance(_))
        ));
        client
            .submit(&document(true), "https://gx.example/v1/")
            .await
            .unwrap();
        assert_eq!(
            client.transport().last_endpoint.lock().unwrap().as_deref(),
            Some("https://gx.example/v1")
        );
    }

    #[test]
    fn test_presentation_excludes_conformity() {
        let presentation = build_presentation(&document(true)).unwrap();
        let credential = &presentation["verifiableCredential"][0];
        assert!(credential.get("proof").is_some());
        assert!(credential.get("conformity").is_none());
    }
}
