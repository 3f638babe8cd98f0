//! Client for a certificate issuance server: fetches issued trust-anchor
//! chains and requests new ones from a CSR.

use std::time::Duration;

use gaiax_crypto::CertificateChain;
use reqwest::StatusCode;
use url::Url;

use crate::error::GatewayError;
use crate::retry::RetryPolicy;
use crate::transport::{send_error, status_error};

const PKCS10_CONTENT_TYPE: &str = "application/pkcs10";
const PEM_CHAIN_CONTENT_TYPE: &str = "application/pem-certificate-chain";

pub struct IssuanceClient {
    client: reqwest::Client,
    server: Url,
    policy: RetryPolicy,
}

impl IssuanceClient {
    pub fn new(server: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let server = Url::parse(server)
            .map_err(|e| GatewayError::Client(format!("invalid server URL '{}': {}", server, e)))?;
        if server.cannot_be_a_base() {
            return Err(GatewayError::Client(format!("invalid server URL '{}'", server)));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self {
            client,
            server,
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn server(&self) -> &str {
        self.server.as_str().trim_end_matches('/')
    }

    /// `<server>/certificates[/<id>]`, each segment percent-encoded.
    fn certificates_url(&self, cert_id: Option<&str>) -> Result<Url, GatewayError> {
        if let Some(id) = cert_id {
            if id.is_empty() || id == "." || id == ".." {
                return Err(GatewayError::Client(format!("invalid certificate id '{}'", id)));
            }
        }
        let mut url = self.server.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| GatewayError::Client(format!("invalid server URL '{}'", self.server)))?
            .pop_if_empty()
            .push("certificates")
            .extend(cert_id);
        Ok(url)
    }

    /// Retrieve the PEM chain of an already issued certificate.
    pub async fn fetch(&self, cert_id: &str) -> Result<CertificateChain, GatewayError> {
        let url = self.certificates_url(Some(cert_id))?;
        let (client, url) = (&self.client, &url);
        let pem = self
            .policy
            .run(move |_| async move {
                let response = client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, PEM_CHAIN_CONTENT_TYPE)
                    .send()
                    .await
                    .map_err(send_error)?;
                read_pem(response).await
            })
            .await?;
        let chain = CertificateChain::from_pem(&pem)?;
        tracing::info!(
            cert_id = cert_id,
            server = %self.server,
            subject = %chain.leaf().subject(),
            "fetched certificate chain"
        );
        Ok(chain)
    }

    /// Submit a PEM-encoded PKCS#10 request and return the issued chain.
    ///
    /// Issuance is not idempotent: only failures to connect are retried. A
    /// timeout or server error after the request was sent yields
    /// [`GatewayError::Unconfirmed`].
    pub async fn request(&self, csr_pem: &str) -> Result<CertificateChain, GatewayError> {
        let url = self.certificates_url(None)?;
        let (client, url) = (&self.client, &url);
        let pem = self
            .policy
            .run(move |_| async move {
                let response = client
                    .post(url.clone())
                    .header(reqwest::header::CONTENT_TYPE, PKCS10_CONTENT_TYPE)
                    .header(reqwest::header::ACCEPT, PEM_CHAIN_CONTENT_TYPE)
                    .body(csr_pem.to_string())
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_connect() {
                            send_error(e)
                        } else {
                            GatewayError::Unconfirmed(e.to_string())
                        }
                    })?;
                read_pem(response).await.map_err(|e| match e {
                    GatewayError::Transient(reason) => GatewayError::Unconfirmed(reason),
                    other => other,
                })
            })
            .await?;
        let chain = CertificateChain::from_pem(&pem)?;
        tracing::info!(
            server = %self.server,
            subject = %chain.leaf().subject(),
            "certificate issued"
        );
        Ok(chain)
    }
}

async fn read_pem(response: reqwest::Response) -> Result<String, GatewayError> {
    let status = response.status();
    let body = response.text().await.map_err(send_error)?;
    if status == StatusCode::OK || status == StatusCode::CREATED {
        Ok(body)
    } else {
        Err(status_error(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaiax_crypto::{certificate_request, generate_certificate, CertificateProfile, PrivateKey};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn issued_pem() -> String {
        let key = PrivateKey::ed25519_from_seed(&[5; 32]);
        generate_certificate(&CertificateProfile::for_domain("provider.example"), &key, None)
            .unwrap()
            .to_pem()
    }

    fn client(server: &MockServer) -> IssuanceClient {
        IssuanceClient::new(&server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            })
    }

    #[tokio::test]
    async fn test_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/certificates/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(issued_pem()))
            .mount(&server)
            .await;

        let chain = client(&server).fetch("abc").await.unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.leaf().dns_names(), vec!["provider.example".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_unknown_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .expect(1)
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).fetch("missing").await,
            Err(GatewayError::Rejected { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_request_with_csr() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/certificates"))
            .and(header("content-type", PKCS10_CONTENT_TYPE))
            .respond_with(ResponseTemplate::new(201).set_body_string(issued_pem()))
            .mount(&server)
            .await;

        let key = PrivateKey::ed25519_from_seed(&[5; 32]);
        let csr = certificate_request(&CertificateProfile::for_domain("provider.example"), &key)
            .unwrap();
        let chain = client(&server).request(&csr).await.unwrap();
        assert_eq!(chain.leaf().public_key().unwrap(), key.public_key());
    }

    #[tokio::test]
    async fn test_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).fetch("abc").await,
            Err(GatewayError::Certificate(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_encodes_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/certificates/..%2Fadmin%3Fx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(issued_pem()))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).fetch("../admin?x").await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_rejects_dot_segments() {
        let server = MockServer::start().await;
        for id in ["", ".", ".."] {
            assert!(matches!(
                client(&server).fetch(id).await,
                Err(GatewayError::Client(_))
            ));
        }
    }

    #[test]
    fn test_certificates_url_keeps_server_path() {
        let client = IssuanceClient::new("https://ca.example/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.certificates_url(Some("a b")).unwrap().as_str(),
            "https://ca.example/api/certificates/a%20b"
        );
        assert_eq!(client.server(), "https://ca.example/api");
    }

    #[tokio::test]
    async fn test_request_not_retried_after_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/certificates"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let key = PrivateKey::ed25519_from_seed(&[5; 32]);
        let csr = certificate_request(&CertificateProfile::for_domain("provider.example"), &key)
            .unwrap();
        assert!(matches!(
            client(&server).request(&csr).await,
            Err(GatewayError::Unconfirmed(_))
        ));
    }
}
