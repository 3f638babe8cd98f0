use std::time::Duration;

use async_trait::async_trait;
use gaiax_core::GatewayConfig;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::error::GatewayError;

/// Path of the compliance endpoint, relative to an instance base URL.
pub const CREDENTIAL_OFFERS_PATH: &str = "api/credential-offers";

/// Carries a verifiable presentation to a clearing house and returns the
/// compliance credential it issues.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Submit `presentation` to the instance at `endpoint`. Errors must be
    /// [`GatewayError::Transient`] when repeating the request may succeed.
    async fn submit(&self, endpoint: &str, presentation: &Value) -> Result<Value, GatewayError>;
}

/// HTTP transport for GXDCH compliance APIs.
pub struct HttpTransport {
    client: reqwest::Client,
    api_token: Option<String>,
    poll_interval: Duration,
    max_polls: u32,
}

impl HttpTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_token: config.api_token.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
        })
    }

    /// Follow a pending (202) submission until the gateway returns a result.
    async fn poll(&self, location: Url) -> Result<Value, GatewayError> {
        for poll in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            let mut request = self.client.get(location.clone());
            if let Some(token) = &self.api_token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await.map_err(send_error)?;
            let status = response.status();
            if status == StatusCode::ACCEPTED {
                tracing::debug!(poll, location = %location, "submission still pending");
                continue;
            }
            return read_result(response).await;
        }
        Err(GatewayError::Transient(format!(
            "submission still pending after {} polls",
            self.max_polls
        )))
    }
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn submit(&self, endpoint: &str, presentation: &Value) -> Result<Value, GatewayError> {
        let base = Url::parse(&format!("{}/", endpoint.trim_end_matches('/')))
            .map_err(|e| GatewayError::Client(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        let url = base
            .join(CREDENTIAL_OFFERS_PATH)
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        let mut request = self.client.post(url.clone()).json(presentation);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        tracing::debug!(url = %url, "submitting presentation");
        let response = request.send().await.map_err(send_error)?;

        if response.status() == StatusCode::ACCEPTED {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    GatewayError::InvalidResponse("202 Accepted without a Location header".into())
                })?;
            let location = url
                .join(location)
                .map_err(|e| GatewayError::InvalidResponse(format!("bad Location: {}", e)))?;
            tracing::info!(location = %location, "submission accepted for processing, polling");
            return self.poll(location).await;
        }
        read_result(response).await
    }
}

pub(crate) fn send_error(e: reqwest::Error) -> GatewayError {
    if e.is_builder() {
        GatewayError::Client(e.to_string())
    } else {
        GatewayError::Transient(e.to_string())
    }
}

/// Map an unsuccessful status to the error taxonomy: 408, 429 and 5xx are
/// transient, any other 4xx is a rejection carrying the server's message.
pub(crate) fn status_error(status: StatusCode, body: String) -> GatewayError {
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        return GatewayError::Transient(format!("HTTP {}", status.as_u16()));
    }
    if status.is_client_error() {
        return GatewayError::Rejected {
            status: status.as_u16(),
            message: error_message(&body).unwrap_or_else(|| status.to_string()),
            body,
        };
    }
    GatewayError::InvalidResponse(format!("unexpected status {}", status))
}

/// Message of a NestJS-style error body `{statusCode, message, error}`;
/// `message` may be a string or a list of strings.
fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    match json.get("message")? {
        Value::String(message) => Some(message.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

async fn read_result(response: reqwest::Response) -> Result<Value, GatewayError> {
    let status = response.status();
    let body = response.text().await.map_err(send_error)?;
    if !status.is_success() {
        return Err(status_error(status, body));
    }
    serde_json::from_str(&body)
        .map_err(|e| GatewayError::InvalidResponse(format!("response is not JSON: {}", e)))
}
