use serde::{Deserialize, Serialize};
use std::fmt;

/// API description format a service was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiKind {
    OpenApi,
    Swagger,
    AsyncApi,
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenApi => write!(f, "OpenAPI"),
            Self::Swagger => write!(f, "Swagger"),
            Self::AsyncApi => write!(f, "AsyncAPI"),
        }
    }
}

/// Format and version of the source API specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSpecification {
    pub kind: ApiKind,
    pub version: String,
}

impl ApiSpecification {
    /// Reference URL of the specification standard the API conforms to.
    pub fn standard_reference(&self) -> String {
        match self.kind {
            ApiKind::OpenApi => format!("https://spec.openapis.org/oas/v{}", self.version),
            ApiKind::Swagger => "https://swagger.io/specification/v2/".to_string(),
            ApiKind::AsyncApi => format!(
                "https://www.asyncapi.com/docs/reference/specification/v{}",
                self.version
            ),
        }
    }

    pub fn publisher(&self) -> &'static str {
        match self.kind {
            ApiKind::OpenApi | ApiKind::Swagger => "OpenAPI Initiative",
            ApiKind::AsyncApi => "AsyncAPI Initiative",
        }
    }
}

/// A network location the service is reachable at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub protocol: Option<String>,
    pub description: Option<String>,
}

/// Service provider contact taken from the API spec.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Provider {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

/// Normalized description of a service, independent of the API spec format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub api: ApiSpecification,
    pub endpoints: Vec<Endpoint>,
    pub provider: Option<Provider>,
    pub terms_of_service: Option<String>,
    pub license: Option<String>,
    /// Media types the API produces, sorted.
    pub content_types: Vec<String>,
}

impl ServiceDescriptor {
    /// First declared endpoint.
    pub fn primary_endpoint(&self) -> Option<&Endpoint> {
        self.endpoints.first()
    }
}
