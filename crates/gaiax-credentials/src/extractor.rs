//! Specification Extractor: OpenAPI 3.x, Swagger 2.0 and AsyncAPI 2.x/3.x
//! documents to [`ServiceDescriptor`].

use std::collections::BTreeSet;
use std::path::Path;

use serde_json::Value;

use crate::descriptor::{ApiKind, ApiSpecification, Endpoint, Provider, ServiceDescriptor};
use crate::error::ExtractError;

/// Read and normalize an API specification file. Files ending in `.json`
/// are parsed as JSON, everything else as YAML.
pub fn extract_service(path: &Path) -> Result<ServiceDescriptor, ExtractError> {
    let source = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| ExtractError::Io {
        path: source.clone(),
        source: e,
    })?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let value: Value = if is_json {
        serde_json::from_str(&content).map_err(|e| ExtractError::Parse {
            path: source.clone(),
            reason: e.to_string(),
        })?
    } else {
        parse_yaml(&content, &source)?
    };
    let descriptor = extract_from_value(&value, &source)?;
    tracing::info!(
        path = %source,
        api = %descriptor.api.kind,
        name = %descriptor.name,
        endpoints = descriptor.endpoints.len(),
        "extracted service descriptor"
    );
    Ok(descriptor)
}

/// Normalize an API specification given as YAML or JSON text. `source`
/// names the input in errors.
pub fn extract_service_from_str(
    content: &str,
    source: &str,
) -> Result<ServiceDescriptor, ExtractError> {
    extract_from_value(&parse_yaml(content, source)?, source)
}

fn parse_yaml(content: &str, source: &str) -> Result<Value, ExtractError> {
    serde_yaml::from_str(content).map_err(|e| ExtractError::Parse {
        path: source.to_string(),
        reason: e.to_string(),
    })
}

fn schema_error(source: &str, field: impl Into<String>) -> ExtractError {
    ExtractError::Schema {
        path: source.to_string(),
        field: field.into(),
    }
}

/// String value at a JSON pointer. YAML scalars such as `version: 1.0` come
/// back as numbers and are accepted.
fn text(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn extract_from_value(value: &Value, source: &str) -> Result<ServiceDescriptor, ExtractError> {
    if !value.is_object() {
        return Err(schema_error(source, "<root>"));
    }

    let api = if let Some(version) = text(value, "/openapi") {
        if !version.starts_with('3') {
            return Err(schema_error(source, "openapi"));
        }
        ApiSpecification {
            kind: ApiKind::OpenApi,
            version,
        }
    } else if let Some(version) = text(value, "/swagger") {
        if !version.starts_with('2') {
            return Err(schema_error(source, "swagger"));
        }
        ApiSpecification {
            kind: ApiKind::Swagger,
            version,
        }
    } else if let Some(version) = text(value, "/asyncapi") {
        if !(version.starts_with('2') || version.starts_with('3')) {
            return Err(schema_error(source, "asyncapi"));
        }
        ApiSpecification {
            kind: ApiKind::AsyncApi,
            version,
        }
    } else {
        return Err(schema_error(source, "openapi"));
    };

    let name = text(value, "/info/title").ok_or_else(|| schema_error(source, "info.title"))?;
    let version =
        text(value, "/info/version").ok_or_else(|| schema_error(source, "info.version"))?;

    let endpoints = match api.kind {
        ApiKind::OpenApi => openapi_servers(value, source)?,
        ApiKind::Swagger => swagger_servers(value, source)?,
        ApiKind::AsyncApi => asyncapi_servers(value, &api.version, source)?,
    };
    if endpoints.is_empty() {
        return Err(schema_error(source, "servers"));
    }

    let provider = Provider {
        name: text(value, "/info/contact/name"),
        url: text(value, "/info/contact/url"),
        email: text(value, "/info/contact/email"),
    };
    let provider = (provider != Provider::default()).then_some(provider);

    Ok(ServiceDescriptor {
        name,
        description: text(value, "/info/description"),
        version,
        endpoints,
        provider,
        terms_of_service: text(value, "/info/termsOfService"),
        license: text(value, "/info/license/name"),
        content_types: content_types(value, api.kind),
        api,
    })
}

/// Replace `{name}` placeholders with the variable's `default`.
fn substitute_variables(template: &str, variables: Option<&Value>) -> String {
    let mut url = template.to_string();
    if let Some(vars) = variables.and_then(Value::as_object) {
        for (name, var) in vars {
            if let Some(default) = text(var, "/default") {
                url = url.replace(&format!("{{{}}}", name), &default);
            }
        }
    }
    url
}

fn ensure_absolute(url: String, source: &str, field: String) -> Result<String, ExtractError> {
    match url::Url::parse(&url) {
        Ok(parsed) if parsed.has_host() => Ok(url),
        _ => Err(schema_error(source, field)),
    }
}

fn openapi_servers(value: &Value, source: &str) -> Result<Vec<Endpoint>, ExtractError> {
    let Some(servers) = value.get("servers").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    servers
        .iter()
        .enumerate()
        .map(|(i, server)| {
            let field = format!("servers[{}].url", i);
            let template = text(server, "/url").ok_or_else(|| schema_error(source, &field))?;
            let url = substitute_variables(&template, server.get("variables"));
            let url = ensure_absolute(url, source, field)?;
            let protocol = url.split("://").next().map(str::to_string);
            Ok(Endpoint {
                url,
                protocol,
                description: text(server, "/description"),
            })
        })
        .collect()
}

fn swagger_servers(value: &Value, source: &str) -> Result<Vec<Endpoint>, ExtractError> {
    let Some(host) = text(value, "/host") else {
        return Ok(Vec::new());
    };
    let base_path = text(value, "/basePath").unwrap_or_default();
    let schemes: Vec<String> = value
        .get("schemes")
        .and_then(Value::as_array)
        .map(|s| s.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .filter(|s: &Vec<String>| !s.is_empty())
        .unwrap_or_else(|| vec!["https".to_string()]);
    schemes
        .into_iter()
        .map(|scheme| {
            let url = format!("{}://{}{}", scheme, host, base_path);
            Ok(Endpoint {
                url: ensure_absolute(url, source, "host".to_string())?,
                protocol: Some(scheme),
                description: None,
            })
        })
        .collect()
}

/// AsyncAPI servers form a map, so endpoints come out ordered by server name.
fn asyncapi_servers(
    value: &Value,
    version: &str,
    source: &str,
) -> Result<Vec<Endpoint>, ExtractError> {
    let Some(servers) = value.get("servers").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };
    servers
        .iter()
        .map(|(name, server)| {
            let protocol = text(server, "/protocol");
            let (raw, field) = if version.starts_with('2') {
                let field = format!("servers.{}.url", name);
                let url = text(server, "/url").ok_or_else(|| schema_error(source, &field))?;
                (url, field)
            } else {
                let field = format!("servers.{}.host", name);
                let host = text(server, "/host").ok_or_else(|| schema_error(source, &field))?;
                let pathname = text(server, "/pathname").unwrap_or_default();
                (format!("{}{}", host, pathname), field)
            };
            let raw = substitute_variables(&raw, server.get("variables"));
            let url = if raw.contains("://") {
                raw
            } else {
                let scheme = protocol
                    .as_deref()
                    .ok_or_else(|| schema_error(source, format!("servers.{}.protocol", name)))?;
                format!("{}://{}", scheme, raw)
            };
            Ok(Endpoint {
                url: ensure_absolute(url, source, field)?,
                protocol,
                description: text(server, "/description"),
            })
        })
        .collect()
}

fn content_types(value: &Value, kind: ApiKind) -> Vec<String> {
    let mut types = BTreeSet::new();
    match kind {
        ApiKind::OpenApi => {
            let operations = value
                .get("paths")
                .and_then(Value::as_object)
                .into_iter()
                .flat_map(|paths| paths.values())
                .filter_map(Value::as_object)
                .flat_map(|item| item.values());
            for operation in operations {
                let responses = operation
                    .get("responses")
                    .and_then(Value::as_object)
                    .into_iter()
                    .flat_map(|r| r.values());
                for response in responses {
                    if let Some(content) = response.get("content").and_then(Value::as_object) {
                        types.extend(content.keys().cloned());
                    }
                }
            }
        }
        ApiKind::Swagger => {
            if let Some(produces) = value.get("produces").and_then(Value::as_array) {
                types.extend(produces.iter().filter_map(|v| v.as_str().map(str::to_string)));
            }
        }
        ApiKind::AsyncApi => {
            if let Some(ct) = text(value, "/defaultContentType") {
                types.insert(ct);
            }
        }
    }
    types.into_iter().collect()
}
