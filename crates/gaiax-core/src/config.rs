//! Assistant configuration loading and management.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Full configuration for the assistant, read from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssistantConfig {
    /// Conformity gateway (GXDCH) settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Trust-root settings used for anchor and chain validation.
    #[serde(default)]
    pub trust: TrustConfig,

    /// Schema profile selection.
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Signing settings.
    #[serde(default)]
    pub signing: SigningConfig,

    /// Certificate issuance settings.
    #[serde(default)]
    pub issuance: IssuanceConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Instance used when none is given on the command line.
    #[serde(default = "default_instance")]
    pub default_instance: String,
    /// Known clearing-house instances: identifier → compliance API base URL.
    #[serde(default = "default_instances")]
    pub instances: BTreeMap<String, String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total submission attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds; doubles after each attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Upper bound for a single backoff delay in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Delay between polls of a pending (202) submission.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum number of polls before a pending submission counts as timed out.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// Bearer token sent with submissions.
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrustConfig {
    /// PEM files holding recognized trust-root certificates.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    /// Accept a self-signed trust anchor by adding it to the root set.
    #[serde(default)]
    pub allow_self_signed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema profile identifier (trust framework version).
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Extra credential-subject claims that must be present.
    #[serde(default)]
    pub required_claims: Vec<String>,
    /// Terms-and-conditions URL used when the API spec has none.
    #[serde(default)]
    pub terms_and_conditions: Option<String>,
    /// Access/usage policy written into the service offering.
    #[serde(default = "default_policy")]
    pub policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SigningConfig {
    /// Force a JWS algorithm (`EdDSA` or `RS256`); derived from the key when unset.
    #[serde(default)]
    pub algorithm: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IssuanceConfig {
    /// Certificate issuance server used when no trust anchor is supplied.
    #[serde(default)]
    pub server_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_instance() -> String {
    "aire-networks".into()
}
fn default_instances() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "aire-networks".to_string(),
            "https://gx-compliance.airenetworks.es/v1".to_string(),
        ),
        (
            "gaia-x-lab".to_string(),
            "https://compliance.lab.gaia-x.eu/v1".to_string(),
        ),
    ])
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_max_ms() -> u64 {
    8_000
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_max_polls() -> u32 {
    30
}
fn default_profile() -> String {
    "gx-22.10".into()
}
fn default_policy() -> String {
    "default: allow".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_instance: default_instance(),
            instances: default_instances(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
            api_token: None,
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            required_claims: Vec::new(),
            terms_and_conditions: None,
            policy: default_policy(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl GatewayConfig {
    /// Look up the compliance endpoint of a named instance. An `http(s)://`
    /// URL is accepted as-is so ad-hoc gateways need no config entry.
    pub fn endpoint_for(&self, instance: &str) -> Option<String> {
        if instance.starts_with("http://") || instance.starts_with("https://") {
            return Some(instance.trim_end_matches('/').to_string());
        }
        self.instances
            .get(instance)
            .map(|url| url.trim_end_matches('/').to_string())
    }
}

impl AssistantConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields and for a missing file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|e| CoreError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let contents = toml::to_string_pretty(self).map_err(|e| CoreError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, contents).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
