// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_OPERATIONS, DEFAULT_MAX_REQUESTS,
    DEFAULT_OPERATION,
};
use crate::engine::options::{OperationName, OptionSet, RawOptions, ResizeLimits};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server-level option defaults, keyed by option name
    #[serde(default)]
    pub defaults: BTreeMap<String, OptionValue>,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub operations: OperationsConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Base URL for requests whose `url` is a relative path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_base_url: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scalar value of an option default; YAML may spell `quality: 90`,
/// `quality: keep` or `optimize: true`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    /// The value as it would appear in a request argument
    pub fn to_option_string(&self) -> String {
        match self {
            OptionValue::Bool(true) => "1".to_string(),
            OptionValue::Bool(false) => "0".to_string(),
            OptionValue::Integer(i) => i.to_string(),
            OptionValue::Float(f) => f.to_string(),
            OptionValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Required value of the `client` argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Key requests must be signed with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    /// Source hosts that may be fetched; empty allows any host
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// Maximum concurrent source fetches
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_validate_cert")]
    pub validate_cert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_port: Option<u16>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_requests: default_max_requests(),
            validate_cert: default_validate_cert(),
            proxy_host: None,
            proxy_port: None,
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    /// `http://host:port` when a proxy is configured
    pub fn proxy_url(&self) -> Option<String> {
        self.proxy_host.as_ref().map(|host| match self.proxy_port {
            Some(port) => format!("http://{}:{}", host, port),
            None => format!("http://{}", host),
        })
    }
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_max_requests() -> usize {
    DEFAULT_MAX_REQUESTS
}

fn default_validate_cert() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("picbox/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationsConfig {
    #[serde(default = "default_allowed_operations")]
    pub allowed: Vec<String>,
    /// Operation applied when a request names none
    #[serde(default = "default_operation")]
    pub default_operation: String,
    #[serde(default = "default_max_operations")]
    pub max_operations: usize,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            allowed: default_allowed_operations(),
            default_operation: default_operation(),
            max_operations: default_max_operations(),
        }
    }
}

fn default_allowed_operations() -> Vec<String> {
    ["region", "resize", "rotate", "noop"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_operation() -> String {
    DEFAULT_OPERATION.to_string()
}

fn default_max_operations() -> usize {
    DEFAULT_MAX_OPERATIONS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resize_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resize_height: Option<u32>,
}

impl LimitsConfig {
    pub fn resize_limits(&self) -> ResizeLimits {
        ResizeLimits {
            max_width: self.max_resize_width,
            max_height: self.max_resize_height,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Server-level defaults as raw options
    pub fn default_options(&self) -> Result<RawOptions, String> {
        let mut raw = RawOptions::new();
        for (name, value) in &self.defaults {
            if !raw.set(name, value.to_option_string()) {
                return Err(format!("Unknown option '{}' in defaults", name));
            }
        }
        Ok(raw)
    }

    /// Allowed operations, parsed
    pub fn allowed_operations(&self) -> Result<Vec<OperationName>, String> {
        self.operations
            .allowed
            .iter()
            .map(|name| {
                name.parse::<OperationName>()
                    .map_err(|_| format!("Unknown operation '{}' in operations.allowed", name))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        let defaults = self.default_options()?;
        OptionSet::normalize(&defaults, &[], &self.limits.resize_limits())
            .map_err(|e| format!("Invalid option default: {}", e))?;

        let allowed = self.allowed_operations()?;
        if allowed.is_empty() {
            return Err("operations.allowed cannot be empty".to_string());
        }
        let default_op = self
            .operations
            .default_operation
            .parse::<OperationName>()
            .map_err(|_| {
                format!(
                    "Unknown default operation '{}'",
                    self.operations.default_operation
                )
            })?;
        if !allowed.contains(&default_op) {
            return Err(format!(
                "Default operation '{}' is not in operations.allowed",
                self.operations.default_operation
            ));
        }
        if self.operations.max_operations == 0 {
            return Err("operations.max_operations must be greater than 0".to_string());
        }

        if self.fetch.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be greater than 0".to_string());
        }
        if self.fetch.max_requests == 0 {
            return Err("fetch.max_requests must be greater than 0".to_string());
        }
        if self.fetch.proxy_port.is_some() && self.fetch.proxy_host.is_none() {
            return Err("fetch.proxy_port requires fetch.proxy_host".to_string());
        }

        if let Some(base) = &self.implicit_base_url {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(format!(
                    "implicit_base_url '{}' must start with http:// or https://",
                    base
                ));
            }
        }

        if let Some(key) = &self.security.client_key {
            if key.is_empty() {
                return Err("security.client_key cannot be empty".to_string());
            }
        }

        Ok(())
    }
}
