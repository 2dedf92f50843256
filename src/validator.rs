//! Request validation
//!
//! Turns raw request arguments into a [`ValidatedRequest`], checking in a
//! fixed order and failing on the first violation:
//!
//! 1. operation names, count and membership in the allowed set
//! 2. source URL presence and scheme
//! 3. signature, client and host checks
//! 4. per-operation options, then the general transform options

use reqwest::Url;
use std::collections::HashMap;

use crate::config::{Config, SecurityConfig};
use crate::engine::options::{parse_operations, OperationName, OptionSet, RawOptions, ResizeLimits};
use crate::engine::pipeline::OperationChain;
use crate::error::ImageError;
use crate::security;

/// A request that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    /// Absolute source URL
    pub url: String,
    pub chain: OperationChain,
    pub options: OptionSet,
}

/// Request validator built once from configuration
#[derive(Debug, Clone)]
pub struct Validator {
    allowed_operations: Vec<OperationName>,
    default_operation: OperationName,
    max_operations: usize,
    implicit_base_url: Option<String>,
    security: SecurityConfig,
    defaults: RawOptions,
    limits: ResizeLimits,
}

impl Validator {
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let default_operation = config
            .operations
            .default_operation
            .parse::<OperationName>()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            allowed_operations: config.allowed_operations()?,
            default_operation,
            max_operations: config.operations.max_operations,
            implicit_base_url: config.implicit_base_url.clone(),
            security: config.security.clone(),
            defaults: config.default_options()?,
            limits: config.limits.resize_limits(),
        })
    }

    /// Validate request arguments.
    ///
    /// `query` is the raw query string the arguments came from; it is what
    /// the signature covers.
    pub fn validate(
        &self,
        args: &HashMap<String, String>,
        query: &str,
    ) -> Result<ValidatedRequest, ImageError> {
        let operations = self.operations(args.get("op").map(String::as_str))?;
        let url = self.source_url(args.get("url").map(String::as_str))?;

        security::check_signature(self.security.client_key.as_deref(), query)?;
        security::check_client(
            self.security.client_name.as_deref(),
            args.get("client").map(String::as_str),
        )?;
        security::check_host(&self.security.allowed_hosts, url.host_str())?;

        let raw = RawOptions::from_request_args(args).with_defaults(&self.defaults);
        let options = OptionSet::normalize(&raw, &operations, &self.limits)?;
        let chain = OperationChain::from_names(&operations, &options)?;

        tracing::debug!(
            url = %url,
            operations = ?operations,
            mode = ?options.mode,
            "request validated"
        );

        Ok(ValidatedRequest {
            url: url.into(),
            chain,
            options,
        })
    }

    fn operations(&self, op: Option<&str>) -> Result<Vec<OperationName>, ImageError> {
        let operations = match op.filter(|v| !v.is_empty()) {
            Some(value) => parse_operations(value)?,
            None => vec![self.default_operation],
        };

        if let Some(name) = operations
            .iter()
            .find(|name| !self.allowed_operations.contains(name))
        {
            return Err(ImageError::operation(format!(
                "Unsupported operation: {}",
                name.as_str()
            )));
        }
        if operations.len() > self.max_operations {
            return Err(ImageError::operation(format!(
                "Too many operations: {} (max {})",
                operations.len(),
                self.max_operations
            )));
        }
        Ok(operations)
    }

    fn source_url(&self, url: Option<&str>) -> Result<Url, ImageError> {
        let url = url
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ImageError::url("Missing url"))?;

        let absolute = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if let Some(base) = &self.implicit_base_url {
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        } else {
            return Err(ImageError::url("Unsupported protocol"));
        };

        Url::parse(&absolute).map_err(|e| ImageError::url(format!("Invalid url: {}", e)))
    }
}
