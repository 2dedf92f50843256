//! Request access checks
//!
//! Provides:
//! - Query string signing with HMAC-SHA1, compatible with pilbox clients
//! - Client name checks
//! - Source host allow-lists (`*.example.com` wildcards)

use hmac::{Hmac, Mac};
use regex::Regex;
use sha1::Sha1;
use std::sync::OnceLock;

use crate::error::{ErrorKind, ImageError};

type HmacSha1 = Hmac<Sha1>;

/// Name of the query parameter holding the signature
pub const SIGNATURE_PARAM: &str = "sig";

fn signature_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"&?sig=[^&]*").expect("static regex"))
}

/// Hex-encoded HMAC-SHA1 of `query` under `key`
pub fn derive_signature(key: &str, query: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Append a `sig` parameter to `query`
///
/// ```
/// let signed = picbox::security::sign("secret", "url=http://a.b/c.jpg&w=10");
/// assert!(signed.starts_with("url=http://a.b/c.jpg&w=10&sig="));
/// assert!(picbox::security::verify_signature("secret", &signed));
/// ```
pub fn sign(key: &str, query: &str) -> String {
    format!("{}&{}={}", query, SIGNATURE_PARAM, derive_signature(key, query))
}

/// Check the `sig` parameter of `query` against the rest of the query
pub fn verify_signature(key: &str, query: &str) -> bool {
    let unsigned = signature_pattern().replace_all(query, "");
    let expected = derive_signature(key, &unsigned);

    match signature_param(query) {
        Some(provided) => constant_time_compare(&provided, &expected),
        None => false,
    }
}

fn signature_param(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == SIGNATURE_PARAM)
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Fail with `SignatureError` unless the query is signed with `key`
pub fn check_signature(key: Option<&str>, query: &str) -> Result<(), ImageError> {
    match key {
        Some(key) if !verify_signature(key, query) => {
            Err(ImageError::new(ErrorKind::Signature, "Invalid signature"))
        }
        _ => Ok(()),
    }
}

/// Fail with `ClientError` if a client name is configured and `client` differs
pub fn check_client(expected: Option<&str>, client: Option<&str>) -> Result<(), ImageError> {
    match expected {
        Some(name) if client != Some(name) => {
            Err(ImageError::new(ErrorKind::Client, "Invalid client"))
        }
        _ => Ok(()),
    }
}

/// Whether `host` matches an allow-list entry. `*.example.com` matches
/// `example.com` and any subdomain of it.
pub fn host_allowed(allowed: &[String], host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    allowed.iter().any(|entry| {
        let entry = entry.to_ascii_lowercase();
        match entry.strip_prefix("*.") {
            Some(domain) => {
                host == domain
                    || host
                        .strip_suffix(domain)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            None => host == entry,
        }
    })
}

/// Fail with `HostError` if an allow-list is configured and `host` is not on it
pub fn check_host(allowed: &[String], host: Option<&str>) -> Result<(), ImageError> {
    if allowed.is_empty() {
        return Ok(());
    }
    match host {
        Some(host) if host_allowed(allowed, host) => Ok(()),
        _ => Err(ImageError::new(ErrorKind::Host, "Invalid host")),
    }
}
