//! Utility functions for the SDK
//!
//! Time handling, base64 codecs and URL helpers shared by the token, auth
//! and storage modules.
//!
//! Special attention is given to privacy protection: URLs are redacted before
//! they are logged so that query strings carrying tokens never reach the logs.

use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

use crate::error::{SdkError, SdkResult};

/// Format used for profile token timestamps, e.g. `2019-04-09T14:34:11.542Z`
pub const ZULU_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Get the current Unix timestamp in seconds
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Format a Unix timestamp (seconds) as a zulu string with millisecond precision
pub fn format_zulu(timestamp: u64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp as i64, 0) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => String::new(),
    }
}

/// Parse a zulu date string into a Unix timestamp in seconds
pub fn parse_zulu(date_string: &str) -> SdkResult<u64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(date_string, ZULU_FORMAT) {
        return Ok(dt.and_utc().timestamp().max(0) as u64);
    }
    DateTime::parse_from_rfc3339(date_string)
        .map(|dt| dt.timestamp().max(0) as u64)
        .map_err(|e| SdkError::InvalidInput(format!("Invalid date format: {}", e)))
}

/// Read a token timestamp claim
///
/// Accepts a JSON number of seconds, a numeric string, or a zulu date string.
pub fn parse_time_claim(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        serde_json::Value::String(s) => match s.parse::<u64>() {
            Ok(secs) => Some(secs),
            Err(_) => parse_zulu(s).ok(),
        },
        _ => None,
    }
}

/// URL safe Base64 encode data, without padding
pub fn base64url_encode(data: &[u8]) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(data)
}

/// URL safe Base64 decode data; trailing padding is tolerated
pub fn base64url_decode(data: &str) -> SdkResult<Vec<u8>> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .map_err(|e| SdkError::InvalidInput(format!("Base64URL decode error: {}", e)))
}

/// Reduce a URL to its origin: `scheme://host[:port]`
///
/// Ports that are the scheme default are dropped.
pub fn normalize_origin(url_str: &str) -> SdkResult<String> {
    let url =
        Url::parse(url_str).map_err(|e| SdkError::InvalidInput(format!("Invalid URL: {}", e)))?;

    let host = url
        .host_str()
        .ok_or_else(|| SdkError::InvalidInput("URL is missing host".to_string()))?;

    let mut origin = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        origin.push_str(&format!(":{}", port));
    }
    Ok(origin)
}

/// Whether every URL is absolute and shares scheme, host and port
///
/// Missing ports default to 443 for https and 80 for http.
pub fn is_same_origin_absolute_url(urls: &[&str]) -> bool {
    let mut origins = Vec::with_capacity(urls.len());
    for url_str in urls {
        let url = match Url::parse(url_str) {
            Ok(url) => url,
            Err(_) => return false,
        };
        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return false,
        };
        let port = url.port_or_known_default();
        origins.push((url.scheme().to_string(), host, port));
    }

    match origins.split_first() {
        Some((first, rest)) => rest.iter().all(|o| o == first),
        None => true,
    }
}

/// Safely log a URL, redacting query and fragment
pub fn log_url_safely(label: &str, url_str: &str) {
    log::debug!("{}: {}", label, PrivacyUtils::redact_url(url_str));
}

/// Privacy utilities for secure handling of sensitive data
pub struct PrivacyUtils;

impl PrivacyUtils {
    /// Redact sensitive information from URLs for logging or error reporting
    ///
    /// Only scheme, host, port and path survive. Auth requests travel in the
    /// query string, so it is always dropped.
    pub fn redact_url(url_str: &str) -> String {
        match Url::parse(url_str) {
            Ok(url) => {
                let mut redacted = url.scheme().to_string() + "://";

                if let Some(host) = url.host_str() {
                    redacted.push_str(host);
                } else {
                    return "[REDACTED URL]".to_string();
                }

                if let Some(port) = url.port() {
                    redacted.push_str(&format!(":{}", port));
                }

                redacted.push_str(url.path());

                if url.query().is_some() || url.fragment().is_some() {
                    redacted.push_str("[?QUERY_REDACTED]");
                }

                redacted
            }
            Err(_) => "[INVALID URL]".to_string(),
        }
    }
}
