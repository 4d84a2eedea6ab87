//! HTTP transport
//!
//! The SDK talks to Gaia hubs and name services through the `Transport`
//! trait so hosts can bring their own HTTP stack. `ReqwestTransport` is the
//! default implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use crate::error::{SdkError, SdkResult};
use crate::utils::PrivacyUtils;

/// Header sent with every request
pub const REFERRER_POLICY_HEADER: (&str, &str) = ("Referrer-Policy", "no-referrer");

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        })
    }
}

/// Outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    fn new(method: Method, url: &str) -> Self {
        HttpRequest {
            method,
            url: url.to_string(),
            headers: vec![(
                REFERRER_POLICY_HEADER.0.to_string(),
                REFERRER_POLICY_HEADER.1.to_string(),
            )],
            body: None,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: &str, body: Vec<u8>) -> Self {
        let mut request = Self::new(Method::Post, url);
        request.body = Some(body);
        request
    }

    pub fn delete(url: &str) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds `Authorization: bearer <token>`
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("bearer {}", token))
    }
}

/// Response as seen by the SDK
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn text(&self) -> SdkResult<String> {
        Ok(String::from_utf8(self.body.clone())?)
    }

    pub fn json(&self) -> SdkResult<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-2xx response into a `RemoteServiceError`
    pub fn error_for_status(self, context: &str) -> SdkResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            let detail = String::from_utf8_lossy(&self.body);
            Err(SdkError::RemoteServiceError(format!(
                "{}: HTTP {} {}",
                context,
                self.status,
                detail.trim()
            )))
        }
    }
}

/// Executes HTTP requests
///
/// Non-2xx statuses are returned as responses. Only failures to reach the
/// server at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> SdkResult<HttpResponse>;
}

/// `Transport` backed by a `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> SdkResult<HttpResponse> {
        let started = Instant::now();
        let safe_url = PrivacyUtils::redact_url(&request.url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            SdkError::NetworkError(format!("{} {} failed: {}", request.method, safe_url, e))
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| SdkError::NetworkError(format!("Failed to read response body: {}", e)))?
            .to_vec();

        log::debug!(
            "{} {} -> {} ({} bytes, {} ms)",
            request.method,
            safe_url,
            status,
            body.len(),
            started.elapsed().as_millis()
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
