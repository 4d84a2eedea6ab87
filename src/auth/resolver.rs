//! Name lookups
//!
//! Verifying an auth response that carries a username needs the name's
//! owning address. The lookup is an injected capability so callers and
//! tests can substitute their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{DEFAULT_CORE_API_ENDPOINT, NAME_LOOKUP_PATH};
use crate::error::{SdkError, SdkResult};
use crate::network::{HttpRequest, Transport};

/// Record returned by the name service for one name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameInfo {
    /// Address owning the name
    pub address: String,
    pub zonefile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Resolves a username to its name record
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn name_info(&self, username: &str) -> SdkResult<NameInfo>;
}

/// Name resolver querying `GET {lookup_url}/{username}`
#[derive(Clone)]
pub struct HttpNameResolver {
    transport: Arc<dyn Transport>,
    lookup_url: String,
}

impl HttpNameResolver {
    pub fn new<S: Into<String>>(transport: Arc<dyn Transport>, lookup_url: S) -> Self {
        HttpNameResolver {
            transport,
            lookup_url: lookup_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolver using the names endpoint of `core_node`
    pub fn for_core_node(transport: Arc<dyn Transport>, core_node: &str) -> Self {
        Self::new(
            transport,
            format!("{}{}", core_node.trim_end_matches('/'), NAME_LOOKUP_PATH),
        )
    }

    /// Resolver using the default core node
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        Self::for_core_node(transport, DEFAULT_CORE_API_ENDPOINT)
    }

    pub fn lookup_url(&self) -> &str {
        &self.lookup_url
    }
}

#[async_trait]
impl NameResolver for HttpNameResolver {
    async fn name_info(&self, username: &str) -> SdkResult<NameInfo> {
        let url = format!("{}/{}", self.lookup_url, username);
        log::debug!("Looking up name {}", username);

        let response = self
            .transport
            .execute(HttpRequest::get(&url))
            .await
            .map_err(|e| SdkError::NameLookup(e.to_string()))?;
        if !response.is_success() {
            return Err(SdkError::NameLookup(format!(
                "could not fetch name info for {}: HTTP {}",
                username, response.status
            )));
        }

        serde_json::from_slice(&response.body).map_err(|_| {
            SdkError::NameLookup(
                "name info does not contain address or zonefile property".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_url() {
        let transport: Arc<dyn Transport> = Arc::new(crate::network::ReqwestTransport::new());
        let resolver = HttpNameResolver::with_defaults(transport.clone());
        assert_eq!(resolver.lookup_url(), "https://core.blockstack.org/v1/names");

        let custom = HttpNameResolver::new(transport, "http://localhost:6270/v1/names/");
        assert_eq!(custom.lookup_url(), "http://localhost:6270/v1/names");
    }

    #[test]
    fn test_name_info_json() {
        let info: NameInfo = serde_json::from_str(
            r#"{"address":"1NZNxhoxobqwsNvTb16pdeiqvFvce3Yg8U","zonefile":"$ORIGIN alice.id","status":"registered","blockchain":"bitcoin"}"#,
        )
        .unwrap();
        assert_eq!(info.address, "1NZNxhoxobqwsNvTb16pdeiqvFvce3Yg8U");
        assert_eq!(info.status.as_deref(), Some("registered"));
    }

    #[tokio::test]
    async fn test_mock_resolver() {
        let mut resolver = MockNameResolver::new();
        resolver
            .expect_name_info()
            .withf(|name| name == "alice.id")
            .returning(|_| {
                Ok(NameInfo {
                    address: "1NZNxhoxobqwsNvTb16pdeiqvFvce3Yg8U".to_string(),
                    zonefile: String::new(),
                    status: None,
                })
            });

        let info = resolver.name_info("alice.id").await.unwrap();
        assert_eq!(info.address, "1NZNxhoxobqwsNvTb16pdeiqvFvce3Yg8U");
    }
}
