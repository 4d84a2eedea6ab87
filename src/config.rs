//! Application configuration and protocol defaults

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{SdkError, SdkResult};

/// Default Gaia hub used when an auth response names none
pub const DEFAULT_GAIA_HUB_URL: &str = "https://hub.blockstack.org";

/// Default Blockstack core API endpoint
pub const DEFAULT_CORE_API_ENDPOINT: &str = "https://core.blockstack.org";

/// Default authenticator that receives auth requests
pub const DEFAULT_BLOCKSTACK_ID_HOST: &str = "https://app.blockstack.org";

/// Path of the name lookup API below a core node
pub const NAME_LOOKUP_PATH: &str = "/v1/names/";

/// Protocol version stamped on auth tokens
pub const VERSION: &str = "1.3.1";

/// Key under which session data is persisted
pub const SESSION_STORE_KEY: &str = "blockstack_session";

/// Permissions an application asks for at sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Read and write data to the user's Gaia hub in an app-specific bucket
    #[serde(rename = "store_write")]
    StoreWrite,
    /// Publish data so other users of the app can discover and interact with the user
    #[serde(rename = "publish_data")]
    PublishData,
    /// Request the user's email if available
    #[serde(rename = "email")]
    Email,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::StoreWrite, Scope::PublishData, Scope::Email];

    /// Wire name, e.g. `store_write`
    pub fn name(&self) -> &'static str {
        match self {
            Scope::StoreWrite => "store_write",
            Scope::PublishData => "publish_data",
            Scope::Email => "email",
        }
    }

    /// Wire names of several scopes
    pub fn names(scopes: &[Scope]) -> Vec<String> {
        scopes.iter().map(|s| s.name().to_string()).collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scope {
    type Err = SdkError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .iter()
            .find(|s| s.name() == name)
            .copied()
            .ok_or_else(|| {
                SdkError::InvalidInput(format!(
                    "scope '{}' not defined, available scopes: {}",
                    name,
                    Scope::ALL
                        .iter()
                        .map(|s| s.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Name and icon shown by the authenticator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDetails {
    pub name: String,
    pub icon: String,
}

/// Configuration of the application using the SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Origin of the app, e.g. `https://example.com`
    pub app_domain: String,
    pub redirect_path: String,
    pub manifest_path: String,
    pub scopes: Vec<Scope>,
    /// Core node for name lookups; defaults to `DEFAULT_CORE_API_ENDPOINT`
    pub core_node: Option<String>,
    /// Authenticator base URL; defaults to `DEFAULT_BLOCKSTACK_ID_HOST`
    pub authenticator_url: Option<String>,
    pub app_details: Option<AppDetails>,
}

impl AppConfig {
    /// Configuration with default paths and the `store_write` scope
    pub fn from_domain(app_domain: &str) -> SdkResult<Self> {
        let url = Url::parse(app_domain)
            .map_err(|e| SdkError::InvalidInput(format!("Invalid app domain: {}", e)))?;
        if url.host_str().is_none() {
            return Err(SdkError::InvalidInput(format!(
                "App domain has no host: {}",
                app_domain
            )));
        }

        Ok(AppConfig {
            app_domain: app_domain.trim_end_matches('/').to_string(),
            redirect_path: "/redirect".to_string(),
            manifest_path: "/manifest.json".to_string(),
            scopes: vec![Scope::StoreWrite],
            core_node: None,
            authenticator_url: None,
            app_details: None,
        })
    }

    pub fn with_scopes(mut self, scopes: Vec<Scope>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_redirect_path<S: Into<String>>(mut self, path: S) -> Self {
        self.redirect_path = path.into();
        self
    }

    pub fn with_manifest_path<S: Into<String>>(mut self, path: S) -> Self {
        self.manifest_path = path.into();
        self
    }

    pub fn with_core_node<S: Into<String>>(mut self, core_node: S) -> Self {
        self.core_node = Some(core_node.into());
        self
    }

    pub fn with_authenticator_url<S: Into<String>>(mut self, url: S) -> Self {
        self.authenticator_url = Some(url.into());
        self
    }

    pub fn with_app_details(mut self, details: AppDetails) -> Self {
        self.app_details = Some(details);
        self
    }

    /// Core node in use
    pub fn core_node(&self) -> &str {
        self.core_node
            .as_deref()
            .unwrap_or(DEFAULT_CORE_API_ENDPOINT)
    }

    /// Name lookup base, e.g. `https://core.blockstack.org/v1/names/`
    pub fn name_lookup_url(&self) -> String {
        format!("{}{}", self.core_node().trim_end_matches('/'), NAME_LOOKUP_PATH)
    }

    pub fn authenticator_url(&self) -> &str {
        self.authenticator_url
            .as_deref()
            .unwrap_or(DEFAULT_BLOCKSTACK_ID_HOST)
    }
}
