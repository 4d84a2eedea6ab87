//! Gaia hub wire protocol

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{AuthScope, GaiaHubConfig, StorageError};
use crate::crypto::{get_public_key_from_private, public_key_to_address, random_bytes, TokenSigner};
use crate::error::{SdkError, SdkResult};
use crate::network::{HttpRequest, HttpResponse, Transport};
use crate::utils::PrivacyUtils;

/// Response of `GET {hub}/hub_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubInfo {
    pub read_url_prefix: String,
    pub challenge_text: String,
    /// e.g. `v1`
    #[serde(default)]
    pub latest_auth_version: Option<String>,
}

impl HubInfo {
    /// Numeric auth version, `v1` -> 1
    pub fn auth_version(&self) -> Option<u32> {
        self.latest_auth_version
            .as_deref()
            .and_then(|v| v.strip_prefix('v'))
            .and_then(|v| v.parse().ok())
    }
}

/// One page of `list-files`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListFilesPage {
    #[serde(default)]
    pub entries: Vec<String>,
    /// Cursor of the next page; absent on the last page
    #[serde(default)]
    pub page: Option<String>,
}

fn check_status(response: HttpResponse, url: &str) -> SdkResult<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(StorageError::HttpStatus {
            url: PrivacyUtils::redact_url(url),
            status: response.status,
        }
        .into())
    }
}

/// Client for one or more Gaia hubs
#[derive(Clone)]
pub struct GaiaHub {
    transport: Arc<dyn Transport>,
}

impl GaiaHub {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        GaiaHub { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub async fn hub_info(&self, hub_url: &str) -> SdkResult<HubInfo> {
        let url = format!("{}/hub_info", hub_url.trim_end_matches('/'));
        let response = check_status(self.transport.execute(HttpRequest::get(&url)).await?, &url)?;
        serde_json::from_slice(&response.body)
            .map_err(|e| StorageError::InvalidHubInfo(e.to_string()).into())
    }

    /// Connect to a hub, minting a write token signed by `signer_key_hex`
    pub async fn connect(
        &self,
        hub_url: &str,
        signer_key_hex: &str,
        association_token: Option<&str>,
        scopes: &[AuthScope],
    ) -> SdkResult<GaiaHubConfig> {
        log::info!("Connecting to Gaia hub {}", hub_url);
        let hub_info = self.hub_info(hub_url).await?;
        let token =
            make_v1_gaia_auth_token(&hub_info, signer_key_hex, hub_url, association_token, scopes)?;
        let address = public_key_to_address(&get_public_key_from_private(signer_key_hex)?)?;

        Ok(GaiaHubConfig {
            url_prefix: hub_info.read_url_prefix,
            address,
            token,
            server: hub_url.trim_end_matches('/').to_string(),
        })
    }

    /// Store `content` at `path`, returning the public read URL
    pub async fn upload(
        &self,
        config: &GaiaHubConfig,
        path: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> SdkResult<String> {
        let url = format!("{}/store/{}/{}", config.server, config.address, path);
        let request = HttpRequest::post(&url, content)
            .header("Content-Type", content_type)
            .bearer(&config.token);
        let response = check_status(self.transport.execute(request).await?, &url)?;

        let public_url = response
            .json()
            .ok()
            .and_then(|body| body.get("publicURL").and_then(Value::as_str).map(String::from));
        Ok(public_url.unwrap_or_else(|| super::get_full_read_url(path, config)))
    }

    pub async fn delete(&self, config: &GaiaHubConfig, path: &str) -> SdkResult<()> {
        let url = format!("{}/delete/{}/{}", config.server, config.address, path);
        let request = HttpRequest::delete(&url).bearer(&config.token);
        check_status(self.transport.execute(request).await?, &url)?;
        Ok(())
    }

    pub async fn list_files_page(
        &self,
        config: &GaiaHubConfig,
        page: Option<&str>,
    ) -> SdkResult<ListFilesPage> {
        let url = format!("{}/list-files/{}", config.server, config.address);
        let body = serde_json::to_vec(&json!({ "page": page }))?;
        let request = HttpRequest::post(&url, body)
            .header("Content-Type", "application/json")
            .bearer(&config.token);
        let response = check_status(self.transport.execute(request).await?, &url)?;

        serde_json::from_slice(&response.body)
            .map_err(|e| StorageError::InvalidResponse(format!("list-files: {}", e)).into())
    }

    /// Plain GET; the status is left for the caller to judge
    pub async fn fetch(&self, url: &str) -> SdkResult<HttpResponse> {
        self.transport.execute(HttpRequest::get(url)).await
    }
}

/// Sign the hub challenge into a `v1:` bearer token
pub fn make_v1_gaia_auth_token(
    hub_info: &HubInfo,
    signer_key_hex: &str,
    hub_url: &str,
    association_token: Option<&str>,
    scopes: &[AuthScope],
) -> SdkResult<String> {
    match hub_info.auth_version() {
        Some(version) if version >= 1 => {}
        _ => {
            return Err(SdkError::UnsupportedHub(format!(
                "only v1 auth is supported, hub reports {:?}",
                hub_info.latest_auth_version
            )))
        }
    }

    let payload = json!({
        "gaiaChallenge": hub_info.challenge_text,
        "hubUrl": hub_url,
        "iss": get_public_key_from_private(signer_key_hex)?,
        "salt": hex::encode(random_bytes(16)),
        "associationToken": association_token,
        "scopes": scopes,
    });

    let token = TokenSigner::new(signer_key_hex)?.sign(&payload)?;
    Ok(format!("v1:{}", token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::token::decode_token;
    use crate::crypto::TokenVerifier;

    const PRIVATE_KEY: &str = "a5c61c6ca7b3e7e55edee68566aeab22e4da26baa285c7bd10e8d2218aa3b229";
    const PUBLIC_KEY: &str = "027d28f9951ce46538951e3697c62588a87f1f1f295de4a14fdd4c780fc52cfe69";

    fn hub_info(version: Option<&str>) -> HubInfo {
        HubInfo {
            read_url_prefix: "https://gaia.blockstack.org/hub/".to_string(),
            challenge_text: r#"["gaiahub","0","storage2.blockstack.org","blockstack_storage_please_sign"]"#
                .to_string(),
            latest_auth_version: version.map(String::from),
        }
    }

    #[test]
    fn test_auth_version() {
        assert_eq!(hub_info(Some("v1")).auth_version(), Some(1));
        assert_eq!(hub_info(Some("v12")).auth_version(), Some(12));
        assert_eq!(hub_info(Some("x")).auth_version(), None);
        assert_eq!(hub_info(None).auth_version(), None);
    }

    #[test]
    fn test_v1_token() {
        let token = make_v1_gaia_auth_token(
            &hub_info(Some("v1")),
            PRIVATE_KEY,
            "https://hub.blockstack.org",
            None,
            &[AuthScope::collection()],
        )
        .unwrap();

        let jwt = token.strip_prefix("v1:").unwrap();
        let decoded = decode_token(jwt).unwrap();
        assert_eq!(decoded.claim_str("iss"), Some(PUBLIC_KEY));
        assert_eq!(decoded.claim_str("hubUrl"), Some("https://hub.blockstack.org"));
        assert_eq!(decoded.claim_str("salt").unwrap().len(), 32);
        assert!(decoded.payload["associationToken"].is_null());
        assert_eq!(decoded.payload["scopes"][0]["scope"], "putFileArchivalPrefix");
        assert!(TokenVerifier::new(PUBLIC_KEY).unwrap().verify(jwt).unwrap());
    }

    #[test]
    fn test_old_hub_rejected() {
        let err = make_v1_gaia_auth_token(&hub_info(Some("v0")), PRIVATE_KEY, "https://hub", None, &[])
            .unwrap_err();
        assert!(matches!(err, SdkError::UnsupportedHub(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_list_page_parsing() {
        let page: ListFilesPage =
            serde_json::from_str(r#"{"entries":["a.txt","b.txt"],"page":null}"#).unwrap();
        assert_eq!(page.entries, vec!["a.txt", "b.txt"]);
        assert!(page.page.is_none());

        let empty: ListFilesPage = serde_json::from_str("{}").unwrap();
        assert!(empty.entries.is_empty());
    }
}
