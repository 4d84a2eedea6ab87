//! Profile lookup
//!
//! username -> name record -> zone file -> token file URI -> token file ->
//! verified profile claim.

use serde_json::Value;

use super::tokens::extract_profile;
use super::zone_file::parse_zone_file;
use crate::auth::NameResolver;
use crate::error::{SdkError, SdkResult};
use crate::models::Profile;
use crate::network::{HttpRequest, Transport};

/// Fetch a token file and extract the profile of its first token
pub async fn fetch_profile_from_token_file(
    transport: &dyn Transport,
    token_file_uri: &str,
    public_key_or_address: Option<&str>,
) -> SdkResult<Option<Profile>> {
    let response = transport.execute(HttpRequest::get(token_file_uri)).await?;
    if !response.is_success() {
        log::warn!(
            "Token file {} returned HTTP {}",
            token_file_uri,
            response.status
        );
        return Ok(None);
    }

    let records: Value = response.json()?;
    let token = records
        .get(0)
        .and_then(|record| record.get("token"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            SdkError::InvalidToken(format!("token file {} holds no token", token_file_uri))
        })?;

    extract_profile(token, public_key_or_address)
}

/// Resolve a zone file to the profile it points at
///
/// Zone files without a URI record are tried as a legacy JSON profile.
pub async fn resolve_zone_file_to_profile(
    transport: &dyn Transport,
    zone_file_content: &str,
    public_key_or_address: Option<&str>,
) -> SdkResult<Option<Profile>> {
    let zone_file = parse_zone_file(zone_file_content);
    match zone_file.token_file_uri() {
        Some(uri) => fetch_profile_from_token_file(transport, &uri, public_key_or_address).await,
        None => match serde_json::from_str::<Value>(zone_file_content) {
            Ok(legacy) if legacy.is_object() => {
                log::debug!("Zone file is a legacy JSON profile");
                Ok(Some(Profile::new(legacy)))
            }
            _ => Ok(None),
        },
    }
}

/// Look up the profile published for `username`
///
/// A name without a resolvable profile yields an empty profile.
pub async fn lookup_profile(
    resolver: &dyn NameResolver,
    transport: &dyn Transport,
    username: &str,
) -> SdkResult<Profile> {
    let name_info = resolver.name_info(username).await?;
    let profile =
        resolve_zone_file_to_profile(transport, &name_info.zonefile, Some(&name_info.address))
            .await?;
    Ok(profile.unwrap_or_else(|| Profile::new(Value::Object(Default::default()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MockNameResolver, NameInfo};
    use crate::models::Entity;
    use crate::network::HttpResponse;
    use crate::profile::sign_profile_token;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;

    const PRIVATE_KEY: &str = "a5c61c6ca7b3e7e55edee68566aeab22e4da26baa285c7bd10e8d2218aa3b229";
    const PUBLIC_KEY: &str = "027d28f9951ce46538951e3697c62588a87f1f1f295de4a14fdd4c780fc52cfe69";
    const ADDRESS: &str = "1NZNxhoxobqwsNvTb16pdeiqvFvce3Yg8U";
    const TOKEN_FILE_URL: &str = "https://gaia.example.com/hub/1NZN/profile.json";

    struct StubTransport {
        routes: HashMap<String, (u16, Vec<u8>)>,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn execute(&self, request: HttpRequest) -> SdkResult<HttpResponse> {
            let (status, body) = self
                .routes
                .get(&request.url)
                .cloned()
                .unwrap_or((404, Vec::new()));
            Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body,
            })
        }
    }

    fn token_file() -> Vec<u8> {
        let pair = sign_profile_token(
            &Profile::new(json!({"@type": "Person", "name": "Alice"})),
            PRIVATE_KEY,
            &Entity::new(PUBLIC_KEY),
            &Entity::new(PUBLIC_KEY),
            None,
            None,
        )
        .unwrap();
        serde_json::to_vec(&json!([pair])).unwrap()
    }

    fn transport() -> StubTransport {
        let mut routes = HashMap::new();
        routes.insert(TOKEN_FILE_URL.to_string(), (200, token_file()));
        StubTransport { routes }
    }

    fn zone_file() -> String {
        format!(
            "$ORIGIN alice.id\n$TTL 3600\n_http._tcp IN URI 10 1 \"{}\"\n",
            TOKEN_FILE_URL
        )
    }

    #[tokio::test]
    async fn test_lookup_profile() {
        let mut resolver = MockNameResolver::new();
        resolver.expect_name_info().returning(|_| {
            Ok(NameInfo {
                address: ADDRESS.to_string(),
                zonefile: zone_file(),
                status: None,
            })
        });

        let profile = lookup_profile(&resolver, &transport(), "alice.id").await.unwrap();
        assert_eq!(profile.name(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_lookup_profile_wrong_owner() {
        let mut resolver = MockNameResolver::new();
        resolver.expect_name_info().returning(|_| {
            Ok(NameInfo {
                address: "1BoatSLRHtKNngkdXEeobR76b53LETtpyT".to_string(),
                zonefile: zone_file(),
                status: None,
            })
        });

        let err = lookup_profile(&resolver, &transport(), "alice.id").await.unwrap_err();
        assert!(matches!(err, SdkError::SignatureVerification(_)));
    }

    #[tokio::test]
    async fn test_missing_token_file() {
        let zone_file = "_http._tcp IN URI 10 1 \"https://gaia.example.com/missing.json\"";
        let profile = resolve_zone_file_to_profile(&transport(), zone_file, Some(ADDRESS))
            .await
            .unwrap();
        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn test_legacy_json_zone_file() {
        let legacy = r#"{"name": {"formatted": "Alice"}, "bio": "hi"}"#;
        let profile = resolve_zone_file_to_profile(&transport(), legacy, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.json()["bio"], "hi");
    }
}
