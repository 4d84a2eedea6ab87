//! Auth requests
//!
//! An auth request is a token signed by a throwaway transit key. The
//! authenticator answers it with an auth response whose app private key is
//! encrypted to the transit public key.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::did::make_did_from_address;
use crate::config::{AppConfig, Scope, DEFAULT_BLOCKSTACK_ID_HOST, VERSION};
use crate::crypto::{get_public_key_from_private, make_ec_private_key, public_key_to_address, TokenSigner};
use crate::error::{SdkError, SdkResult};
use crate::session_store::SessionStore;
use crate::utils::{current_timestamp, normalize_origin};

/// Default lifetime of an auth request
pub const AUTH_REQUEST_LIFETIME_SECS: u64 = 7 * 24 * 3600;

/// Client name announced in auth requests
pub const CLIENT_NAME: &str = "android";

/// Create a transit key and remember it for the pending sign-in
pub fn generate_and_store_transit_key(store: &dyn SessionStore) -> SdkResult<String> {
    let transit_key = make_ec_private_key();
    let mut data = store.session_data()?;
    data.transit_key = Some(transit_key.clone());
    store.set_session_data(data)?;
    log::debug!("Stored new transit key");
    Ok(transit_key)
}

/// Build and sign an auth request for `config`
///
/// `expires_at` is in seconds and defaults to a week from now. Values in
/// `extra_params` must be booleans or strings; they are merged into the
/// payload last.
pub fn make_auth_request(
    config: &AppConfig,
    transit_private_key: &str,
    expires_at: Option<u64>,
    send_to_sign_in: bool,
    extra_params: Option<&Map<String, Value>>,
) -> SdkResult<String> {
    let domain_name = normalize_origin(&config.app_domain)?;
    let transit_public_key = get_public_key_from_private(transit_private_key)?;
    let issuer = make_did_from_address(&public_key_to_address(&transit_public_key)?);
    let now = current_timestamp();

    let mut payload = json!({
        "jti": Uuid::new_v4().to_string(),
        "iat": now,
        "exp": expires_at.unwrap_or(now + AUTH_REQUEST_LIFETIME_SECS),
        "iss": issuer,
        "public_keys": [transit_public_key],
        "domain_name": domain_name,
        "manifest_uri": format!("{}{}", domain_name, config.manifest_path),
        "redirect_uri": format!("{}{}", domain_name, config.redirect_path),
        "version": VERSION,
        "do_not_include_profile": true,
        "supports_hub_url": true,
        "scopes": Scope::names(&config.scopes),
        "sendToSignIn": send_to_sign_in,
        "client": CLIENT_NAME,
    });

    if let Some(details) = &config.app_details {
        payload["appDetails"] = json!({ "name": details.name, "icon": details.icon });
    }

    if let Some(extra) = extra_params {
        for (key, value) in extra {
            if !(value.is_boolean() || value.is_string()) {
                return Err(SdkError::InvalidInput(format!(
                    "extra parameter '{}' must be a boolean or a string",
                    key
                )));
            }
            payload[key.as_str()] = value.clone();
        }
    }

    Ok(TokenSigner::new(transit_private_key)?.sign(&payload)?)
}

/// Authenticator URL that asks the user to approve `auth_request`
pub fn redirect_url(authenticator_url: Option<&str>, auth_request: &str, send_to_sign_in: bool) -> String {
    let host = authenticator_url
        .unwrap_or(DEFAULT_BLOCKSTACK_ID_HOST)
        .trim_end_matches('/');
    let path = if send_to_sign_in { "sign-in" } else { "sign-up" };
    format!("{}/#/{}?authRequest={}", host, path, auth_request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppDetails;
    use crate::crypto::{decode_token, TokenVerifier};
    use crate::session_store::InMemorySessionStore;

    const TRANSIT_KEY: &str = "a5c61c6ca7b3e7e55edee68566aeab22e4da26baa285c7bd10e8d2218aa3b229";
    const TRANSIT_PUBLIC_KEY: &str = "027d28f9951ce46538951e3697c62588a87f1f1f295de4a14fdd4c780fc52cfe69";

    fn config() -> AppConfig {
        AppConfig::from_domain("https://flamboyant-darwin-d11c17.netlify.app").unwrap()
    }

    #[test]
    fn test_make_auth_request() {
        let token = make_auth_request(&config(), TRANSIT_KEY, None, false, None).unwrap();
        assert!(TokenVerifier::new(TRANSIT_PUBLIC_KEY).unwrap().verify(&token).unwrap());

        let payload = decode_token(&token).unwrap().payload;
        assert_eq!(payload["iss"], "did:btc-addr:1NZNxhoxobqwsNvTb16pdeiqvFvce3Yg8U");
        assert_eq!(payload["public_keys"][0], TRANSIT_PUBLIC_KEY);
        assert_eq!(payload["domain_name"], "https://flamboyant-darwin-d11c17.netlify.app");
        assert_eq!(
            payload["redirect_uri"],
            "https://flamboyant-darwin-d11c17.netlify.app/redirect"
        );
        assert_eq!(
            payload["manifest_uri"],
            "https://flamboyant-darwin-d11c17.netlify.app/manifest.json"
        );
        assert_eq!(payload["scopes"], json!(["store_write"]));
        assert_eq!(payload["version"], VERSION);
        assert_eq!(payload["client"], "android");
        assert_eq!(payload["sendToSignIn"], false);
        assert!(payload.get("appDetails").is_none());

        let iat = payload["iat"].as_u64().unwrap();
        assert_eq!(payload["exp"].as_u64().unwrap(), iat + AUTH_REQUEST_LIFETIME_SECS);
    }

    #[test]
    fn test_app_details_and_extra_params() {
        let config = config().with_app_details(AppDetails {
            name: "Demo".to_string(),
            icon: "https://example.com/icon.png".to_string(),
        });
        let mut extra = Map::new();
        extra.insert("solicitGaiaHubUrl".to_string(), json!(true));
        extra.insert("recipe".to_string(), json!("cake"));

        let token = make_auth_request(&config, TRANSIT_KEY, Some(4_102_444_800), true, Some(&extra)).unwrap();
        let payload = decode_token(&token).unwrap().payload;
        assert_eq!(payload["appDetails"]["name"], "Demo");
        assert_eq!(payload["solicitGaiaHubUrl"], true);
        assert_eq!(payload["recipe"], "cake");
        assert_eq!(payload["exp"], 4_102_444_800u64);
        assert_eq!(payload["sendToSignIn"], true);
    }

    #[test]
    fn test_unsupported_extra_param() {
        let mut extra = Map::new();
        extra.insert("count".to_string(), json!(3));
        let err = make_auth_request(&config(), TRANSIT_KEY, None, false, Some(&extra)).unwrap_err();
        assert!(matches!(err, SdkError::InvalidInput(_)));
    }

    #[test]
    fn test_redirect_url() {
        assert_eq!(
            redirect_url(None, "abc", false),
            "https://app.blockstack.org/#/sign-up?authRequest=abc"
        );
        assert_eq!(
            redirect_url(Some("https://auth.example.com/"), "abc", true),
            "https://auth.example.com/#/sign-in?authRequest=abc"
        );
    }

    #[test]
    fn test_generate_and_store_transit_key() {
        let store = InMemorySessionStore::new();
        let key = generate_and_store_transit_key(&store).unwrap();
        assert_eq!(key.len(), 64);
        assert_eq!(store.session_data().unwrap().transit_key, Some(key));
    }
}
