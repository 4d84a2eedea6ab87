//! Auth responses
//!
//! Built on the authenticator side: the app private key for the requesting
//! origin is derived from the account, encrypted to the transit key from the
//! request and signed into a token with the identity key.

use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::did::make_did_from_address;
use super::resolver::NameResolver;
use crate::config::{Scope, DEFAULT_CORE_API_ENDPOINT, DEFAULT_GAIA_HUB_URL, VERSION};
use crate::crypto::{decode_token, encrypt_ecies, Account, Payload, TokenSigner};
use crate::error::{SdkError, SdkResult};
use crate::models::Profile;
use crate::network::Transport;
use crate::profile::lookup_profile;
use crate::utils::current_timestamp;

/// Lifetime of an auth response
pub const AUTH_RESPONSE_LIFETIME_SECS: u64 = 30 * 24 * 3600;

/// Answers auth requests on behalf of accounts
pub struct Authenticator {
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn NameResolver>,
}

impl Authenticator {
    pub fn new(transport: Arc<dyn Transport>, resolver: Arc<dyn NameResolver>) -> Self {
        Authenticator { transport, resolver }
    }

    /// Answer `auth_request`, encrypting the app key to its transit key
    pub async fn make_auth_response(
        &self,
        account: &Account,
        auth_request: &str,
        scopes: &[Scope],
    ) -> SdkResult<String> {
        let request = decode_token(auth_request)?;
        let transit_public_key = request
            .payload
            .get("public_keys")
            .and_then(|keys| keys.get(0))
            .and_then(Value::as_str)
            .ok_or_else(|| SdkError::InvalidToken("auth request has no public key".to_string()))?;
        let domain_name = request
            .claim_str("domain_name")
            .ok_or_else(|| SdkError::InvalidToken("auth request has no domain_name".to_string()))?;

        let app_node = account.apps_node()?.app_node(domain_name)?;
        let cipher = encrypt_ecies(transit_public_key, &Payload::Text(app_node.private_key_hex()))?;
        let private_key = hex::encode(cipher.to_json_string());

        log::info!("Making auth response for {}", domain_name);
        self.make_auth_response_token(account, Some(private_key), scopes)
            .await
    }

    /// Auth response carrying the app private key in the clear
    pub async fn make_auth_response_unencrypted(
        &self,
        account: &Account,
        domain_name: &str,
        scopes: &[Scope],
    ) -> SdkResult<String> {
        let app_node = account.apps_node()?.app_node(domain_name)?;
        self.make_auth_response_token(account, Some(app_node.private_key_hex()), scopes)
            .await
    }

    async fn make_auth_response_token(
        &self,
        account: &Account,
        private_key: Option<String>,
        scopes: &[Scope],
    ) -> SdkResult<String> {
        let profile = match account.username.as_deref().filter(|u| !u.is_empty()) {
            Some(username) => {
                lookup_profile(self.resolver.as_ref(), self.transport.as_ref(), username).await?
            }
            None => Profile::new(json!({})),
        };

        let email = if scopes.contains(&Scope::Email) {
            account.metadata.email.clone().unwrap_or_default()
        } else {
            String::new()
        };

        let now = current_timestamp();
        let payload = json!({
            "jti": Uuid::new_v4().to_string(),
            "iat": now,
            "exp": now + AUTH_RESPONSE_LIFETIME_SECS,
            "iss": make_did_from_address(&account.owner_address()),
            "private_key": private_key,
            "public_keys": [account.keys.public_key_hex()],
            "profile": profile,
            "username": account.username.clone().unwrap_or_default(),
            "email": email,
            "profile_url": Value::Null,
            "hubUrl": DEFAULT_GAIA_HUB_URL,
            "blockstackAPIUrl": DEFAULT_CORE_API_ENDPOINT,
            "associationToken": Value::Null,
            "version": VERSION,
        });

        Ok(TokenSigner::new(&account.keys.private_key_hex())?.sign(&payload)?)
    }
}
