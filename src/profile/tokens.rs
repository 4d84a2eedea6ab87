//! Profile tokens
//!
//! A profile is published as a signed token whose `claim` is the profile
//! JSON, with `subject` and `issuer` naming the keys involved. Timestamps
//! are zulu strings rather than epoch seconds.

use serde_json::json;
use uuid::Uuid;

use crate::crypto::{
    decode_token, parse_public_key, public_key_to_btc_address, public_key_to_stx_address,
    DecodedToken, StacksNetwork, TokenSigner, TokenVerifier,
};
use crate::error::{SdkError, SdkResult};
use crate::models::{Entity, Profile, ProfileTokenPair};
use crate::utils::{current_timestamp, format_zulu};

/// Default lifetime of a profile token
pub const PROFILE_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 3600;

/// Decode a token and bundle it with its decoded form
pub fn wrap_profile_token(token: &str) -> SdkResult<ProfileTokenPair> {
    let decoded = decode_token(token)?;
    Ok(ProfileTokenPair::new(token.to_string(), &decoded))
}

/// Sign `profile` as a profile token
///
/// `issued_at` defaults to now and `expires_at` to one year later.
pub fn sign_profile_token(
    profile: &Profile,
    private_key_hex: &str,
    subject: &Entity,
    issuer: &Entity,
    issued_at: Option<u64>,
    expires_at: Option<u64>,
) -> SdkResult<ProfileTokenPair> {
    let issued_at = issued_at.unwrap_or_else(current_timestamp);
    let expires_at = expires_at.unwrap_or(issued_at + PROFILE_TOKEN_LIFETIME_SECS);

    let payload = json!({
        "jti": Uuid::new_v4().to_string(),
        "iat": format_zulu(issued_at),
        "exp": format_zulu(expires_at),
        "subject": subject,
        "issuer": issuer,
        "claim": profile,
    });

    let token = TokenSigner::new(private_key_hex)?.sign(&payload)?;
    wrap_profile_token(&token)
}

fn entity_public_key<'a>(decoded: &'a DecodedToken, field: &str, article: &str) -> SdkResult<&'a str> {
    let entity = decoded
        .payload
        .get(field)
        .ok_or_else(|| SdkError::InvalidToken(format!("Token doesn't have {} {}", article, field)))?;
    entity
        .get("publicKey")
        .and_then(|pk| pk.as_str())
        .ok_or_else(|| {
            SdkError::InvalidToken(format!("Token doesn't have {} {} public key", article, field))
        })
}

/// Verify a profile token against a public key or an address
///
/// `public_key_or_address` may be the issuer's public key, its BTC address
/// or its `S`-prefixed STX address.
pub fn verify_profile_token(token: &str, public_key_or_address: &str) -> SdkResult<DecodedToken> {
    let decoded = decode_token(token)?;

    entity_public_key(&decoded, "subject", "a")?;
    let issuer_public_key = entity_public_key(&decoded, "issuer", "an")?.to_string();
    if decoded.payload.get("claim").is_none() {
        return Err(SdkError::InvalidToken("Token doesn't have a claim".to_string()));
    }

    let public_key = parse_public_key(&issuer_public_key)?;
    let matches_issuer = public_key_or_address == issuer_public_key
        || public_key_or_address == public_key_to_btc_address(&public_key)
        || public_key_or_address
            == public_key_to_stx_address(&public_key, StacksNetwork::Mainnet, true);
    if !matches_issuer {
        return Err(SdkError::SignatureVerification(
            "Token issuer public key does not match the verifying value".to_string(),
        ));
    }

    if !TokenVerifier::new(&issuer_public_key)?.verify_decoded(&decoded)? {
        return Err(SdkError::SignatureVerification(
            "Token was not signed by the issuer public key".to_string(),
        ));
    }

    Ok(decoded)
}

/// Profile claimed by a token, verified first when a key or address is given
pub fn extract_profile(token: &str, public_key_or_address: Option<&str>) -> SdkResult<Option<Profile>> {
    let decoded = match public_key_or_address {
        Some(expected) => verify_profile_token(token, expected)?,
        None => decode_token(token)?,
    };

    Ok(decoded
        .payload
        .get("claim")
        .filter(|claim| claim.is_object())
        .cloned()
        .map(Profile::new))
}
