//! Verification of auth tokens
//!
//! Every check reports its own error so callers can tell an expired token
//! from a forged one. A failed name lookup is a `NameLookup` error and never
//! a signature failure.

use serde_json::Value;

use super::did::get_address_from_did;
use super::resolver::NameResolver;
use crate::crypto::{decode_token, public_key_to_address, DecodedToken, TokenVerifier};
use crate::error::{SdkError, SdkResult};
use crate::utils::{base64url_decode, current_timestamp, is_same_origin_absolute_url, parse_time_claim};

const INVALID_RESPONSE: &str = "The authResponse parameter is an invalid base64 encoded token";

/// Cheap shape check of an auth response before any crypto
///
/// The token needs three segments and a header of type `JWT`.
pub fn check_auth_response_format(auth_response: &str) -> SdkResult<()> {
    let parts: Vec<&str> = auth_response.split('.').collect();
    if parts.len() != 3 {
        return Err(SdkError::Unknown(format!(
            "{}\n2 dots requires\nAuth response: {}",
            INVALID_RESPONSE, auth_response
        )));
    }

    let header = base64url_decode(parts[0])
        .map_err(|e| SdkError::Unknown(format!("{}\n{}", INVALID_RESPONSE, e)))?;
    let header: Value = serde_json::from_slice(&header).map_err(|e| {
        SdkError::Unknown(format!(
            "The authResponse parameter is an invalid json token\n{}",
            e
        ))
    })?;

    match header.get("typ").and_then(Value::as_str) {
        Some("JWT") => Ok(()),
        other => Err(SdkError::Unknown(format!(
            "{}\nHeader not of type JWT:{}",
            INVALID_RESPONSE,
            other.unwrap_or("")
        ))),
    }
}

fn time_claim(decoded: &DecodedToken, name: &str) -> SdkResult<u64> {
    decoded
        .payload
        .get(name)
        .and_then(parse_time_claim)
        .ok_or_else(|| SdkError::InvalidToken(format!("token has no valid '{}' claim", name)))
}

fn check_dates(decoded: &DecodedToken) -> SdkResult<()> {
    let now = current_timestamp();
    if time_claim(decoded, "exp")? <= now {
        return Err(SdkError::InvalidToken("token has expired".to_string()));
    }
    if time_claim(decoded, "iat")? > now {
        return Err(SdkError::InvalidToken("token was issued in the future".to_string()));
    }
    Ok(())
}

fn first_public_key(decoded: &DecodedToken) -> SdkResult<&str> {
    decoded
        .payload
        .get("public_keys")
        .and_then(|keys| keys.get(0))
        .and_then(Value::as_str)
        .ok_or_else(|| SdkError::InvalidToken("token has no public key".to_string()))
}

fn issuer_address(decoded: &DecodedToken) -> SdkResult<String> {
    let issuer = decoded
        .claim_str("iss")
        .ok_or_else(|| SdkError::InvalidToken("token has no issuer".to_string()))?;
    get_address_from_did(issuer)?
        .ok_or_else(|| SdkError::InvalidDid(format!("unsupported DID method in {}", issuer)))
}

fn check_signature(decoded: &DecodedToken) -> SdkResult<()> {
    let public_key = first_public_key(decoded)?;
    if TokenVerifier::new(public_key)?.verify_decoded(decoded)? {
        Ok(())
    } else {
        Err(SdkError::SignatureVerification(
            "token signature does not match its public key".to_string(),
        ))
    }
}

fn check_issuer(decoded: &DecodedToken) -> SdkResult<()> {
    let public_key_address = public_key_to_address(first_public_key(decoded)?)?;
    if issuer_address(decoded)? == public_key_address {
        Ok(())
    } else {
        Err(SdkError::LoginFailed(
            "public keys do not match the issuer".to_string(),
        ))
    }
}

fn check_origin(decoded: &DecodedToken, field: &str) -> SdkResult<()> {
    let domain = decoded.claim_str("domain_name").unwrap_or_default();
    let uri = decoded.claim_str(field).unwrap_or_default();
    if is_same_origin_absolute_url(&[domain, uri]) {
        Ok(())
    } else {
        Err(SdkError::LoginFailed(format!(
            "{} is not an absolute URL on {}",
            field, domain
        )))
    }
}

/// Whether the owner of `username` is the token issuer
///
/// Names owned by a Stacks address are also accepted when their zone file
/// mentions the issuer address.
async fn check_username(decoded: &DecodedToken, resolver: &dyn NameResolver) -> SdkResult<()> {
    let username = match decoded.claim_str("username") {
        Some(username) if !username.is_empty() => username,
        _ => return Ok(()),
    };

    let name_info = resolver.name_info(username).await.map_err(|e| match e {
        SdkError::NameLookup(_) => e,
        other => SdkError::NameLookup(other.to_string()),
    })?;
    let issuer = issuer_address(decoded)?;
    let owner = name_info.address.as_str();

    let owned = if owner.starts_with('S') {
        owner == issuer || name_info.zonefile.contains(&issuer)
    } else {
        !owner.is_empty() && owner == issuer
    };

    if owned {
        Ok(())
    } else {
        log::warn!("Name {} is not owned by the token issuer", username);
        Err(SdkError::LoginFailed(format!(
            "public keys do not match the owner of {}",
            username
        )))
    }
}

/// Verify an auth request: dates, signature, issuer and same-origin URIs
pub fn verify_auth_request(token: &str) -> SdkResult<DecodedToken> {
    let decoded = decode_token(token)?;
    check_dates(&decoded)?;
    check_signature(&decoded)?;
    check_issuer(&decoded)?;
    check_origin(&decoded, "manifest_uri")?;
    check_origin(&decoded, "redirect_uri")?;
    Ok(decoded)
}

/// Verify a token: dates, signature, issuer and the owner of its username
pub async fn verify_token(token: &str, resolver: &dyn NameResolver) -> SdkResult<DecodedToken> {
    let decoded = decode_token(token)?;
    check_dates(&decoded)?;
    check_signature(&decoded)?;
    check_issuer(&decoded)?;
    check_username(&decoded, resolver).await?;
    Ok(decoded)
}

/// Verify an auth response, starting with its shape
pub async fn verify_auth_response(auth_response: &str, resolver: &dyn NameResolver) -> SdkResult<DecodedToken> {
    check_auth_response_format(auth_response)?;
    verify_token(auth_response, resolver).await
}
