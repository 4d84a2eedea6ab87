//! Decentralized identifiers
//!
//! Only the `did:btc-addr:<address>` method is understood: the identifier
//! is self-certifying through the public key whose address it names.

use crate::error::{SdkError, SdkResult};

/// DID method backed by a Bitcoin-style address
pub const BTC_ADDR_METHOD: &str = "btc-addr";

/// `did:btc-addr:<address>`
pub fn make_did_from_address(address: &str) -> String {
    format!("did:{}:{}", BTC_ADDR_METHOD, address)
}

/// Method of a DID, lower-cased
pub fn get_did_type(did: &str) -> SdkResult<String> {
    let parts: Vec<&str> = did.split(':').collect();
    if parts.len() != 3 {
        return Err(SdkError::InvalidDid(
            "Decentralized IDs must have 3 parts".to_string(),
        ));
    }
    if !parts[0].eq_ignore_ascii_case("did") {
        return Err(SdkError::InvalidDid(
            "Decentralized IDs must start with 'did'".to_string(),
        ));
    }
    Ok(parts[1].to_ascii_lowercase())
}

/// Address named by a `btc-addr` DID; `None` for other methods
pub fn get_address_from_did(did: &str) -> SdkResult<Option<String>> {
    if get_did_type(did)? == BTC_ADDR_METHOD {
        Ok(did.split(':').nth(2).map(String::from))
    } else {
        Ok(None)
    }
}
