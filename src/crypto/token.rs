//! Compact signed tokens
//!
//! `base64url(header) . base64url(payload) . base64url(signature)`, signed with
//! ES256K over the SHA-256 of the first two segments. The codec knows nothing
//! about payload semantics; auth requests, auth responses, profile tokens and
//! Gaia hub tokens all go through it.

use k256::ecdsa::SigningKey;
use k256::PublicKey;
use serde_json::Value;
use thiserror::Error;

use super::signatures::{sign_hash, verify_hash, EcdsaSignature};
use super::{parse_private_key, parse_public_key, sha256, CryptoError};
use crate::utils::{base64url_decode, base64url_encode};

/// Signing algorithm announced in the header
pub const TOKEN_ALGORITHM: &str = "ES256K";

/// Errors raised while decoding or verifying tokens
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token segment is not JSON: {0}")]
    InvalidJson(String),

    #[error("Token signature is invalid: {0}")]
    InvalidSignature(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

pub type TokenResult<T> = Result<T, TokenError>;

/// A token split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub header: Value,
    pub payload: Value,
    /// Signature segment, still base64url encoded
    pub signature: String,
    signing_input: String,
}

impl DecodedToken {
    /// `header.payload` as it appeared on the wire
    pub fn signing_input(&self) -> &str {
        &self.signing_input
    }

    /// String claim from the payload
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// The JSON view `{header, payload, signature}` used in profile token files
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "header": self.header,
            "payload": self.payload,
            "signature": self.signature,
        })
    }
}

fn decode_segment(segment: &str, name: &str) -> TokenResult<Value> {
    let bytes = base64url_decode(segment)
        .map_err(|e| TokenError::Malformed(format!("{} segment: {}", name, e)))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::InvalidJson(format!("{}: {}", name, e)))
}

/// Split and decode a token without checking its signature
pub fn decode_token(token: &str) -> TokenResult<DecodedToken> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(TokenError::Malformed("empty segment".to_string()));
    }

    let header = decode_segment(parts[0], "header")?;
    let payload = decode_segment(parts[1], "payload")?;
    if !header.is_object() || !payload.is_object() {
        return Err(TokenError::InvalidJson(
            "header and payload must be JSON objects".to_string(),
        ));
    }

    Ok(DecodedToken {
        header,
        payload,
        signature: parts[2].to_string(),
        signing_input: format!("{}.{}", parts[0], parts[1]),
    })
}

/// Signs payloads into tokens with one private key
pub struct TokenSigner {
    signing_key: SigningKey,
}

impl TokenSigner {
    pub fn new(private_key_hex: &str) -> TokenResult<Self> {
        Ok(TokenSigner {
            signing_key: parse_private_key(private_key_hex)?,
        })
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        TokenSigner { signing_key }
    }

    pub fn header() -> Value {
        serde_json::json!({ "typ": "JWT", "alg": TOKEN_ALGORITHM })
    }

    /// Sign `payload`, returning the compact token
    pub fn sign(&self, payload: &Value) -> TokenResult<String> {
        let header = base64url_encode(Self::header().to_string().as_bytes());
        let body = base64url_encode(payload.to_string().as_bytes());
        let signing_input = format!("{}.{}", header, body);

        let signature = sign_hash(&sha256(signing_input.as_bytes()), &self.signing_key)?;
        Ok(format!(
            "{}.{}",
            signing_input,
            base64url_encode(&signature.to_compact())
        ))
    }
}

/// Checks token signatures against one public key
pub struct TokenVerifier {
    public_key: PublicKey,
}

impl TokenVerifier {
    pub fn new(public_key_hex: &str) -> TokenResult<Self> {
        Ok(TokenVerifier {
            public_key: parse_public_key(public_key_hex)?,
        })
    }

    /// Whether `token` was signed by this key
    ///
    /// The signature may be the 64-byte `r || s` form or DER.
    pub fn verify(&self, token: &str) -> TokenResult<bool> {
        let decoded = decode_token(token)?;
        self.verify_decoded(&decoded)
    }

    pub fn verify_decoded(&self, decoded: &DecodedToken) -> TokenResult<bool> {
        let raw = base64url_decode(&decoded.signature)
            .map_err(|e| TokenError::InvalidSignature(e.to_string()))?;
        let signature = if raw.len() == 64 {
            EcdsaSignature::from_compact(&raw)?
        } else {
            EcdsaSignature::from_der(&raw)?
        };

        let hash = sha256(decoded.signing_input.as_bytes());
        Ok(verify_hash(&hash, &signature, &self.public_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &str = "a5c61c6ca7b3e7e55edee68566aeab22e4da26baa285c7bd10e8d2218aa3b229";
    const PUBLIC_KEY: &str = "027d28f9951ce46538951e3697c62588a87f1f1f295de4a14fdd4c780fc52cfe69";
    const OTHER_PUBLIC_KEY: &str =
        "02413d7c51118104cfe1b41e540b6c2acaaf91f1e2e22316df7448fb6070d582ec";

    fn sample_token() -> String {
        TokenSigner::new(PRIVATE_KEY)
            .unwrap()
            .sign(&serde_json::json!({ "jti": "abc", "iat": 1554820451 }))
            .unwrap()
    }

    #[test]
    fn test_sign_and_decode() {
        let token = sample_token();
        let decoded = decode_token(&token).unwrap();

        assert_eq!(decoded.header["typ"], "JWT");
        assert_eq!(decoded.header["alg"], "ES256K");
        assert_eq!(decoded.claim_str("jti"), Some("abc"));
        assert_eq!(decoded.payload["iat"], 1554820451);
        assert_eq!(base64url_decode(&decoded.signature).unwrap().len(), 64);
    }

    #[test]
    fn test_verify() {
        let token = sample_token();
        assert!(TokenVerifier::new(PUBLIC_KEY).unwrap().verify(&token).unwrap());
        assert!(!TokenVerifier::new(OTHER_PUBLIC_KEY)
            .unwrap()
            .verify(&token)
            .unwrap());
    }

    #[test]
    fn test_verify_accepts_der_signature() {
        let token = sample_token();
        let decoded = decode_token(&token).unwrap();
        let compact = base64url_decode(&decoded.signature).unwrap();
        let der = EcdsaSignature::from_compact(&compact).unwrap().to_der();
        let der_token = format!("{}.{}", decoded.signing_input(), base64url_encode(&der));

        assert!(TokenVerifier::new(PUBLIC_KEY).unwrap().verify(&der_token).unwrap());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let token = sample_token();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = base64url_encode(br#"{"jti":"abc","iat":1}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert!(!TokenVerifier::new(PUBLIC_KEY).unwrap().verify(&tampered).unwrap());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_token("a.b"), Err(TokenError::Malformed(_))));
        assert!(matches!(decode_token("a..c"), Err(TokenError::Malformed(_))));
        assert!(matches!(decode_token("a.b.c.d"), Err(TokenError::Malformed(_))));
        assert!(matches!(decode_token("!!.e30.c2ln"), Err(TokenError::Malformed(_))));

        let not_json = format!("{}.e30.c2ln", base64url_encode(b"not json"));
        assert!(matches!(decode_token(&not_json), Err(TokenError::InvalidJson(_))));

        let array = format!("e30.{}.c2ln", base64url_encode(b"[1,2]"));
        assert!(matches!(decode_token(&array), Err(TokenError::InvalidJson(_))));
    }

    #[test]
    fn test_to_json() {
        let decoded = decode_token(&sample_token()).unwrap();
        let json = decoded.to_json();
        assert_eq!(json["payload"]["jti"], "abc");
        assert_eq!(json["signature"], decoded.signature);
    }
}
