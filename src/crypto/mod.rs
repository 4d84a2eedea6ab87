//! Cryptographic primitives for the SDK
//!
//! Everything here runs on secp256k1: key hierarchy derivation, address
//! encoding, ECIES envelopes, ECDSA signatures and the compact token codec.
//!
//! Error types in this module are designed to work with the central error
//! handling system defined in `crate::error`. `CryptoError` converts into
//! `SdkError`, mapping decryption failures onto `failed_decryption_error`
//! and signature failures onto `signature_verification_error`.

pub mod address;
pub mod crockford;
pub mod ecies;
pub mod key_derivation;
pub mod signatures;
pub mod token;

pub use address::{
    btc_address_from_hash160, decode_btc_address, decode_stx_address, hash160,
    public_key_to_btc_address, public_key_to_stx_address, StacksNetwork,
};
pub use ecies::{decrypt_ecies, encrypt_ecies, CipherObject, CryptoOptions, Payload};
pub use key_derivation::{
    Account, AccountMetadata, AppNode, AppsNode, CollectionNode, CollectionsNode, ExtendedKey,
    IdentityKeys,
};
pub use signatures::{
    sign_content, sign_encrypted_content, verify_signature, EcdsaSignature, SignatureObject,
    SignedCipherObject,
};
pub use token::{decode_token, DecodedToken, TokenError, TokenSigner, TokenVerifier};

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised by the cryptographic layer
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("{0}")]
    InvalidPrivateKey(String),

    #[error("{0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("{0}")]
    KeyDerivation(String),

    #[error("{0}")]
    InvalidAddress(String),
}

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Generate secure random bytes
pub fn random_bytes(length: usize) -> Vec<u8> {
    use rand::{rngs::OsRng, RngCore};

    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// SHA-256 digest of `data`
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Parse a hex private key
///
/// Accepts 64 hex chars, or 66 with the `01` compressed-key marker that
/// wallet software appends.
pub fn parse_private_key(private_key_hex: &str) -> CryptoResult<SigningKey> {
    let trimmed = private_key_hex.trim();
    let key_hex = if trimmed.len() == 66 && trimmed.ends_with("01") {
        &trimmed[..64]
    } else {
        trimmed
    };

    let bytes = hex::decode(key_hex)
        .map_err(|e| CryptoError::InvalidPrivateKey(format!("not hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(CryptoError::InvalidPrivateKey(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }

    SigningKey::from_slice(&bytes)
        .map_err(|_| CryptoError::InvalidPrivateKey("scalar out of range".to_string()))
}

/// Parse a hex SEC1 public key, compressed or uncompressed
pub fn parse_public_key(public_key_hex: &str) -> CryptoResult<PublicKey> {
    let bytes = hex::decode(public_key_hex.trim())
        .map_err(|e| CryptoError::InvalidPublicKey(format!("not hex: {}", e)))?;
    PublicKey::from_sec1_bytes(&bytes)
        .map_err(|_| CryptoError::InvalidPublicKey("not a point on secp256k1".to_string()))
}

/// Compressed SEC1 encoding of a public key
pub fn compressed_public_key(public_key: &PublicKey) -> Vec<u8> {
    public_key.to_encoded_point(true).as_bytes().to_vec()
}

/// Generate a fresh private key, hex encoded
pub fn make_ec_private_key() -> String {
    let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
    hex::encode(signing_key.to_bytes())
}

/// Compressed public key hex for a hex private key
pub fn get_public_key_from_private(private_key_hex: &str) -> CryptoResult<String> {
    let signing_key = parse_private_key(private_key_hex)?;
    let public_key = PublicKey::from(signing_key.verifying_key());
    Ok(hex::encode(compressed_public_key(&public_key)))
}

/// Bitcoin-style address of a hex public key
pub fn public_key_to_address(public_key_hex: &str) -> CryptoResult<String> {
    let public_key = parse_public_key(public_key_hex)?;
    Ok(public_key_to_btc_address(&public_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &str = "a5c61c6ca7b3e7e55edee68566aeab22e4da26baa285c7bd10e8d2218aa3b229";
    const PUBLIC_KEY: &str = "027d28f9951ce46538951e3697c62588a87f1f1f295de4a14fdd4c780fc52cfe69";

    #[test]
    fn test_random_bytes() {
        let bytes1 = random_bytes(32);
        let bytes2 = random_bytes(32);

        assert_eq!(bytes1.len(), 32);
        assert_eq!(bytes2.len(), 32);
        assert_ne!(bytes1, bytes2);
    }

    #[test]
    fn test_public_key_from_private() {
        assert_eq!(get_public_key_from_private(PRIVATE_KEY).unwrap(), PUBLIC_KEY);

        // Compressed-key marker is tolerated
        let with_marker = format!("{}01", PRIVATE_KEY);
        assert_eq!(get_public_key_from_private(&with_marker).unwrap(), PUBLIC_KEY);
    }

    #[test]
    fn test_public_key_to_address() {
        assert_eq!(
            public_key_to_address(PUBLIC_KEY).unwrap(),
            "1NZNxhoxobqwsNvTb16pdeiqvFvce3Yg8U"
        );
    }

    #[test]
    fn test_make_ec_private_key() {
        let key = make_ec_private_key();
        assert_eq!(key.len(), 64);
        assert!(get_public_key_from_private(&key).is_ok());
        assert_ne!(key, make_ec_private_key());
    }

    #[test]
    fn test_invalid_keys() {
        assert!(matches!(
            parse_private_key("zz"),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            parse_private_key(&"00".repeat(32)),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            parse_public_key("02abcd"),
            Err(CryptoError::InvalidPublicKey(_))
        ));
    }
}
