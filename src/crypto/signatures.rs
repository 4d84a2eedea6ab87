//! ECDSA signatures over secp256k1
//!
//! Content is signed over its SHA-256 hash with deterministic nonces (RFC 6979)
//! and low-S normalization. Signatures travel either DER encoded (file
//! signatures) or as the 64-byte `r || s` form (tokens).

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::PublicKey;
use serde::{Deserialize, Serialize};

use super::{compressed_public_key, parse_private_key, parse_public_key, sha256};
use super::{CryptoError, CryptoResult};

const DER_SEQUENCE: u8 = 0x30;
const DER_INTEGER: u8 = 0x02;

/// An ECDSA signature as its two 32-byte big-endian scalars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdsaSignature {
    r: [u8; 32],
    s: [u8; 32],
}

impl EcdsaSignature {
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        EcdsaSignature { r, s }
    }

    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Parse the 64-byte `r || s` form
    pub fn from_compact(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != 64 {
            return Err(CryptoError::InvalidSignature(format!(
                "expected 64 bytes, got {}",
                bytes.len()
            )));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(EcdsaSignature { r, s })
    }

    /// The 64-byte `r || s` form
    pub fn to_compact(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }

    /// Parse a DER `SEQUENCE { INTEGER r, INTEGER s }`
    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        let mut pos = 0;

        expect_byte(der, &mut pos, DER_SEQUENCE)?;
        let body_len = read_length(der, &mut pos)?;
        if pos + body_len != der.len() {
            return Err(CryptoError::InvalidSignature(
                "sequence length does not match input".to_string(),
            ));
        }

        let r = read_integer(der, &mut pos)?;
        let s = read_integer(der, &mut pos)?;
        if pos != der.len() {
            return Err(CryptoError::InvalidSignature(
                "trailing bytes after signature".to_string(),
            ));
        }

        Ok(EcdsaSignature { r, s })
    }

    /// DER encoding with minimal integers
    pub fn to_der(&self) -> Vec<u8> {
        let r = encode_integer(&self.r);
        let s = encode_integer(&self.s);

        let mut body = Vec::with_capacity(r.len() + s.len() + 4);
        body.push(DER_INTEGER);
        body.push(r.len() as u8);
        body.extend_from_slice(&r);
        body.push(DER_INTEGER);
        body.push(s.len() as u8);
        body.extend_from_slice(&s);

        let mut out = Vec::with_capacity(body.len() + 2);
        out.push(DER_SEQUENCE);
        out.push(body.len() as u8);
        out.extend_from_slice(&body);
        out
    }

    pub fn to_der_hex(&self) -> String {
        hex::encode(self.to_der())
    }

    /// Parse hex that holds either a DER or a 64-byte compact signature
    pub fn from_hex(signature_hex: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(signature_hex)
            .map_err(|e| CryptoError::InvalidSignature(format!("not hex: {}", e)))?;
        if bytes.first() == Some(&DER_SEQUENCE) && bytes.len() != 64 {
            Self::from_der(&bytes)
        } else {
            Self::from_compact(&bytes)
        }
    }

    fn to_k256(self) -> CryptoResult<Signature> {
        Signature::from_slice(&self.to_compact())
            .map_err(|_| CryptoError::InvalidSignature("scalar out of range".to_string()))
    }
}

impl From<Signature> for EcdsaSignature {
    fn from(signature: Signature) -> Self {
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        EcdsaSignature { r, s }
    }
}

fn expect_byte(data: &[u8], pos: &mut usize, expected: u8) -> CryptoResult<()> {
    match data.get(*pos) {
        Some(&b) if b == expected => {
            *pos += 1;
            Ok(())
        }
        Some(&b) => Err(CryptoError::InvalidSignature(format!(
            "expected tag {:#04x}, found {:#04x}",
            expected, b
        ))),
        None => Err(CryptoError::InvalidSignature("truncated signature".to_string())),
    }
}

// Signatures never need long-form lengths
fn read_length(data: &[u8], pos: &mut usize) -> CryptoResult<usize> {
    let len = *data
        .get(*pos)
        .ok_or_else(|| CryptoError::InvalidSignature("truncated signature".to_string()))?;
    if len & 0x80 != 0 {
        return Err(CryptoError::InvalidSignature(
            "unsupported long-form length".to_string(),
        ));
    }
    *pos += 1;
    Ok(len as usize)
}

fn read_integer(data: &[u8], pos: &mut usize) -> CryptoResult<[u8; 32]> {
    expect_byte(data, pos, DER_INTEGER)?;
    let len = read_length(data, pos)?;
    if len == 0 {
        return Err(CryptoError::InvalidSignature("empty integer".to_string()));
    }
    let end = *pos + len;
    let raw = data
        .get(*pos..end)
        .ok_or_else(|| CryptoError::InvalidSignature("truncated integer".to_string()))?;
    *pos = end;

    let first_nonzero = raw.iter().position(|&b| b != 0).unwrap_or(raw.len());
    let value = &raw[first_nonzero..];
    if value.len() > 32 {
        return Err(CryptoError::InvalidSignature(
            "integer wider than 32 bytes".to_string(),
        ));
    }

    let mut out = [0u8; 32];
    out[32 - value.len()..].copy_from_slice(value);
    Ok(out)
}

fn encode_integer(value: &[u8; 32]) -> Vec<u8> {
    let first_nonzero = value.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &value[first_nonzero..];

    let mut out = Vec::with_capacity(33);
    if trimmed[0] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(trimmed);
    out
}

/// Detached signature over file content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureObject {
    /// DER signature, hex
    pub signature: String,
    /// Compressed signer public key, hex
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// Ciphertext bundled with a signature over it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCipherObject {
    pub signature: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    /// Serialized `CipherObject` JSON
    #[serde(rename = "cipherText")]
    pub cipher_text: String,
}

/// Sign a 32-byte hash
pub fn sign_hash(hash: &[u8], signing_key: &SigningKey) -> CryptoResult<EcdsaSignature> {
    let signature: Signature = signing_key
        .sign_prehash(hash)
        .map_err(|e| CryptoError::InvalidSignature(format!("signing failed: {}", e)))?;
    Ok(EcdsaSignature::from(signature))
}

/// Verify a signature over a 32-byte hash; high-S signatures are accepted
pub fn verify_hash(hash: &[u8], signature: &EcdsaSignature, public_key: &PublicKey) -> bool {
    let signature = match signature.to_k256() {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    let signature = signature.normalize_s().unwrap_or(signature);
    VerifyingKey::from(public_key)
        .verify_prehash(hash, &signature)
        .is_ok()
}

/// Sign content with a hex private key, returning a DER signature object
pub fn sign_content(content: &[u8], private_key_hex: &str) -> CryptoResult<SignatureObject> {
    let signing_key = parse_private_key(private_key_hex)?;
    let signature = sign_hash(&sha256(content), &signing_key)?;
    let public_key = PublicKey::from(signing_key.verifying_key());

    Ok(SignatureObject {
        signature: signature.to_der_hex(),
        public_key: hex::encode(compressed_public_key(&public_key)),
    })
}

/// Sign a serialized cipher object, embedding the signature alongside it
pub fn sign_encrypted_content(
    cipher_text: &str,
    private_key_hex: &str,
) -> CryptoResult<SignedCipherObject> {
    let signature = sign_content(cipher_text.as_bytes(), private_key_hex)?;
    Ok(SignedCipherObject {
        signature: signature.signature,
        public_key: signature.public_key,
        cipher_text: cipher_text.to_string(),
    })
}

/// Verify a hex DER signature over a content hash
///
/// Malformed keys or signatures are errors; a well-formed signature from
/// another key is `Ok(false)`.
pub fn verify_signature(
    content_hash: &[u8],
    signature_hex: &str,
    public_key_hex: &str,
) -> CryptoResult<bool> {
    let signature = EcdsaSignature::from_hex(signature_hex)?;
    let public_key = parse_public_key(public_key_hex)?;
    Ok(verify_hash(content_hash, &signature, &public_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PRIVATE_KEY: &str = "a5c61c6ca7b3e7e55edee68566aeab22e4da26baa285c7bd10e8d2218aa3b229";
    const PUBLIC_KEY: &str = "027d28f9951ce46538951e3697c62588a87f1f1f295de4a14fdd4c780fc52cfe69";
    const OTHER_PUBLIC_KEY: &str =
        "02413d7c51118104cfe1b41e540b6c2acaaf91f1e2e22316df7448fb6070d582ec";
    const MESSAGE: &str = "all work and no play makes jack a dull boy";
    const MESSAGE_DER: &str = "3044022023b742aff15d1b2ee47b7bb5ff8b1c9e4627201c627f6ae7995f5e00b82e2b380220715a14dc988c549e72cf06660c850c623aa56b9a35e0bb452a8b6410e39137fe";
    const HELLO_DER: &str = "3045022100ac471ffe1779ba32f463f0dba3f51d63187c549db99cd05e7eecbe3de632e2c802200eef26c91e1c224436d60e44105d2f3b6db5eaf011d57c18855ea3a11bdaf69f";

    #[test]
    fn test_content_hash() {
        assert_eq!(
            hex::encode(sha256(MESSAGE.as_bytes())),
            "b2621295ffe7a9c5b522a0e70e902e4f491554b5d0322068e20ba42d02410393"
        );
    }

    #[test]
    fn test_sign_content_matches_vector() {
        let signed = sign_content(MESSAGE.as_bytes(), PRIVATE_KEY).unwrap();
        assert_eq!(signed.signature, MESSAGE_DER);
        assert_eq!(signed.public_key, PUBLIC_KEY);

        let signed = sign_content(b"Hello Test", PRIVATE_KEY).unwrap();
        assert_eq!(signed.signature, HELLO_DER);
    }

    #[test]
    fn test_from_der_vectors() {
        let sig = EcdsaSignature::from_der(&hex::decode(MESSAGE_DER).unwrap()).unwrap();
        assert_eq!(
            hex::encode(sig.r()),
            "23b742aff15d1b2ee47b7bb5ff8b1c9e4627201c627f6ae7995f5e00b82e2b38"
        );
        assert_eq!(
            hex::encode(sig.s()),
            "715a14dc988c549e72cf06660c850c623aa56b9a35e0bb452a8b6410e39137fe"
        );
        assert_eq!(sig.to_der_hex(), MESSAGE_DER);

        // r has its high bit set and carries a zero pad byte
        let sig = EcdsaSignature::from_der(&hex::decode(HELLO_DER).unwrap()).unwrap();
        assert_eq!(
            hex::encode(sig.r()),
            "ac471ffe1779ba32f463f0dba3f51d63187c549db99cd05e7eecbe3de632e2c8"
        );
        assert_eq!(sig.to_der_hex(), HELLO_DER);
    }

    #[test]
    fn test_der_short_integers() {
        let mut r = [0u8; 32];
        r[31] = 1;
        let mut s = [0u8; 32];
        s[30] = 0x80;
        let sig = EcdsaSignature::new(r, s);
        let der = sig.to_der();
        assert_eq!(hex::encode(&der), "3008020101020300 8000".replace(' ', ""));
        assert_eq!(EcdsaSignature::from_der(&der).unwrap(), sig);
    }

    #[test]
    fn test_from_der_rejects_garbage() {
        assert!(EcdsaSignature::from_der(&[]).is_err());
        assert!(EcdsaSignature::from_der(&[0x31, 0x00]).is_err());
        let mut der = hex::decode(MESSAGE_DER).unwrap();
        der.push(0);
        assert!(EcdsaSignature::from_der(&der).is_err());
        der.truncate(20);
        assert!(EcdsaSignature::from_der(&der).is_err());
    }

    #[test]
    fn test_verify() {
        let hash = sha256(MESSAGE.as_bytes());
        assert!(verify_signature(&hash, MESSAGE_DER, PUBLIC_KEY).unwrap());
        assert!(!verify_signature(&hash, MESSAGE_DER, OTHER_PUBLIC_KEY).unwrap());
        assert!(verify_signature(&hash, "zz", PUBLIC_KEY).is_err());
    }

    #[test]
    fn test_sign_and_verify_lengths() {
        for content in [Vec::new(), vec![42u8; 1500]] {
            let signed = sign_content(&content, PRIVATE_KEY).unwrap();
            let hash = sha256(&content);
            assert!(verify_signature(&hash, &signed.signature, PUBLIC_KEY).unwrap());
            assert!(!verify_signature(&hash, &signed.signature, OTHER_PUBLIC_KEY).unwrap());
        }
    }

    #[test]
    fn test_sign_short_content_other_key() {
        let private_key = "89f92476f13f5b173e53926ad7d6e22baf78c6b1dcdf200c38dc73d2bf47d43b";
        let signed = sign_content(b"Hello Test", private_key).unwrap();
        let hash = sha256(b"Hello Test");
        assert!(verify_signature(&hash, &signed.signature, &signed.public_key).unwrap());
    }

    #[test]
    fn test_high_s_is_accepted() {
        let signing_key = parse_private_key(PRIVATE_KEY).unwrap();
        let hash = sha256(MESSAGE.as_bytes());
        let low = sign_hash(&hash, &signing_key).unwrap();

        // n - s
        let sig = Signature::from_slice(&low.to_compact()).unwrap();
        let (r, s) = sig.split_scalars();
        let high_s = -*s.as_ref();
        let high = Signature::from_scalars(r.as_ref().to_bytes(), high_s.to_bytes()).unwrap();

        let public_key = parse_public_key(PUBLIC_KEY).unwrap();
        assert!(verify_hash(&hash, &EcdsaSignature::from(high), &public_key));
    }

    #[test]
    fn test_signed_cipher_object_wire_names() {
        let signed = sign_encrypted_content("{\"iv\":\"00\"}", PRIVATE_KEY).unwrap();
        let json = serde_json::to_value(&signed).unwrap();
        assert_eq!(json["publicKey"], PUBLIC_KEY);
        assert_eq!(json["cipherText"], "{\"iv\":\"00\"}");
        assert!(json["signature"].is_string());
    }

    proptest! {
        #[test]
        fn test_der_round_trip(r in any::<[u8; 32]>(), s in any::<[u8; 32]>()) {
            let sig = EcdsaSignature::new(r, s);
            let der = sig.to_der();
            prop_assert!(der.len() <= 72);
            prop_assert_eq!(EcdsaSignature::from_der(&der).unwrap(), sig);
        }
    }
}
