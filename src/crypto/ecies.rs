//! ECIES envelopes
//!
//! Encryption derives a shared secret between a fresh ephemeral key and the
//! recipient key, stretches it with SHA-512 into an AES-256-CBC key and an
//! HMAC-SHA256 key, and emits a hex-encoded [`CipherObject`]. The MAC covers
//! `iv || ephemeral public key || ciphertext` and is checked in constant time
//! before anything is decrypted.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use k256::ecdh::{diffie_hellman, EphemeralSecret};
use k256::PublicKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use super::{compressed_public_key, parse_private_key, parse_public_key, random_bytes};
use super::{CryptoError, CryptoResult};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Content handed to or recovered from encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Payload::Text(_))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Text(text) => text.into_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }

    /// Text content, if this payload is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Binary(bytes.to_vec())
    }
}

/// Self-describing ECIES ciphertext; all fields hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherObject {
    pub iv: String,
    #[serde(rename = "ephemeralPK")]
    pub ephemeral_pk: String,
    #[serde(rename = "cipherText")]
    pub cipher_text: String,
    pub mac: String,
    #[serde(rename = "wasString", default)]
    pub was_string: bool,
}

impl CipherObject {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "iv": self.iv,
            "ephemeralPK": self.ephemeral_pk,
            "cipherText": self.cipher_text,
            "mac": self.mac,
            "wasString": self.was_string,
        })
    }

    /// Serialized form stored in files and tokens
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    pub fn from_json_str(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid cipher object: {}", e)))
    }
}

/// Keys for `encrypt_content` / `decrypt_content`
///
/// When a key is absent the signed-in user's app key is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoOptions {
    #[serde(rename = "publicKey")]
    pub public_key: Option<String>,
    #[serde(rename = "privateKey")]
    pub private_key: Option<String>,
}

impl CryptoOptions {
    pub fn with_public_key<S: Into<String>>(public_key: S) -> Self {
        CryptoOptions {
            public_key: Some(public_key.into()),
            private_key: None,
        }
    }

    pub fn with_private_key<S: Into<String>>(private_key: S) -> Self {
        CryptoOptions {
            public_key: None,
            private_key: Some(private_key.into()),
        }
    }
}

struct SharedKeys {
    encryption_key: [u8; 32],
    hmac_key: [u8; 32],
}

fn shared_secret_to_keys(shared_secret: &[u8]) -> SharedKeys {
    let digest = Sha512::digest(shared_secret);
    let mut encryption_key = [0u8; 32];
    let mut hmac_key = [0u8; 32];
    encryption_key.copy_from_slice(&digest[..32]);
    hmac_key.copy_from_slice(&digest[32..]);
    SharedKeys {
        encryption_key,
        hmac_key,
    }
}

fn mac_input(iv: &[u8], ephemeral_pk: &[u8], cipher_text: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(iv.len() + ephemeral_pk.len() + cipher_text.len());
    data.extend_from_slice(iv);
    data.extend_from_slice(ephemeral_pk);
    data.extend_from_slice(cipher_text);
    data
}

fn new_mac(key: &[u8]) -> CryptoResult<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Encrypt a payload for a hex public key
pub fn encrypt_ecies(public_key_hex: &str, payload: &Payload) -> CryptoResult<CipherObject> {
    let recipient = parse_public_key(public_key_hex)?;
    encrypt_for(&recipient, payload)
}

fn encrypt_for(recipient: &PublicKey, payload: &Payload) -> CryptoResult<CipherObject> {
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let ephemeral_pk = compressed_public_key(&ephemeral.public_key());
    let shared = ephemeral.diffie_hellman(recipient);
    let keys = shared_secret_to_keys(shared.raw_secret_bytes());

    let iv = random_bytes(16);
    let cipher_text = Aes256CbcEnc::new_from_slices(&keys.encryption_key, &iv)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(payload.as_bytes());

    let mut mac = new_mac(&keys.hmac_key)?;
    mac.update(&mac_input(&iv, &ephemeral_pk, &cipher_text));
    let mac = mac.finalize().into_bytes();

    Ok(CipherObject {
        iv: hex::encode(iv),
        ephemeral_pk: hex::encode(ephemeral_pk),
        cipher_text: hex::encode(cipher_text),
        mac: hex::encode(mac),
        was_string: payload.is_text(),
    })
}

/// Decrypt a cipher object with a hex private key
///
/// Every failure, including a malformed envelope, is `DecryptionFailed`.
pub fn decrypt_ecies(private_key_hex: &str, cipher: &CipherObject) -> CryptoResult<Payload> {
    let fail = |what: &str| CryptoError::DecryptionFailed(what.to_string());

    let signing_key = parse_private_key(private_key_hex)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    let iv = hex::decode(&cipher.iv).map_err(|_| fail("iv is not hex"))?;
    let ephemeral_pk_bytes =
        hex::decode(&cipher.ephemeral_pk).map_err(|_| fail("ephemeral key is not hex"))?;
    let cipher_text = hex::decode(&cipher.cipher_text).map_err(|_| fail("ciphertext is not hex"))?;
    let expected_mac = hex::decode(&cipher.mac).map_err(|_| fail("mac is not hex"))?;

    let ephemeral_pk = PublicKey::from_sec1_bytes(&ephemeral_pk_bytes)
        .map_err(|_| fail("ephemeral key is not a valid point"))?;
    let shared = diffie_hellman(signing_key.as_nonzero_scalar(), ephemeral_pk.as_affine());
    let keys = shared_secret_to_keys(shared.raw_secret_bytes());

    let mut mac = HmacSha256::new_from_slice(&keys.hmac_key).map_err(|_| fail("bad mac key"))?;
    mac.update(&mac_input(&iv, &ephemeral_pk_bytes, &cipher_text));
    mac.verify_slice(&expected_mac)
        .map_err(|_| fail("mac mismatch"))?;

    let plain = Aes256CbcDec::new_from_slices(&keys.encryption_key, &iv)
        .map_err(|_| fail("iv must be 16 bytes"))?
        .decrypt_padded_vec_mut::<Pkcs7>(&cipher_text)
        .map_err(|_| fail("bad padding"))?;

    if cipher.was_string {
        String::from_utf8(plain)
            .map(Payload::Text)
            .map_err(|_| fail("plaintext is not UTF-8"))
    } else {
        Ok(Payload::Binary(plain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_KEY: &str = "a5c61c6ca7b3e7e55edee68566aeab22e4da26baa285c7bd10e8d2218aa3b229";
    const PUBLIC_KEY: &str = "027d28f9951ce46538951e3697c62588a87f1f1f295de4a14fdd4c780fc52cfe69";

    fn js_vector() -> CipherObject {
        CipherObject {
            cipher_text: "c77fded9b2013ed08409b5f6a69f53e78d4ef0ec1cca6380d6b0aa8bd927c454135dd1a5c54adc0f3e0aa9748fec3fb5".to_string(),
            ephemeral_pk: "02df2bc402b134631b2afaa31316392e3ded63728cd588e4f8bc152b39f8a6deb4".to_string(),
            iv: "f0f56df1978d5c5d65e8e5b3ff8ad1fc".to_string(),
            mac: "4210125fb1c7f9c47a8e4ab7995980e4eeebbccbd6fe888beec809062e1b33da".to_string(),
            was_string: true,
        }
    }

    #[test]
    fn test_shared_secret_to_keys() {
        let secret =
            hex::decode("dd585e51548fea14df7114ea366ffd1372abdf8cf6c771da2ff0285522951001").unwrap();
        let keys = shared_secret_to_keys(&secret);
        assert_eq!(
            hex::encode(keys.encryption_key),
            "a32fb7bbf65d0a6f6c2d05c49cc5e477b8616b517562f1494f16a106190c74e4"
        );
        assert_eq!(
            hex::encode(keys.hmac_key),
            "dcbb3058a9fb295b181f483dc32962949551e648125f351eafdffd053ed2761f"
        );
    }

    #[test]
    fn test_aes_vector() {
        // Key is the first 32 bytes of the public key hex, iv is fixed
        let key = hex::decode(&PUBLIC_KEY[..64]).unwrap();
        let iv = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 0, 1, 2, 3, 4, 5, 6];
        let cipher = hex::decode("c5a777b2daac1c7f50f2007af02f517d").unwrap();
        let plain = Aes256CbcDec::new_from_slices(&key, &iv)
            .unwrap()
            .decrypt_padded_vec_mut::<Pkcs7>(&cipher)
            .unwrap();
        assert_eq!(plain, b"abc".to_vec());
    }

    #[test]
    fn test_decrypt_blockstack_js_vector() {
        let plain = decrypt_ecies(PRIVATE_KEY, &js_vector()).unwrap();
        assert_eq!(
            plain,
            Payload::Text("all work and no play makes jack a dull boy".to_string())
        );
    }

    #[test]
    fn test_round_trip_text_and_binary() {
        let text = encrypt_ecies(PUBLIC_KEY, &Payload::from("Colendi")).unwrap();
        assert!(text.was_string);
        assert_eq!(
            decrypt_ecies(PRIVATE_KEY, &text).unwrap(),
            Payload::Text("Colendi".to_string())
        );

        let bytes: Vec<u8> = (0..=255u8).collect();
        let binary = encrypt_ecies(PUBLIC_KEY, &Payload::from(bytes.clone())).unwrap();
        assert!(!binary.was_string);
        assert_eq!(decrypt_ecies(PRIVATE_KEY, &binary).unwrap(), Payload::Binary(bytes));

        let empty = encrypt_ecies(PUBLIC_KEY, &Payload::from("")).unwrap();
        assert_eq!(
            decrypt_ecies(PRIVATE_KEY, &empty).unwrap(),
            Payload::Text(String::new())
        );
    }

    #[test]
    fn test_envelope_json_round_trip() {
        let cipher = encrypt_ecies(PUBLIC_KEY, &Payload::from("hello")).unwrap();
        let json = cipher.to_json_string();
        assert!(json.contains("\"ephemeralPK\""));
        assert!(json.contains("\"wasString\":true"));
        assert_eq!(CipherObject::from_json_str(&json).unwrap(), cipher);
    }

    fn flip_hex_char(value: &str, index: usize) -> String {
        let mut chars: Vec<char> = value.chars().collect();
        chars[index] = if chars[index] == '0' { '1' } else { '0' };
        chars.into_iter().collect()
    }

    #[test]
    fn test_corruption_is_detected() {
        let cipher = encrypt_ecies(PUBLIC_KEY, &Payload::from("secret message")).unwrap();

        let mut bad_mac = cipher.clone();
        bad_mac.mac = flip_hex_char(&cipher.mac, 10);
        let mut bad_text = cipher.clone();
        bad_text.cipher_text = flip_hex_char(&cipher.cipher_text, 3);
        let mut bad_pk = cipher.clone();
        bad_pk.ephemeral_pk = flip_hex_char(&cipher.ephemeral_pk, 20);
        let mut bad_prefix = cipher.clone();
        bad_prefix.ephemeral_pk = format!("05{}", &cipher.ephemeral_pk[2..]);
        let mut not_hex = cipher.clone();
        not_hex.iv = "zz".to_string();

        for corrupted in [bad_mac, bad_text, bad_pk, bad_prefix, not_hex] {
            assert!(matches!(
                decrypt_ecies(PRIVATE_KEY, &corrupted),
                Err(CryptoError::DecryptionFailed(_))
            ));
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher = encrypt_ecies(PUBLIC_KEY, &Payload::from("secret")).unwrap();
        let other = "89f92476f13f5b173e53926ad7d6e22baf78c6b1dcdf200c38dc73d2bf47d43b";
        assert!(matches!(
            decrypt_ecies(other, &cipher),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }
}
