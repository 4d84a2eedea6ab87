//! Key hierarchy for identities, applications and collections
//!
//! Keys follow BIP32 hierarchical deterministic derivation on secp256k1. An
//! identity keychain sits at `m/888'/0'`; each account is a hardened child of it.
//! Below an account, app and collection keys live under fixed hardened nodes and
//! are indexed by a hash of the origin (or collection name) and the identity salt,
//! so the same inputs always land on the same key without persisting anything.
//!
//! Key errors in this module are reported as `CryptoError::KeyDerivation` and
//! funnel into the central `SdkError` through `From`.

use hmac::{Hmac, Mac};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, NonZeroScalar, PublicKey, Scalar};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use super::address::public_key_to_btc_address;
use super::{compressed_public_key, CryptoError, CryptoResult};
use crate::models::UserData;
use crate::utils::normalize_origin;

type HmacSha512 = Hmac<Sha512>;

/// Offset marking a hardened child index
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Path of the identity keychain below the master key
pub const IDENTITY_KEYCHAIN_PATH: &str = "m/888'/0'";

/// Hardened index of the node holding per-app keys
pub const APPS_NODE_INDEX: u32 = 0;
/// Hardened index of the signing node
pub const SIGNING_NODE_INDEX: u32 = 1;
/// Hardened index of the encryption node
pub const ENCRYPTION_NODE_INDEX: u32 = 2;
/// Hardened index of the node holding per-collection keys
pub const COLLECTIONS_NODE_INDEX: u32 = 3;

/// A BIP32 extended private key
#[derive(Clone)]
pub struct ExtendedKey {
    private_key: SigningKey,
    chain_code: [u8; 32],
    depth: u8,
    child_number: u32,
}

impl std::fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("ExtendedKey")
            .field("public_key", &self.public_key_hex())
            .field("depth", &self.depth)
            .field("child_number", &self.child_number)
            .finish()
    }
}

impl ExtendedKey {
    /// Master key for a BIP32 seed
    pub fn from_seed(seed: &[u8]) -> CryptoResult<Self> {
        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        mac.update(seed);
        let output = mac.finalize().into_bytes();
        let (il, ir) = output.split_at(32);

        let private_key = SigningKey::from_slice(il)
            .map_err(|_| CryptoError::KeyDerivation("seed yields an invalid master key".to_string()))?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);

        Ok(ExtendedKey {
            private_key,
            chain_code,
            depth: 0,
            child_number: 0,
        })
    }

    /// Wrap an existing private key and chain code as a root
    pub fn from_parts(private_key: SigningKey, chain_code: [u8; 32]) -> Self {
        ExtendedKey {
            private_key,
            chain_code,
            depth: 0,
            child_number: 0,
        }
    }

    /// Derive the child at `index`; indices at or above `HARDENED_OFFSET` are hardened
    pub fn derive_child(&self, index: u32) -> CryptoResult<Self> {
        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        if index >= HARDENED_OFFSET {
            mac.update(&[0u8]);
            mac.update(&self.private_key.to_bytes());
        } else {
            mac.update(&compressed_public_key(&self.public_key()));
        }
        mac.update(&index.to_be_bytes());
        let output = mac.finalize().into_bytes();
        let (il, ir) = output.split_at(32);

        let tweak: Option<Scalar> = Scalar::from_repr(*FieldBytes::from_slice(il)).into();
        let tweak = tweak.ok_or_else(|| {
            CryptoError::KeyDerivation(format!("child {} is out of range", index))
        })?;
        let parent: Scalar = *self.private_key.as_nonzero_scalar().as_ref();
        let child: Option<NonZeroScalar> = NonZeroScalar::new(tweak + parent).into();
        let child = child.ok_or_else(|| {
            CryptoError::KeyDerivation(format!("child {} is zero", index))
        })?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);

        Ok(ExtendedKey {
            private_key: SigningKey::from(child),
            chain_code,
            depth: self.depth.saturating_add(1),
            child_number: index,
        })
    }

    /// Derive the hardened child at `index`
    pub fn derive_hardened(&self, index: u32) -> CryptoResult<Self> {
        self.derive_child(index | HARDENED_OFFSET)
    }

    /// Derive along a path such as `m/888'/0'/0'`
    pub fn derive_path(&self, path: &str) -> CryptoResult<Self> {
        let mut segments = path.split('/');
        if segments.next() != Some("m") {
            return Err(CryptoError::KeyDerivation(format!(
                "derivation path must start with m: {}",
                path
            )));
        }

        let mut key = self.clone();
        for segment in segments.filter(|s| !s.is_empty()) {
            let (digits, hardened) = match segment.strip_suffix(['\'', 'h', 'H']) {
                Some(digits) => (digits, true),
                None => (segment, false),
            };
            let index: u32 = digits.parse().map_err(|_| {
                CryptoError::KeyDerivation(format!("invalid path segment: {}", segment))
            })?;
            if index >= HARDENED_OFFSET {
                return Err(CryptoError::KeyDerivation(format!(
                    "path index too large: {}",
                    segment
                )));
            }
            key = if hardened {
                key.derive_hardened(index)?
            } else {
                key.derive_child(index)?
            };
        }
        Ok(key)
    }

    pub fn private_key(&self) -> &SigningKey {
        &self.private_key
    }

    /// Private key as 64 hex chars
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.private_key.verifying_key())
    }

    /// Compressed public key as hex
    pub fn public_key_hex(&self) -> String {
        hex::encode(compressed_public_key(&self.public_key()))
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn btc_address(&self) -> String {
        public_key_to_btc_address(&self.public_key())
    }
}

/// Java-style string hash folded into a non-negative 31-bit integer
pub fn hash_code(value: &str) -> u32 {
    let mut hash: i32 = 0;
    for c in value.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(c as i32);
    }
    (hash & 0x7fff_ffff) as u32
}

fn hashed_index(input: &str) -> u32 {
    hash_code(&hex::encode(Sha256::digest(input.as_bytes())))
}

/// The identity keychain and its salt
#[derive(Debug, Clone)]
pub struct IdentityKeys {
    keychain: ExtendedKey,
    salt: String,
}

impl IdentityKeys {
    /// Build from the identity keychain node (`m/888'/0'`)
    pub fn new(keychain: ExtendedKey) -> Self {
        let salt = hex::encode(Sha256::digest(keychain.public_key_hex().as_bytes()));
        IdentityKeys { keychain, salt }
    }

    /// Derive the identity keychain from a BIP32 seed
    pub fn from_seed(seed: &[u8]) -> CryptoResult<Self> {
        let master = ExtendedKey::from_seed(seed)?;
        Ok(Self::new(master.derive_path(IDENTITY_KEYCHAIN_PATH)?))
    }

    pub fn keychain(&self) -> &ExtendedKey {
        &self.keychain
    }

    /// Salt shared by every account of this identity
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// The account at hardened `index`
    pub fn account(&self, index: u32, username: Option<String>) -> CryptoResult<Account> {
        Ok(Account {
            username,
            keys: self.keychain.derive_hardened(index)?,
            salt: self.salt.clone(),
            metadata: AccountMetadata::default(),
        })
    }
}

/// Optional account details carried into auth responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountMetadata {
    #[serde(default)]
    pub permissions: Vec<String>,
    pub email: Option<String>,
    pub profile_url: Option<String>,
}

/// One identity: username, its key and the identity salt
#[derive(Debug, Clone)]
pub struct Account {
    pub username: Option<String>,
    pub keys: ExtendedKey,
    pub salt: String,
    pub metadata: AccountMetadata,
}

impl Account {
    pub fn new(username: Option<String>, keys: ExtendedKey, salt: String) -> Self {
        Account {
            username,
            keys,
            salt,
            metadata: AccountMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: AccountMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Bitcoin-style address owning this identity
    pub fn owner_address(&self) -> String {
        self.keys.btc_address()
    }

    pub fn apps_node(&self) -> CryptoResult<AppsNode> {
        Ok(AppsNode {
            keys: self.keys.derive_hardened(APPS_NODE_INDEX)?,
            salt: self.salt.clone(),
        })
    }

    pub fn signing_node(&self) -> CryptoResult<ExtendedKey> {
        self.keys.derive_hardened(SIGNING_NODE_INDEX)
    }

    pub fn encryption_node(&self) -> CryptoResult<ExtendedKey> {
        self.keys.derive_hardened(ENCRYPTION_NODE_INDEX)
    }

    pub fn collections_node(&self) -> CryptoResult<CollectionsNode> {
        Ok(CollectionsNode {
            keys: self.keys.derive_hardened(COLLECTIONS_NODE_INDEX)?,
            salt: self.salt.clone(),
        })
    }

    /// Minimal user data describing this account
    pub fn to_user_data(&self) -> UserData {
        let identity_address = self.owner_address();
        UserData {
            decentralized_id: Some(format!("did:btc-addr:{}", identity_address)),
            identity_address: Some(identity_address),
            username: self.username.clone(),
            ..UserData::default()
        }
    }
}

/// Parent of all per-application keys
#[derive(Debug, Clone)]
pub struct AppsNode {
    keys: ExtendedKey,
    salt: String,
}

impl AppsNode {
    /// Key for an application origin; paths and default ports are ignored
    pub fn app_node(&self, origin: &str) -> CryptoResult<AppNode> {
        let normalized = normalize_origin(origin)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        let index = hashed_index(&format!("{}{}", normalized, self.salt));
        Ok(AppNode {
            keys: self.keys.derive_hardened(index)?,
        })
    }

    pub fn keys(&self) -> &ExtendedKey {
        &self.keys
    }
}

/// Key of one application origin
#[derive(Debug, Clone)]
pub struct AppNode {
    keys: ExtendedKey,
}

impl AppNode {
    pub fn keys(&self) -> &ExtendedKey {
        &self.keys
    }

    pub fn private_key_hex(&self) -> String {
        self.keys.private_key_hex()
    }

    pub fn public_key_hex(&self) -> String {
        self.keys.public_key_hex()
    }

    pub fn btc_address(&self) -> String {
        self.keys.btc_address()
    }
}

/// Parent of all per-collection keys
#[derive(Debug, Clone)]
pub struct CollectionsNode {
    keys: ExtendedKey,
    salt: String,
}

impl CollectionsNode {
    /// Key for a collection, e.g. `("contact", "default")`
    pub fn collection_node(
        &self,
        collection_type: &str,
        identifier: &str,
    ) -> CryptoResult<CollectionNode> {
        let index = hashed_index(&format!("{}{}{}", collection_type, identifier, self.salt));
        Ok(CollectionNode {
            keys: self.keys.derive_hardened(index)?,
        })
    }
}

/// Key of one named collection
#[derive(Debug, Clone)]
pub struct CollectionNode {
    keys: ExtendedKey,
}

impl CollectionNode {
    /// Hex private key used to encrypt the collection's files
    pub fn encryption_key_hex(&self) -> String {
        self.keys.private_key_hex()
    }

    pub fn public_key_hex(&self) -> String {
        self.keys.public_key_hex()
    }

    pub fn btc_address(&self) -> String {
        self.keys.btc_address()
    }
}
