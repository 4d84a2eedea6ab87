//! Address encoding
//!
//! Bitcoin-style addresses are Base58Check over `0x00 || hash160(pubkey)`.
//! Stacks-style addresses run the same hash pipeline through the Crockford
//! codec with a network version byte and a double-SHA256 checksum.

use k256::PublicKey;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use super::crockford;
use super::{compressed_public_key, CryptoError, CryptoResult};

/// Version byte of mainnet Bitcoin pay-to-pubkey-hash addresses
pub const BTC_ADDRESS_VERSION: u8 = 0x00;

/// Stacks networks and their address versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StacksNetwork {
    Mainnet,
    Testnet,
}

impl StacksNetwork {
    /// Single-sig address version byte
    pub fn version(&self) -> u8 {
        match self {
            StacksNetwork::Mainnet => 0x16,
            StacksNetwork::Testnet => 0x1a,
        }
    }

    // The version occupies the top 5 bits of a leading byte so that the
    // byte-stream encoder emits it as the first digit followed by 3 zero bits
    fn prefix_byte(&self) -> u8 {
        self.version() << 3
    }

    fn from_version(version: u8) -> Option<Self> {
        match version {
            0x16 => Some(StacksNetwork::Mainnet),
            0x1a => Some(StacksNetwork::Testnet),
            _ => None,
        }
    }
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

fn checksum(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Base58Check address for a hash160
pub fn btc_address_from_hash160(hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(BTC_ADDRESS_VERSION);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}

/// Bitcoin-style address of a public key, hashed in compressed form
pub fn public_key_to_btc_address(public_key: &PublicKey) -> String {
    btc_address_from_hash160(&hash160(&compressed_public_key(public_key)))
}

/// Decode a Base58Check address into `(version, hash160)`
pub fn decode_btc_address(address: &str) -> CryptoResult<(u8, [u8; 20])> {
    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| CryptoError::InvalidAddress(format!("{}: {}", address, e)))?;

    if payload.len() != 21 {
        return Err(CryptoError::InvalidAddress(format!(
            "{}: unexpected payload length {}",
            address,
            payload.len()
        )));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    Ok((payload[0], hash))
}

/// Stacks address for a hash160, e.g. `SP2WNPKG...`
///
/// With `with_prefix` false the leading `S` is omitted.
pub fn stx_address_from_hash160(
    hash: &[u8; 20],
    network: StacksNetwork,
    with_prefix: bool,
) -> String {
    let mut versioned = Vec::with_capacity(21);
    versioned.push(network.version());
    versioned.extend_from_slice(hash);

    let mut data = Vec::with_capacity(25);
    data.push(network.prefix_byte());
    data.extend_from_slice(hash);
    data.extend_from_slice(&checksum(&versioned));

    let encoded = crockford::encode(&data);
    if with_prefix {
        format!("S{}", encoded)
    } else {
        encoded
    }
}

/// Stacks address of a public key, hashed in compressed form
pub fn public_key_to_stx_address(
    public_key: &PublicKey,
    network: StacksNetwork,
    with_prefix: bool,
) -> String {
    stx_address_from_hash160(
        &hash160(&compressed_public_key(public_key)),
        network,
        with_prefix,
    )
}

/// Decode a Stacks address (with or without the `S` prefix) into its network and hash160
pub fn decode_stx_address(address: &str) -> CryptoResult<(StacksNetwork, [u8; 20])> {
    let body = address.strip_prefix('S').unwrap_or(address);
    let data = crockford::decode(body);
    if data.len() != 25 {
        return Err(CryptoError::InvalidAddress(format!(
            "{}: unexpected length",
            address
        )));
    }

    let version = data[0] >> 3;
    let network = StacksNetwork::from_version(version).ok_or_else(|| {
        CryptoError::InvalidAddress(format!("{}: unknown version {}", address, version))
    })?;

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&data[1..21]);

    let mut versioned = Vec::with_capacity(21);
    versioned.push(version);
    versioned.extend_from_slice(&hash);
    if checksum(&versioned) != data[21..25] {
        return Err(CryptoError::InvalidAddress(format!(
            "{}: checksum mismatch",
            address
        )));
    }

    Ok((network, hash))
}
