//! Crockford base32 byte-stream codec
//!
//! Bytes are consumed most-significant bit first and emitted as 5-bit digits.
//! A trailing partial digit is right-padded with zero bits. Decoding is lenient:
//! it folds case, maps the look-alike letters onto their digits and skips
//! anything outside the alphabet (including `=` padding).

/// Encoding alphabet; excludes I, L, O and U
pub const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Encode bytes as Crockford base32
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        out.push(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}

/// Decode Crockford base32; leftover bits short of a byte are dropped
pub fn decode(input: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for c in input.bytes() {
        let value = match digit_value(c) {
            Some(value) => value,
            None => continue,
        };
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    out
}

fn digit_value(c: u8) -> Option<u32> {
    match c.to_ascii_uppercase() {
        b'O' => Some(0),
        b'I' | b'L' => Some(1),
        b'U' => Some(27),
        upper => ALPHABET
            .iter()
            .position(|&a| a == upper)
            .map(|p| p as u32),
    }
}
