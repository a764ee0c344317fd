//! Byte and integer codecs for the 27-symbol tryte alphabet.
//!
//! The ledger only carries trytes, so every payload, address and numeric
//! transaction field passes through this module.

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::types::{
    ChiotaError, Result, ADDRESS_LENGTH, ADDRESS_WITH_CHECKSUM_LENGTH, REQUEST_ADDRESS_SUFFIX_LENGTH,
    SEED_LENGTH,
};

/// The tryte alphabet. `9` is zero, `A`..`Z` are 1..26.
pub const TRYTE_ALPHABET: &[u8; 27] = b"9ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn tryte_index(symbol: u8) -> Option<usize> {
    match symbol {
        b'9' => Some(0),
        b'A'..=b'Z' => Some((symbol - b'A') as usize + 1),
        _ => None,
    }
}

/// Encode bytes as trytes, two symbols per byte (`b % 27`, then `b / 27`).
pub fn encode_bytes_to_trytes(bytes: &[u8]) -> String {
    let mut trytes = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        trytes.push(TRYTE_ALPHABET[(byte % 27) as usize] as char);
        trytes.push(TRYTE_ALPHABET[(byte / 27) as usize] as char);
    }
    trytes
}

/// Decode trytes produced by [`encode_bytes_to_trytes`].
///
/// Returns `None` for odd-length input, symbols outside the alphabet, or
/// pairs that do not map to a byte.
pub fn decode_trytes_to_bytes(trytes: &str) -> Option<Vec<u8>> {
    let symbols = trytes.as_bytes();
    if symbols.len() % 2 != 0 {
        return None;
    }

    symbols
        .chunks_exact(2)
        .map(|pair| {
            let low = tryte_index(pair[0])?;
            let high = tryte_index(pair[1])?;
            u8::try_from(low + high * 27).ok()
        })
        .collect()
}

/// Increment a tryte string as a little-endian base-27 counter.
///
/// The first symbol below `Z` is incremented and every `Z` before it is
/// reset to `A`. An all-`Z` string has no room left and is returned
/// unchanged.
pub fn increment_trytes(trytes: &str) -> String {
    let mut symbols = trytes.as_bytes().to_vec();

    for i in 0..symbols.len() {
        if symbols[i] == b'Z' {
            continue;
        }
        let Some(index) = tryte_index(symbols[i]) else {
            return trytes.to_string();
        };
        symbols[i] = TRYTE_ALPHABET[index + 1];
        for symbol in symbols.iter_mut().take(i) {
            *symbol = b'A';
        }
        return String::from_utf8_lossy(&symbols).into_owned();
    }

    trytes.to_string()
}

/// Whether every symbol belongs to the tryte alphabet.
pub fn is_trytes(value: &str) -> bool {
    value.bytes().all(|b| tryte_index(b).is_some())
}

/// Whether the value is an address, with or without checksum.
pub fn is_address(value: &str) -> bool {
    (value.len() == ADDRESS_LENGTH || value.len() == ADDRESS_WITH_CHECKSUM_LENGTH)
        && is_trytes(value)
}

/// Validates a seed and returns it.
pub fn validate_seed(seed: &str) -> Result<&str> {
    if seed.is_empty() || seed.len() > SEED_LENGTH || !is_trytes(seed) {
        return Err(ChiotaError::InvalidSeed(format!(
            "expected up to {SEED_LENGTH} trytes, got {} characters",
            seed.len()
        )));
    }
    Ok(seed)
}

/// Right-pad with `9` up to `length` symbols.
pub fn pad_trytes(trytes: &str, length: usize) -> String {
    let mut padded = String::with_capacity(length.max(trytes.len()));
    padded.push_str(trytes);
    while padded.len() < length {
        padded.push('9');
    }
    padded
}

/// Generate `length` random trytes.
pub fn random_trytes(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| TRYTE_ALPHABET[rng.gen_range(0..27)] as char)
        .collect()
}

/// Generate a random address (used for private chat channels).
pub fn random_address() -> String {
    random_trytes(ADDRESS_LENGTH)
}

/// Generate a random seed.
pub fn generate_seed() -> String {
    random_trytes(SEED_LENGTH)
}

/// Derive the request address from a public key address.
///
/// The last twelve symbols are incremented so both addresses stay related
/// without needing another seed index.
pub fn derive_request_address(public_key_address: &str) -> Result<String> {
    if !is_address(public_key_address) {
        return Err(ChiotaError::InvalidAddress(public_key_address.to_string()));
    }
    let address = &public_key_address[..ADDRESS_LENGTH];
    let split = ADDRESS_LENGTH - REQUEST_ADDRESS_SUFFIX_LENGTH;
    Ok(format!(
        "{}{}",
        &address[..split],
        increment_trytes(&address[split..])
    ))
}

/// Hash arbitrary data into `length` trytes (SHA-256 in counter mode).
pub fn hash_to_trytes(data: &[u8], length: usize) -> String {
    let mut trytes = String::with_capacity(length);
    let mut counter: u32 = 0;

    while trytes.len() < length {
        let digest = Sha256::new()
            .chain_update(data)
            .chain_update(counter.to_be_bytes())
            .finalize();
        for byte in digest.iter() {
            if trytes.len() == length {
                break;
            }
            trytes.push(TRYTE_ALPHABET[(byte % 27) as usize] as char);
        }
        counter += 1;
    }

    trytes
}

// ============================================================================
// Balanced ternary
// ============================================================================

/// Encode a signed integer as `length` trytes of balanced ternary.
///
/// Values that do not fit are truncated to their low trits.
pub fn int_to_trytes(value: i64, length: usize) -> String {
    let mut trits = Vec::with_capacity(length * 3);
    let negative = value < 0;
    let mut remaining = value.unsigned_abs();

    while remaining > 0 && trits.len() < length * 3 {
        let mut trit = (remaining % 3) as i8;
        remaining /= 3;
        if trit == 2 {
            trit = -1;
            remaining += 1;
        }
        trits.push(if negative { -trit } else { trit });
    }
    trits.resize(length * 3, 0);

    trits
        .chunks_exact(3)
        .map(|t| {
            let value = t[0] + t[1] * 3 + t[2] * 9;
            let index = if value < 0 { value + 27 } else { value };
            TRYTE_ALPHABET[index as usize] as char
        })
        .collect()
}

/// Decode balanced-ternary trytes produced by [`int_to_trytes`].
pub fn trytes_to_int(trytes: &str) -> Option<i64> {
    let mut value: i64 = 0;
    let mut power: i64 = 1;

    for symbol in trytes.bytes() {
        let index = tryte_index(symbol)? as i64;
        let mut tryte = if index > 13 { index - 27 } else { index };
        for _ in 0..3 {
            let mut trit = tryte.rem_euclid(3);
            tryte = tryte.div_euclid(3);
            if trit == 2 {
                trit = -1;
                tryte += 1;
            }
            value = value.checked_add(trit.checked_mul(power)?)?;
            power = power.saturating_mul(3);
        }
    }

    Some(value)
}
