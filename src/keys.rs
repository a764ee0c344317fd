//! Key derivation and management for Chiota.

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::trytes::encode_bytes_to_trytes;
use crate::types::{ChiotaError, Result, KEY_DERIVATION_INFO};

/// Size of an X25519 key in bytes.
pub const KEY_SIZE: usize = 32;

/// An asymmetric key pair.
///
/// The bytes are opaque to everything but the encryption provider.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// Public key bytes.
    pub public_key: Vec<u8>,
    /// Private key bytes.
    pub private_key: Vec<u8>,
}

impl KeyPair {
    /// The public key as trytes, the form uploaded to the ledger.
    pub fn public_key_trytes(&self) -> String {
        encode_bytes_to_trytes(&self.public_key)
    }

    pub(crate) fn secret(&self) -> Result<StaticSecret> {
        let bytes: [u8; KEY_SIZE] = self
            .private_key
            .as_slice()
            .try_into()
            .map_err(|_| ChiotaError::KeyDerivationFailed("private key must be 32 bytes".into()))?;
        Ok(StaticSecret::from(bytes))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(&self.public_key))
            .finish_non_exhaustive()
    }
}

/// Derive an X25519 key pair from a seed and a salt using HKDF-SHA256.
///
/// The same seed and salt always give the same key pair. Users derive theirs
/// from their seed and public key address; chat key pairs come from the chat
/// password and the chat key address.
pub fn derive_key_pair(seed: &[u8], salt: &[u8]) -> Result<KeyPair> {
    if seed.is_empty() {
        return Err(ChiotaError::KeyDerivationFailed("empty seed".into()));
    }

    let hkdf = Hkdf::<Sha256>::new(Some(salt), seed);
    let mut derived_key = [0u8; KEY_SIZE];
    hkdf.expand(KEY_DERIVATION_INFO, &mut derived_key)
        .map_err(|e| ChiotaError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    let private_key = StaticSecret::from(derived_key);
    let public_key = PublicKey::from(&private_key);

    Ok(KeyPair {
        public_key: public_key.as_bytes().to_vec(),
        private_key: private_key.to_bytes().to_vec(),
    })
}

/// Parse public key bytes.
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey> {
    let array: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
        ChiotaError::InvalidPublicKey(format!("expected {KEY_SIZE} bytes, got {}", bytes.len()))
    })?;
    Ok(PublicKey::from(array))
}

/// Generate a random ephemeral X25519 key pair for sealing one block.
pub fn generate_ephemeral_keypair() -> (StaticSecret, PublicKey) {
    let private_key = StaticSecret::random_from_rng(rand::thread_rng());
    let public_key = PublicKey::from(&private_key);
    (private_key, public_key)
}

/// Perform X25519 ECDH key exchange.
pub fn x25519_ecdh(private_key: &StaticSecret, public_key: &PublicKey) -> [u8; 32] {
    private_key.diffie_hellman(public_key).to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trytes::decode_trytes_to_bytes;

    const SEED: &[u8] = b"KEVINSEED9999999999999999999999999999999999999999999999999999999999999999999999";

    #[test]
    fn test_deterministic_derivation() {
        let first = derive_key_pair(SEED, b"SALT").unwrap();
        let second = derive_key_pair(SEED, b"SALT").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.public_key.len(), KEY_SIZE);
    }

    #[test]
    fn test_salt_changes_key() {
        let first = derive_key_pair(SEED, b"CHATKEYADDRESSONE").unwrap();
        let second = derive_key_pair(SEED, b"CHATKEYADDRESSTWO").unwrap();
        assert_ne!(first.public_key, second.public_key);
    }

    #[test]
    fn test_empty_seed() {
        assert!(matches!(
            derive_key_pair(b"", b"SALT"),
            Err(ChiotaError::KeyDerivationFailed(_))
        ));
    }

    #[test]
    fn test_public_key_trytes() {
        let pair = derive_key_pair(SEED, b"SALT").unwrap();
        let trytes = pair.public_key_trytes();
        assert_eq!(trytes.len(), KEY_SIZE * 2);
        assert_eq!(decode_trytes_to_bytes(&trytes).unwrap(), pair.public_key);
    }

    #[test]
    fn test_secret_matches_public_key() {
        let pair = derive_key_pair(SEED, b"SALT").unwrap();
        let secret = pair.secret().unwrap();
        assert_eq!(PublicKey::from(&secret).as_bytes().as_slice(), pair.public_key.as_slice());
    }

    #[test]
    fn test_ecdh_agrees() {
        let (a_private, a_public) = generate_ephemeral_keypair();
        let (b_private, b_public) = generate_ephemeral_keypair();
        assert_eq!(x25519_ecdh(&a_private, &b_public), x25519_ecdh(&b_private, &a_public));
    }

    #[test]
    fn test_parse_public_key_length() {
        assert!(parse_public_key(&[0u8; 31]).is_err());
        assert!(parse_public_key(&[9u8; 32]).is_ok());
    }

    #[test]
    fn test_debug_hides_private_key() {
        let pair = derive_key_pair(SEED, b"SALT").unwrap();
        let rendered = format!("{pair:?}");
        assert!(!rendered.contains(&hex::encode(&pair.private_key)));
    }
}
