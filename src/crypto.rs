//! Asymmetric encryption for Chiota payloads.
//!
//! Contact descriptors, chat passwords and chat messages are all sealed for a
//! recipient public key. Plaintext is cut into blocks of at most
//! [`EncryptionProvider::max_size`] bytes and every block is sealed to exactly
//! [`EncryptionProvider::max_encryption_size`] bytes, so ciphertexts can be
//! concatenated and split again without framing.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::PublicKey;

use crate::keys::{
    derive_key_pair, generate_ephemeral_keypair, parse_public_key, x25519_ecdh, KeyPair, KEY_SIZE,
};
use crate::types::{ChiotaError, Result, ENCRYPTION_INFO_PREFIX};

/// Nonce size for ChaCha20-Poly1305.
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size for ChaCha20-Poly1305.
pub const TAG_SIZE: usize = 16;

/// Plaintext bytes carried by one sealed block.
pub const BLOCK_PLAINTEXT_SIZE: usize = 128;

const LENGTH_PREFIX_SIZE: usize = 2;

/// Size of one sealed block: ephemeral key, nonce, sealed length and data, tag.
pub const BLOCK_SIZE: usize =
    KEY_SIZE + NONCE_SIZE + LENGTH_PREFIX_SIZE + BLOCK_PLAINTEXT_SIZE + TAG_SIZE;

/// A public-key encryption scheme.
pub trait EncryptionProvider: Send + Sync {
    /// Deterministically derive a key pair from a seed and a salt.
    fn create_key_pair(&self, seed: &str, salt: &str) -> Result<KeyPair>;

    /// Encrypt bytes for the holder of `public_key`.
    fn encrypt(&self, public_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt bytes sealed for `key_pair`.
    fn decrypt(&self, key_pair: &KeyPair, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Largest plaintext block in bytes.
    fn max_size(&self) -> usize;

    /// Size of one encrypted block in bytes.
    fn max_encryption_size(&self) -> usize;
}

/// X25519 + HKDF-SHA256 + ChaCha20-Poly1305 sealed blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct X25519Encryption;

impl X25519Encryption {
    /// Creates the provider.
    pub fn new() -> Self {
        Self
    }

    fn block_key(
        shared_secret: &[u8; 32],
        ephemeral: &PublicKey,
        recipient: &PublicKey,
    ) -> Result<[u8; 32]> {
        // Build info: prefix + recipient pubkey
        let mut info = Vec::with_capacity(ENCRYPTION_INFO_PREFIX.len() + KEY_SIZE);
        info.extend_from_slice(ENCRYPTION_INFO_PREFIX);
        info.extend_from_slice(recipient.as_bytes());

        let hkdf = Hkdf::<Sha256>::new(Some(ephemeral.as_bytes()), shared_secret);
        let mut symmetric_key = [0u8; 32];
        hkdf.expand(&info, &mut symmetric_key)
            .map_err(|e| ChiotaError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;
        Ok(symmetric_key)
    }

    fn seal_block(&self, recipient: &PublicKey, chunk: &[u8]) -> Result<Vec<u8>> {
        let (ephemeral_private, ephemeral_public) = generate_ephemeral_keypair();
        let shared_secret = x25519_ecdh(&ephemeral_private, recipient);
        let symmetric_key = Self::block_key(&shared_secret, &ephemeral_public, recipient)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // Length prefix, then data zero-padded to a full block
        let mut padded = Vec::with_capacity(LENGTH_PREFIX_SIZE + BLOCK_PLAINTEXT_SIZE);
        padded.extend_from_slice(&(chunk.len() as u16).to_be_bytes());
        padded.extend_from_slice(chunk);
        padded.resize(LENGTH_PREFIX_SIZE + BLOCK_PLAINTEXT_SIZE, 0);

        let cipher = ChaCha20Poly1305::new_from_slice(&symmetric_key)
            .map_err(|e| ChiotaError::EncryptionError(format!("Cipher init failed: {e}")))?;
        let sealed = cipher
            .encrypt(nonce, padded.as_slice())
            .map_err(|e| ChiotaError::EncryptionError(format!("Encryption failed: {e}")))?;

        let mut block = Vec::with_capacity(BLOCK_SIZE);
        block.extend_from_slice(ephemeral_public.as_bytes());
        block.extend_from_slice(&nonce_bytes);
        block.extend_from_slice(&sealed);
        Ok(block)
    }

    fn open_block(&self, key_pair: &KeyPair, block: &[u8]) -> Result<Vec<u8>> {
        let recipient = parse_public_key(&key_pair.public_key)?;
        let secret = key_pair.secret()?;

        let (ephemeral_bytes, rest) = block.split_at(KEY_SIZE);
        let (nonce_bytes, sealed) = rest.split_at(NONCE_SIZE);
        let ephemeral_public = parse_public_key(ephemeral_bytes)?;

        let shared_secret = x25519_ecdh(&secret, &ephemeral_public);
        let symmetric_key = Self::block_key(&shared_secret, &ephemeral_public, &recipient)?;

        let cipher = ChaCha20Poly1305::new_from_slice(&symmetric_key)
            .map_err(|e| ChiotaError::DecryptionError(format!("Cipher init failed: {e}")))?;
        let padded = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|e| ChiotaError::DecryptionError(format!("Decryption failed: {e}")))?;

        let length = u16::from_be_bytes([padded[0], padded[1]]) as usize;
        if length > BLOCK_PLAINTEXT_SIZE {
            return Err(ChiotaError::DecryptionError(format!(
                "Block length {length} exceeds {BLOCK_PLAINTEXT_SIZE}"
            )));
        }
        Ok(padded[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + length].to_vec())
    }
}

impl EncryptionProvider for X25519Encryption {
    fn create_key_pair(&self, seed: &str, salt: &str) -> Result<KeyPair> {
        derive_key_pair(seed.as_bytes(), salt.as_bytes())
    }

    fn encrypt(&self, public_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let recipient = parse_public_key(public_key)?;

        if plaintext.is_empty() {
            return self.seal_block(&recipient, &[]);
        }

        let blocks = plaintext.len().div_ceil(BLOCK_PLAINTEXT_SIZE);
        let mut ciphertext = Vec::with_capacity(blocks * BLOCK_SIZE);
        for chunk in plaintext.chunks(BLOCK_PLAINTEXT_SIZE) {
            ciphertext.extend(self.seal_block(&recipient, chunk)?);
        }
        Ok(ciphertext)
    }

    fn decrypt(&self, key_pair: &KeyPair, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(ChiotaError::DecryptionError(format!(
                "Ciphertext length {} is not a multiple of {BLOCK_SIZE}",
                ciphertext.len()
            )));
        }

        let blocks = ciphertext.len() / BLOCK_SIZE;
        let mut plaintext = Vec::with_capacity(blocks * BLOCK_PLAINTEXT_SIZE);
        for block in ciphertext.chunks(BLOCK_SIZE) {
            plaintext.extend(self.open_block(key_pair, block)?);
        }
        Ok(plaintext)
    }

    fn max_size(&self) -> usize {
        BLOCK_PLAINTEXT_SIZE
    }

    fn max_encryption_size(&self) -> usize {
        BLOCK_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEVIN_SEED: &str = "KEVIN9999999999999999999999999999999999999999999999999999999999999999999999999999";
    const CHANTAL_SEED: &str = "CHANTAL99999999999999999999999999999999999999999999999999999999999999999999999999";

    fn keys(seed: &str) -> KeyPair {
        X25519Encryption::new().create_key_pair(seed, "PUBLICKEYADDRESS").unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let provider = X25519Encryption::new();
        let chantal = keys(CHANTAL_SEED);

        let message = b"Hello from Kevin!";
        let ciphertext = provider.encrypt(&chantal.public_key, message).unwrap();
        assert_eq!(ciphertext.len(), provider.max_encryption_size());

        let decrypted = provider.decrypt(&chantal, &ciphertext).unwrap();
        assert_eq!(decrypted, message);
    }

    #[test]
    fn test_multi_block_roundtrip() {
        let provider = X25519Encryption::new();
        let chantal = keys(CHANTAL_SEED);

        let message = vec![7u8; BLOCK_PLAINTEXT_SIZE * 2 + 5];
        let ciphertext = provider.encrypt(&chantal.public_key, &message).unwrap();
        assert_eq!(ciphertext.len(), BLOCK_SIZE * 3);
        assert_eq!(provider.decrypt(&chantal, &ciphertext).unwrap(), message);
    }

    #[test]
    fn test_empty_plaintext() {
        let provider = X25519Encryption::new();
        let chantal = keys(CHANTAL_SEED);
        let ciphertext = provider.encrypt(&chantal.public_key, b"").unwrap();
        assert_eq!(ciphertext.len(), BLOCK_SIZE);
        assert!(provider.decrypt(&chantal, &ciphertext).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_key_fails() {
        let provider = X25519Encryption::new();
        let kevin = keys(KEVIN_SEED);
        let chantal = keys(CHANTAL_SEED);

        let ciphertext = provider.encrypt(&chantal.public_key, b"secret").unwrap();
        assert!(matches!(
            provider.decrypt(&kevin, &ciphertext),
            Err(ChiotaError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let provider = X25519Encryption::new();
        let chantal = keys(CHANTAL_SEED);
        let ciphertext = provider.encrypt(&chantal.public_key, b"secret").unwrap();
        assert!(provider.decrypt(&chantal, &ciphertext[..BLOCK_SIZE - 1]).is_err());
        assert!(provider.decrypt(&chantal, &[]).is_err());
    }

    #[test]
    fn test_tampered_block_fails() {
        let provider = X25519Encryption::new();
        let chantal = keys(CHANTAL_SEED);
        let mut ciphertext = provider.encrypt(&chantal.public_key, b"secret").unwrap();
        ciphertext[KEY_SIZE + NONCE_SIZE + 3] ^= 0x01;
        assert!(provider.decrypt(&chantal, &ciphertext).is_err());
    }

    #[test]
    fn test_invalid_public_key() {
        let provider = X25519Encryption::new();
        assert!(matches!(
            provider.encrypt(&[1, 2, 3], b"secret"),
            Err(ChiotaError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_encryption_is_randomized() {
        let provider = X25519Encryption::new();
        let chantal = keys(CHANTAL_SEED);
        let first = provider.encrypt(&chantal.public_key, b"same").unwrap();
        let second = provider.encrypt(&chantal.public_key, b"same").unwrap();
        assert_ne!(first, second);
    }
}
