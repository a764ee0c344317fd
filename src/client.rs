//! The Chiota client.
//!
//! [`Chiota`] is built once per user session and holds every collaborator the
//! interactors need. The use cases themselves live in
//! [`crate::interactors`].

use std::sync::Arc;

use crate::cache::{InMemoryTransactionCache, TransactionCache};
use crate::crypto::{EncryptionProvider, X25519Encryption};
use crate::ledger::{InMemoryLedger, LedgerConfig, LedgerRepository};
use crate::messenger::Messenger;
use crate::repository::{ContactRepository, TangleContactRepository};
use crate::trytes::{hash_to_trytes, validate_seed};
use crate::types::{ChiotaError, Result, ADDRESS_LENGTH};

/// Configuration for the Chiota client.
#[derive(Debug, Clone)]
pub struct ChiotaConfig {
    /// Ledger node configuration.
    pub ledger: LedgerConfig,
    /// Address security level (1 to 3).
    pub security_level: u8,
    /// How many candidate public key addresses CheckUser tries before giving up.
    pub max_public_key_address_attempts: usize,
}

impl ChiotaConfig {
    /// Creates a new configuration with the given ledger settings.
    pub fn new(ledger: LedgerConfig) -> Self {
        Self {
            ledger,
            security_level: 2,
            max_public_key_address_attempts: 10,
        }
    }

    /// Creates a configuration for a local node.
    pub fn localnet() -> Self {
        Self::new(LedgerConfig::localnet())
    }

    /// Creates a configuration for the devnet.
    pub fn devnet() -> Self {
        Self::new(LedgerConfig::devnet())
    }

    /// Creates a configuration for the mainnet.
    pub fn mainnet() -> Self {
        Self::new(LedgerConfig::mainnet())
    }
}

/// Derives addresses from a seed.
pub trait AddressGenerator: Send + Sync {
    /// The address at `index` for the given security level.
    fn generate_address(&self, seed: &str, index: u64, security_level: u8) -> Result<String>;
}

/// Deterministic hash-based address generator.
///
/// Stands in for the ledger's signature scheme address derivation; the same
/// seed, index and security level always give the same address.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashAddressGenerator;

impl AddressGenerator for HashAddressGenerator {
    fn generate_address(&self, seed: &str, index: u64, security_level: u8) -> Result<String> {
        let seed = validate_seed(seed)?;
        if !(1..=3).contains(&security_level) {
            return Err(ChiotaError::InvalidSecurityLevel(security_level));
        }

        let mut material = Vec::with_capacity(seed.len() + 9);
        material.extend_from_slice(seed.as_bytes());
        material.extend_from_slice(&index.to_be_bytes());
        material.push(security_level);
        Ok(hash_to_trytes(&material, ADDRESS_LENGTH))
    }
}

/// A Chiota session.
pub struct Chiota<L, C, R, E>
where
    L: LedgerRepository,
    C: TransactionCache,
    R: ContactRepository,
    E: EncryptionProvider,
{
    pub(crate) config: ChiotaConfig,
    pub(crate) messenger: Arc<Messenger<L, C>>,
    pub(crate) repository: R,
    pub(crate) encryption: E,
    pub(crate) address_generator: Box<dyn AddressGenerator>,
}

impl<L, C, R, E> Chiota<L, C, R, E>
where
    L: LedgerRepository,
    C: TransactionCache,
    R: ContactRepository,
    E: EncryptionProvider,
{
    /// Creates a client from its collaborators.
    pub fn new(
        config: ChiotaConfig,
        messenger: Arc<Messenger<L, C>>,
        repository: R,
        encryption: E,
    ) -> Self {
        Self {
            config,
            messenger,
            repository,
            encryption,
            address_generator: Box::new(HashAddressGenerator),
        }
    }

    /// Replaces the address generator.
    pub fn with_address_generator(mut self, generator: Box<dyn AddressGenerator>) -> Self {
        self.address_generator = generator;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ChiotaConfig {
        &self.config
    }

    /// Returns the messenger.
    pub fn messenger(&self) -> &Arc<Messenger<L, C>> {
        &self.messenger
    }

    /// Returns the contact repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns the encryption provider.
    pub fn encryption(&self) -> &E {
        &self.encryption
    }

    /// Ends the session by dropping every cached transaction.
    pub async fn logout(&self) -> Result<()> {
        self.messenger.flush_cache().await
    }
}

/// A client wired to an in-memory tangle.
pub type InMemoryChiota = Chiota<
    InMemoryLedger,
    InMemoryTransactionCache,
    TangleContactRepository<InMemoryLedger, InMemoryTransactionCache>,
    X25519Encryption,
>;

impl InMemoryChiota {
    /// Creates a session on `ledger` with its own cache and contact store.
    pub fn in_memory(ledger: InMemoryLedger, config: ChiotaConfig) -> Self {
        let messenger = Arc::new(Messenger::new(
            ledger,
            InMemoryTransactionCache::new(),
            config.ledger.clone(),
        ));
        let repository = TangleContactRepository::new(messenger.clone());
        Self::new(config, messenger, repository, X25519Encryption::new())
    }
}
