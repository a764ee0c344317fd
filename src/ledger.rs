//! Ledger interfaces for Tangle integration.
//!
//! This module provides the trait the messenger uses to talk to an IOTA
//! node, and an in-memory tangle for tests and offline use. Implementations
//! can wrap any node client.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use tracing::debug;

use crate::transaction::{Bundle, Transaction, HASH_LENGTH};
use crate::trytes::hash_to_trytes;
use crate::types::{ChiotaError, Result, ADDRESS_LENGTH};

/// Configuration for ledger node connections.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Node URI.
    pub node_uri: String,
    /// Tip selection depth.
    pub depth: u32,
    /// Minimum weight magnitude for proof-of-work.
    pub min_weight_magnitude: u32,
}

impl LedgerConfig {
    /// Creates a new configuration for connecting to a node.
    pub fn new(node_uri: &str, depth: u32, min_weight_magnitude: u32) -> Self {
        Self {
            node_uri: node_uri.to_string(),
            depth,
            min_weight_magnitude,
        }
    }

    /// Creates configuration for a local node (private tangle).
    pub fn localnet() -> Self {
        Self::new("http://localhost:14265", 3, 9)
    }

    /// Creates configuration for the devnet.
    pub fn devnet() -> Self {
        Self::new("https://nodes.devnet.iota.org:443", 3, 9)
    }

    /// Creates configuration for the mainnet.
    pub fn mainnet() -> Self {
        Self::new("https://nodes.thetangle.org:443", 2, 14)
    }
}

/// Trait for interacting with a ledger node.
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Find the hashes of all transactions at any of the addresses.
    async fn find_transactions_by_addresses(&self, addresses: &[String]) -> Result<Vec<String>>;

    /// Get the bundle containing the transaction.
    async fn get_bundle(&self, transaction_hash: &str) -> Result<Bundle>;

    /// Attach and broadcast serialized transactions.
    async fn send_trytes(
        &self,
        trytes: &[String],
        depth: u32,
        min_weight_magnitude: u32,
    ) -> Result<Vec<Transaction>>;
}

/// In-memory tangle.
///
/// Clones share the same tangle, so several clients can talk through one
/// instance. Proof-of-work and tip selection are not simulated.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    transactions: Arc<RwLock<Vec<Transaction>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryLedger {
    /// Creates an empty tangle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every transaction, like a global snapshot.
    pub async fn snapshot(&self) {
        let mut transactions = self.transactions.write().await;
        transactions.clear();
    }

    /// Makes every call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of attached transactions.
    pub async fn transaction_count(&self) -> usize {
        self.transactions.read().await.len()
    }

    /// All attached transactions at an address.
    pub async fn transactions_at(&self, address: &str) -> Vec<Transaction> {
        let transactions = self.transactions.read().await;
        transactions
            .iter()
            .filter(|tx| tx.address == address)
            .cloned()
            .collect()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ChiotaError::Ledger("node unreachable".to_string()));
        }
        Ok(())
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait::async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn find_transactions_by_addresses(&self, addresses: &[String]) -> Result<Vec<String>> {
        self.check_online()?;
        let wanted: HashSet<&str> = addresses
            .iter()
            .map(|a| &a[..ADDRESS_LENGTH.min(a.len())])
            .collect();

        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .filter(|tx| wanted.contains(tx.address.as_str()))
            .map(|tx| tx.hash.clone())
            .collect())
    }

    async fn get_bundle(&self, transaction_hash: &str) -> Result<Bundle> {
        self.check_online()?;
        let transactions = self.transactions.read().await;

        let tail = transactions
            .iter()
            .find(|tx| tx.hash == transaction_hash)
            .ok_or_else(|| {
                ChiotaError::Ledger(format!("transaction not found: {transaction_hash}"))
            })?;

        let members = transactions
            .iter()
            .filter(|tx| tx.bundle == tail.bundle)
            .cloned()
            .collect();
        Ok(Bundle::from_transactions(members))
    }

    async fn send_trytes(
        &self,
        trytes: &[String],
        depth: u32,
        min_weight_magnitude: u32,
    ) -> Result<Vec<Transaction>> {
        self.check_online()?;
        let attached_at = unix_millis();

        let mut attached = Vec::with_capacity(trytes.len());
        for raw in trytes {
            let mut tx = Transaction::from_trytes("", raw)
                .ok_or_else(|| ChiotaError::InvalidTrytes("malformed transaction".to_string()))?;
            tx.attachment_timestamp = attached_at;
            tx.hash = hash_to_trytes(tx.to_trytes().as_bytes(), HASH_LENGTH);
            attached.push(tx);
        }

        debug!(
            count = attached.len(),
            depth, min_weight_magnitude, "attached transactions"
        );

        let mut transactions = self.transactions.write().await;
        transactions.extend(attached.iter().cloned());
        Ok(attached)
    }
}
