//! Transaction cache.
//!
//! Remembers transactions already fetched for an address so their bundles
//! are not downloaded again. The cache is scoped to one user session and is
//! flushed wholesale on logout.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transaction::Transaction;
use crate::types::Result;

/// A transaction seen at an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCacheItem {
    /// Address the transaction was fetched for.
    pub address: String,
    /// Transaction hash.
    pub transaction_hash: String,
    /// Serialized transaction.
    pub transaction_trytes: String,
}

impl TransactionCacheItem {
    /// Creates a cache item from an attached transaction.
    pub fn from_transaction(address: &str, transaction: &Transaction) -> Self {
        Self {
            address: address.to_string(),
            transaction_hash: transaction.hash.clone(),
            transaction_trytes: transaction.to_trytes(),
        }
    }

    /// Parses the cached transaction back.
    pub fn transaction(&self) -> Option<Transaction> {
        Transaction::from_trytes(&self.transaction_hash, &self.transaction_trytes)
    }
}

/// Trait for storing transactions already seen at an address.
#[async_trait::async_trait]
pub trait TransactionCache: Send + Sync {
    /// Load every cached transaction for an address, in insertion order.
    async fn load_transactions_by_address(&self, address: &str)
        -> Result<Vec<TransactionCacheItem>>;

    /// Append a transaction. Callers check for duplicates first.
    async fn save_transaction(&self, item: TransactionCacheItem) -> Result<()>;

    /// Clear all cached data.
    async fn flush(&self) -> Result<()>;
}

/// In-memory implementation of TransactionCache.
#[derive(Default)]
pub struct InMemoryTransactionCache {
    items: Arc<RwLock<Vec<TransactionCacheItem>>>,
}

impl InMemoryTransactionCache {
    /// Creates a new in-memory transaction cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TransactionCache for InMemoryTransactionCache {
    async fn load_transactions_by_address(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionCacheItem>> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|item| item.address == address)
            .cloned()
            .collect())
    }

    async fn save_transaction(&self, item: TransactionCacheItem) -> Result<()> {
        let mut items = self.items.write().await;
        items.push(item);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let mut items = self.items.write().await;
        items.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(address: &str, hash: &str) -> TransactionCacheItem {
        TransactionCacheItem {
            address: address.to_string(),
            transaction_hash: hash.to_string(),
            transaction_trytes: "TRYTES".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_by_address_keeps_insertion_order() {
        let cache = InMemoryTransactionCache::new();
        cache.save_transaction(item("A", "h2")).await.unwrap();
        cache.save_transaction(item("B", "h9")).await.unwrap();
        cache.save_transaction(item("A", "h1")).await.unwrap();

        let loaded = cache.load_transactions_by_address("A").await.unwrap();
        let hashes: Vec<_> = loaded.iter().map(|i| i.transaction_hash.as_str()).collect();
        assert_eq!(hashes, vec!["h2", "h1"]);
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let cache = InMemoryTransactionCache::new();
        cache.save_transaction(item("A", "h1")).await.unwrap();

        let first = cache.load_transactions_by_address("A").await.unwrap();
        let second = cache.load_transactions_by_address("A").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_save_does_not_deduplicate() {
        let cache = InMemoryTransactionCache::new();
        cache.save_transaction(item("A", "h1")).await.unwrap();
        cache.save_transaction(item("A", "h1")).await.unwrap();
        assert_eq!(cache.load_transactions_by_address("A").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_flush() {
        let cache = InMemoryTransactionCache::new();
        cache.save_transaction(item("A", "h1")).await.unwrap();
        cache.flush().await.unwrap();
        assert!(cache.load_transactions_by_address("A").await.unwrap().is_empty());
    }
}
