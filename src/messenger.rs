//! Messenger: the single path for sending and retrieving messages on the ledger.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::cache::{TransactionCache, TransactionCacheItem};
use crate::ledger::{LedgerConfig, LedgerRepository};
use crate::models::Message;
use crate::parser::BundleParser;
use crate::transaction::{Bundle, BundleSigner, Transaction, ZeroValueSigner};
use crate::trytes::is_address;
use crate::types::{ChiotaError, Result, ADDRESS_LENGTH, TAG};

/// Sends messages as tagged bundles and reads them back through a cache.
pub struct Messenger<L, C>
where
    L: LedgerRepository,
    C: TransactionCache,
{
    ledger: L,
    cache: C,
    config: LedgerConfig,
    signer: Arc<dyn BundleSigner>,
}

impl<L, C> Messenger<L, C>
where
    L: LedgerRepository,
    C: TransactionCache,
{
    /// Creates a messenger for zero-value messaging bundles.
    pub fn new(ledger: L, cache: C, config: LedgerConfig) -> Self {
        Self {
            ledger,
            cache,
            config,
            signer: Arc::new(ZeroValueSigner),
        }
    }

    /// Replaces the bundle signer.
    pub fn with_signer(mut self, signer: Arc<dyn BundleSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Returns the ledger repository.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Returns the transaction cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Sends a message as a single-transfer bundle.
    ///
    /// Every failure is reported as [`ChiotaError::Messenger`]; messages of
    /// unknown type are rejected before anything is submitted.
    pub async fn send_message(&self, message: &Message) -> Result<Vec<Transaction>> {
        self.try_send(message).await.map_err(ChiotaError::messenger)
    }

    async fn try_send(&self, message: &Message) -> Result<Vec<Transaction>> {
        if !message.message_type.is_known() {
            return Err(ChiotaError::UnknownMessageType(
                message.message_type.to_string(),
            ));
        }
        if !is_address(&message.receiver_address) {
            return Err(ChiotaError::InvalidAddress(message.receiver_address.clone()));
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut bundle = Bundle::new();
        bundle.add_transfer(&message.receiver_address, &message.payload, TAG, timestamp)?;
        bundle.finalize()?;
        self.signer.sign(&mut bundle)?;

        let attached = self
            .ledger
            .send_trytes(
                &bundle.to_trytes(),
                self.config.depth,
                self.config.min_weight_magnitude,
            )
            .await?;

        debug!(
            message_type = %message.message_type,
            address = %message.receiver_address,
            transactions = attached.len(),
            "sent message"
        );
        Ok(attached)
    }

    /// Retrieves every message at an address using the given parser.
    ///
    /// The address may carry its checksum; it is cached without it.
    ///
    /// Transactions already in the cache are not fetched again; bundles of
    /// new transactions are fetched once and their transactions at this
    /// address are cached. Only transactions the ledger still reports are
    /// returned, so a snapshot hides cached data too.
    pub async fn get_messages_by_address(
        &self,
        address: &str,
        parser: BundleParser,
    ) -> Result<Vec<Message>> {
        self.try_get_messages(address, parser)
            .await
            .map_err(ChiotaError::messenger)
    }

    async fn try_get_messages(&self, address: &str, parser: BundleParser) -> Result<Vec<Message>> {
        if !is_address(address) {
            return Err(ChiotaError::InvalidAddress(address.to_string()));
        }
        // Transactions store the address without its checksum.
        let address = &address[..ADDRESS_LENGTH];

        let mut cached: HashMap<String, Transaction> = HashMap::new();
        for item in self.cache.load_transactions_by_address(address).await? {
            match item.transaction() {
                Some(tx) => {
                    cached.insert(item.transaction_hash.clone(), tx);
                }
                None => warn!(hash = %item.transaction_hash, "skipping unreadable cache item"),
            }
        }

        let hashes = self
            .ledger
            .find_transactions_by_addresses(&[address.to_string()])
            .await?;

        // bundle hash -> transactions, in order of first appearance
        let mut groups: Vec<(String, Vec<Transaction>)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut fetched = 0usize;

        for hash in hashes {
            if !seen.insert(hash.clone()) {
                continue;
            }

            if let Some(tx) = cached.get(&hash) {
                push_grouped(&mut groups, tx.clone());
                continue;
            }

            let bundle = self.ledger.get_bundle(&hash).await?;
            fetched += 1;
            for tx in bundle.transactions {
                if tx.address == address && !cached.contains_key(&tx.hash) {
                    self.cache
                        .save_transaction(TransactionCacheItem::from_transaction(address, &tx))
                        .await?;
                    cached.insert(tx.hash.clone(), tx.clone());
                }
                if tx.hash != hash && !seen.insert(tx.hash.clone()) {
                    continue;
                }
                push_grouped(&mut groups, tx);
            }
        }

        let messages: Vec<Message> = groups
            .into_iter()
            .flat_map(|(_, transactions)| parser.parse(&Bundle::from_transactions(transactions)))
            .collect();

        debug!(
            address = %address,
            bundles_fetched = fetched,
            messages = messages.len(),
            "read messages"
        );
        Ok(messages)
    }

    /// Clears the transaction cache (logout or account switch).
    pub async fn flush_cache(&self) -> Result<()> {
        self.cache.flush().await
    }
}

fn push_grouped(groups: &mut Vec<(String, Vec<Transaction>)>, tx: Transaction) {
    match groups.iter_mut().find(|(bundle, _)| *bundle == tx.bundle) {
        Some((_, members)) => members.push(tx),
        None => groups.push((tx.bundle.clone(), vec![tx])),
    }
}
