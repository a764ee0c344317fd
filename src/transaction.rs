//! Ledger transactions and bundles.
//!
//! A transaction is a fixed-size tryte record; a bundle is the ordered group
//! of transactions that make up one transfer. Payloads longer than one
//! fragment span several transactions of the same bundle.

use sha2::{Digest, Sha256};

use crate::trytes::{hash_to_trytes, int_to_trytes, is_address, pad_trytes, trytes_to_int};
use crate::types::{ChiotaError, Result, ADDRESS_LENGTH, FRAGMENT_LENGTH};

/// Number of trytes in a serialized transaction.
pub const TRANSACTION_LENGTH: usize = 2673;

/// Number of trytes in a hash (transaction, bundle, trunk, branch).
pub const HASH_LENGTH: usize = 81;

/// Number of trytes in a tag.
pub const TAG_LENGTH: usize = 27;

const VALUE_LENGTH: usize = 27;
const INT_FIELD_LENGTH: usize = 9;
const NONCE_LENGTH: usize = 27;

/// A single ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction hash, assigned by the ledger on attachment.
    pub hash: String,
    /// Message (or signature) fragment, 2187 trytes.
    pub signature_message_fragment: String,
    /// Receiving address.
    pub address: String,
    /// Transferred value; negative for inputs.
    pub value: i64,
    /// Tag used for bundle hashing.
    pub obsolete_tag: String,
    /// Creation time (Unix seconds).
    pub timestamp: u64,
    /// Position within the bundle.
    pub current_index: u64,
    /// Index of the last transaction in the bundle.
    pub last_index: u64,
    /// Bundle hash shared by all transactions of the bundle.
    pub bundle: String,
    /// Approved trunk transaction.
    pub trunk_transaction: String,
    /// Approved branch transaction.
    pub branch_transaction: String,
    /// Application tag.
    pub tag: String,
    /// Attachment time (Unix milliseconds), assigned by the ledger.
    pub attachment_timestamp: u64,
    /// Proof-of-work nonce.
    pub nonce: String,
}

impl Transaction {
    /// Creates an unattached zero-value transaction carrying a fragment.
    pub fn new(address: &str, fragment: &str, tag: &str, timestamp: u64) -> Self {
        let tag = pad_trytes(tag, TAG_LENGTH);
        Self {
            hash: String::new(),
            signature_message_fragment: pad_trytes(fragment, FRAGMENT_LENGTH),
            address: address[..ADDRESS_LENGTH.min(address.len())].to_string(),
            value: 0,
            obsolete_tag: tag.clone(),
            timestamp,
            current_index: 0,
            last_index: 0,
            bundle: "9".repeat(HASH_LENGTH),
            trunk_transaction: "9".repeat(HASH_LENGTH),
            branch_transaction: "9".repeat(HASH_LENGTH),
            tag,
            attachment_timestamp: 0,
            nonce: "9".repeat(NONCE_LENGTH),
        }
    }

    /// Serializes the transaction into its 2673-tryte form.
    pub fn to_trytes(&self) -> String {
        let mut trytes = String::with_capacity(TRANSACTION_LENGTH);
        trytes.push_str(&pad_trytes(&self.signature_message_fragment, FRAGMENT_LENGTH));
        trytes.push_str(&pad_trytes(&self.address, ADDRESS_LENGTH));
        trytes.push_str(&int_to_trytes(self.value, VALUE_LENGTH));
        trytes.push_str(&pad_trytes(&self.obsolete_tag, TAG_LENGTH));
        trytes.push_str(&int_to_trytes(self.timestamp as i64, INT_FIELD_LENGTH));
        trytes.push_str(&int_to_trytes(self.current_index as i64, INT_FIELD_LENGTH));
        trytes.push_str(&int_to_trytes(self.last_index as i64, INT_FIELD_LENGTH));
        trytes.push_str(&pad_trytes(&self.bundle, HASH_LENGTH));
        trytes.push_str(&pad_trytes(&self.trunk_transaction, HASH_LENGTH));
        trytes.push_str(&pad_trytes(&self.branch_transaction, HASH_LENGTH));
        trytes.push_str(&pad_trytes(&self.tag, TAG_LENGTH));
        trytes.push_str(&int_to_trytes(
            self.attachment_timestamp as i64,
            INT_FIELD_LENGTH,
        ));
        // lower and upper attachment bounds are not used
        trytes.push_str(&"9".repeat(INT_FIELD_LENGTH * 2));
        trytes.push_str(&pad_trytes(&self.nonce, NONCE_LENGTH));
        trytes
    }

    /// Parses a transaction from its tryte form.
    ///
    /// Returns `None` when the input is not a well-formed transaction.
    pub fn from_trytes(hash: &str, trytes: &str) -> Option<Self> {
        if trytes.len() != TRANSACTION_LENGTH || !crate::trytes::is_trytes(trytes) {
            return None;
        }

        let mut rest = trytes;
        let mut take = |length: usize| take_field(&mut rest, length);

        let signature_message_fragment = take(FRAGMENT_LENGTH).to_string();
        let address = take(ADDRESS_LENGTH).to_string();
        let value = trytes_to_int(take(VALUE_LENGTH))?;
        let obsolete_tag = take(TAG_LENGTH).to_string();
        let timestamp = u64::try_from(trytes_to_int(take(INT_FIELD_LENGTH))?).ok()?;
        let current_index = u64::try_from(trytes_to_int(take(INT_FIELD_LENGTH))?).ok()?;
        let last_index = u64::try_from(trytes_to_int(take(INT_FIELD_LENGTH))?).ok()?;
        let bundle = take(HASH_LENGTH).to_string();
        let trunk_transaction = take(HASH_LENGTH).to_string();
        let branch_transaction = take(HASH_LENGTH).to_string();
        let tag = take(TAG_LENGTH).to_string();
        let attachment_timestamp = u64::try_from(trytes_to_int(take(INT_FIELD_LENGTH))?).ok()?;
        take(INT_FIELD_LENGTH * 2);
        let nonce = take(NONCE_LENGTH).to_string();

        Some(Self {
            hash: hash.to_string(),
            signature_message_fragment,
            address,
            value,
            obsolete_tag,
            timestamp,
            current_index,
            last_index,
            bundle,
            trunk_transaction,
            branch_transaction,
            tag,
            attachment_timestamp,
            nonce,
        })
    }

    /// The fields covered by the bundle hash.
    fn essence(&self) -> String {
        format!(
            "{}{}{}{}{}{}",
            pad_trytes(&self.address, ADDRESS_LENGTH),
            int_to_trytes(self.value, VALUE_LENGTH),
            pad_trytes(&self.obsolete_tag, TAG_LENGTH),
            int_to_trytes(self.timestamp as i64, INT_FIELD_LENGTH),
            int_to_trytes(self.current_index as i64, INT_FIELD_LENGTH),
            int_to_trytes(self.last_index as i64, INT_FIELD_LENGTH),
        )
    }
}

fn take_field<'a>(rest: &mut &'a str, length: usize) -> &'a str {
    let (field, tail) = rest.split_at(length);
    *rest = tail;
    field
}

/// An ordered group of transactions forming one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    /// Transactions ordered by `current_index`.
    pub transactions: Vec<Transaction>,
}

impl Bundle {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bundle from transactions in any order.
    ///
    /// Transactions are sorted by index; duplicate indices (re-attachments)
    /// keep the first occurrence.
    pub fn from_transactions(mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by_key(|tx| tx.current_index);
        transactions.dedup_by_key(|tx| tx.current_index);
        Self { transactions }
    }

    /// Adds a zero-value transfer, splitting the message over as many
    /// transactions as it needs fragments.
    pub fn add_transfer(
        &mut self,
        address: &str,
        message: &str,
        tag: &str,
        timestamp: u64,
    ) -> Result<()> {
        if !is_address(address) {
            return Err(ChiotaError::InvalidAddress(address.to_string()));
        }
        if !crate::trytes::is_trytes(message) {
            return Err(ChiotaError::InvalidTrytes(
                "transfer message must be trytes".to_string(),
            ));
        }

        if message.is_empty() {
            self.transactions
                .push(Transaction::new(address, "", tag, timestamp));
            return Ok(());
        }

        for fragment in message.as_bytes().chunks(FRAGMENT_LENGTH) {
            let fragment = std::str::from_utf8(fragment)
                .map_err(|e| ChiotaError::InvalidTrytes(e.to_string()))?;
            self.transactions
                .push(Transaction::new(address, fragment, tag, timestamp));
        }
        Ok(())
    }

    /// Assigns indices and computes the bundle hash.
    ///
    /// The hash also covers the message fragments, so two transfers to the
    /// same address within one second still get distinct bundles.
    pub fn finalize(&mut self) -> Result<()> {
        if self.transactions.is_empty() {
            return Err(ChiotaError::InvalidTrytes(
                "cannot finalize an empty bundle".to_string(),
            ));
        }

        let last_index = (self.transactions.len() - 1) as u64;
        let mut hasher = Sha256::new();
        for (index, tx) in self.transactions.iter_mut().enumerate() {
            tx.current_index = index as u64;
            tx.last_index = last_index;
            hasher.update(tx.essence().as_bytes());
            hasher.update(tx.signature_message_fragment.as_bytes());
        }

        let bundle_hash = hash_to_trytes(&hasher.finalize(), HASH_LENGTH);
        for tx in &mut self.transactions {
            tx.bundle = bundle_hash.clone();
        }
        Ok(())
    }

    /// The bundle hash, once finalized.
    pub fn hash(&self) -> Option<&str> {
        self.transactions.first().map(|tx| tx.bundle.as_str())
    }

    /// Serializes every transaction, in bundle order.
    pub fn to_trytes(&self) -> Vec<String> {
        self.transactions.iter().map(Transaction::to_trytes).collect()
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the bundle has no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Produces signature fragments for bundle inputs.
///
/// Signing is delegated to an external signature generator; zero-value
/// messaging bundles carry no inputs.
pub trait BundleSigner: Send + Sync {
    /// Signs every input of the bundle in place.
    fn sign(&self, bundle: &mut Bundle) -> Result<()>;
}

/// Signer for bundles without inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroValueSigner;

impl BundleSigner for ZeroValueSigner {
    fn sign(&self, bundle: &mut Bundle) -> Result<()> {
        match bundle.transactions.iter().find(|tx| tx.value < 0) {
            Some(input) => Err(ChiotaError::SigningFailed(format!(
                "input at index {} needs a seed-backed signer",
                input.current_index
            ))),
            None => Ok(()),
        }
    }
}
