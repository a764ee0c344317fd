//! Contact repository.
//!
//! Local contact state (who was accepted or declined) lives in the
//! repository; contact information (public keys and request addresses) is
//! looked up on the ledger through the messenger.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::TransactionCache;
use crate::frame::PublicKeyPayload;
use crate::ledger::LedgerRepository;
use crate::messenger::Messenger;
use crate::models::ContactRecord;
use crate::parser::BundleParser;
use crate::types::{ChiotaError, Result};

/// Trait for storing contacts and resolving contact information.
#[async_trait::async_trait]
pub trait ContactRepository: Send + Sync {
    /// Store a contact decision for a user. Storing again overwrites it.
    async fn add_contact(
        &self,
        chat_address: &str,
        accepted: bool,
        public_key_address: &str,
    ) -> Result<()>;

    /// Load every contact stored for a user.
    async fn load_contacts(&self, public_key_address: &str) -> Result<Vec<ContactRecord>>;

    /// Resolve the single valid public key upload at an address.
    ///
    /// Fails with [`ChiotaError::NoContactInformation`] when there is none and
    /// with [`ChiotaError::AmbiguousContactInformation`] when there are
    /// several distinct ones.
    async fn load_contact_information_by_address(&self, address: &str)
        -> Result<PublicKeyPayload>;
}

/// Contact repository backed by in-memory records and ledger lookups.
pub struct TangleContactRepository<L, C>
where
    L: LedgerRepository,
    C: TransactionCache,
{
    messenger: Arc<Messenger<L, C>>,
    records: Arc<RwLock<Vec<ContactRecord>>>,
}

impl<L, C> TangleContactRepository<L, C>
where
    L: LedgerRepository,
    C: TransactionCache,
{
    /// Creates a repository reading contact information through `messenger`.
    pub fn new(messenger: Arc<Messenger<L, C>>) -> Self {
        Self {
            messenger,
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

/// Collects the distinct public key payloads found in raw payloads.
pub fn distinct_payloads<'a>(payloads: impl IntoIterator<Item = &'a str>) -> Vec<PublicKeyPayload> {
    let mut by_hash: HashMap<String, PublicKeyPayload> = HashMap::new();
    let mut order = Vec::new();
    for raw in payloads {
        if let Some(payload) = PublicKeyPayload::parse(raw) {
            if !by_hash.contains_key(payload.hash()) {
                order.push(payload.hash().to_string());
                by_hash.insert(payload.hash().to_string(), payload);
            }
        }
    }
    order
        .into_iter()
        .filter_map(|hash| by_hash.remove(&hash))
        .collect()
}

#[async_trait::async_trait]
impl<L, C> ContactRepository for TangleContactRepository<L, C>
where
    L: LedgerRepository,
    C: TransactionCache,
{
    async fn add_contact(
        &self,
        chat_address: &str,
        accepted: bool,
        public_key_address: &str,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| {
            r.chat_address == chat_address && r.public_key_address == public_key_address
        }) {
            Some(existing) => existing.accepted = accepted,
            None => records.push(ContactRecord {
                chat_address: chat_address.to_string(),
                accepted,
                public_key_address: public_key_address.to_string(),
            }),
        }
        Ok(())
    }

    async fn load_contacts(&self, public_key_address: &str) -> Result<Vec<ContactRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.public_key_address == public_key_address)
            .cloned()
            .collect())
    }

    async fn load_contact_information_by_address(
        &self,
        address: &str,
    ) -> Result<PublicKeyPayload> {
        let messages = self
            .messenger
            .get_messages_by_address(address, BundleParser::RequestContact)
            .await?;

        let mut payloads = distinct_payloads(messages.iter().map(|m| m.payload.as_str()));
        debug!(
            address = %address,
            uploads = messages.len(),
            distinct = payloads.len(),
            "resolved contact information"
        );

        match payloads.len() {
            0 => Err(ChiotaError::NoContactInformation(address.to_string())),
            1 => Ok(payloads.remove(0)),
            _ => Err(ChiotaError::AmbiguousContactInformation(address.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryTransactionCache;
    use crate::ledger::{InMemoryLedger, LedgerConfig};
    use crate::models::{Message, MessageType};
    use crate::trytes::encode_bytes_to_trytes;
    use crate::types::{ResponseCode, ADDRESS_LENGTH};

    fn repository(
        ledger: &InMemoryLedger,
    ) -> (
        Arc<Messenger<InMemoryLedger, InMemoryTransactionCache>>,
        TangleContactRepository<InMemoryLedger, InMemoryTransactionCache>,
    ) {
        let messenger = Arc::new(Messenger::new(
            ledger.clone(),
            InMemoryTransactionCache::new(),
            LedgerConfig::localnet(),
        ));
        (messenger.clone(), TangleContactRepository::new(messenger))
    }

    fn upload(key_byte: u8) -> PublicKeyPayload {
        PublicKeyPayload::new(encode_bytes_to_trytes(&[key_byte; 32]), "R".repeat(ADDRESS_LENGTH))
    }

    #[tokio::test]
    async fn test_add_and_load_contacts() {
        let ledger = InMemoryLedger::new();
        let (_, repository) = repository(&ledger);

        repository.add_contact("CHATA", true, "KEVIN").await.unwrap();
        repository.add_contact("CHATB", false, "KEVIN").await.unwrap();
        repository.add_contact("CHATC", true, "CHANTAL").await.unwrap();

        let kevin = repository.load_contacts("KEVIN").await.unwrap();
        assert_eq!(kevin.len(), 2);
        assert!(kevin.iter().any(|r| r.chat_address == "CHATA" && r.accepted));
        assert!(kevin.iter().any(|r| r.chat_address == "CHATB" && !r.accepted));
    }

    #[tokio::test]
    async fn test_add_contact_overwrites_decision() {
        let ledger = InMemoryLedger::new();
        let (_, repository) = repository(&ledger);
        repository.add_contact("CHATA", false, "KEVIN").await.unwrap();
        repository.add_contact("CHATA", true, "KEVIN").await.unwrap();

        let kevin = repository.load_contacts("KEVIN").await.unwrap();
        assert_eq!(kevin.len(), 1);
        assert!(kevin[0].accepted);
    }

    #[tokio::test]
    async fn test_contact_information_states() {
        let ledger = InMemoryLedger::new();
        let (messenger, repository) = repository(&ledger);
        let address = "P".repeat(ADDRESS_LENGTH);

        let err = repository
            .load_contact_information_by_address(&address)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ResponseCode::NoContactInformationPresent);

        let first = upload(1);
        messenger
            .send_message(&Message::new(MessageType::CreateUser, first.payload(), &address))
            .await
            .unwrap();
        // a duplicate upload is not ambiguous
        messenger
            .send_message(&Message::new(MessageType::CreateUser, first.payload(), &address))
            .await
            .unwrap();
        let found = repository
            .load_contact_information_by_address(&address)
            .await
            .unwrap();
        assert_eq!(found.hash(), first.hash());

        messenger
            .send_message(&Message::new(MessageType::CreateUser, upload(2).payload(), &address))
            .await
            .unwrap();
        let err = repository
            .load_contact_information_by_address(&address)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ResponseCode::AmbiguousContactInformation);
    }

    #[tokio::test]
    async fn test_garbage_is_not_contact_information() {
        let ledger = InMemoryLedger::new();
        let (messenger, repository) = repository(&ledger);
        let address = "G".repeat(ADDRESS_LENGTH);
        messenger
            .send_message(&Message::new(
                MessageType::CreateUser,
                format!("SPAM{}", crate::types::END),
                &address,
            ))
            .await
            .unwrap();

        let err = repository
            .load_contact_information_by_address(&address)
            .await
            .unwrap_err();
        assert!(matches!(err, ChiotaError::NoContactInformation(_)));
    }

    #[tokio::test]
    async fn test_ledger_failure_surfaces_as_messenger_error() {
        let ledger = InMemoryLedger::new();
        let (_, repository) = repository(&ledger);
        ledger.set_offline(true);
        let err = repository
            .load_contact_information_by_address(&"P".repeat(ADDRESS_LENGTH))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ResponseCode::MessengerException);
    }

    #[test]
    fn test_distinct_payloads_keeps_first_seen_order() {
        let a = upload(1).payload();
        let b = upload(2).payload();
        let payloads = distinct_payloads([a.as_str(), "JUNK", b.as_str(), a.as_str()]);
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0], upload(1));
    }
}
