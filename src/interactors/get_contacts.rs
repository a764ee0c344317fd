//! GetContacts: approved contacts and pending requests.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{respond, Failure};
use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::keys::KeyPair;
use crate::ledger::LedgerRepository;
use crate::models::{Contact, ContactRecord};
use crate::parser::BundleParser;
use crate::repository::ContactRepository;
use crate::types::{ResponseCode, Result};

/// Lists the user's approved contacts and open requests.
#[derive(Debug, Clone)]
pub struct GetContactsRequest {
    /// Address contact descriptors are sent to.
    pub request_address: String,
    pub public_key_address: String,
    /// Key pair that opens the descriptors.
    pub key_pair: KeyPair,
}

#[derive(Debug, Clone)]
pub struct GetContactsResponse {
    pub code: ResponseCode,
    /// Contacts the user accepted (or requested) that answered.
    pub approved_contacts: Vec<Contact>,
    /// Requests the user has neither accepted nor declined.
    pub pending_contact_requests: Vec<Contact>,
}

impl Failure for GetContactsResponse {
    fn failure(code: ResponseCode) -> Self {
        Self {
            code,
            approved_contacts: Vec::new(),
            pending_contact_requests: Vec::new(),
        }
    }
}

/// Splits received descriptors into approved contacts and pending requests.
///
/// Approved are the received contacts the user stored as accepted, with
/// `requested` cleared. Pending are the received contacts the user has not
/// stored at all. Declined ones are in neither list.
pub(crate) fn partition_contacts(
    requested: Vec<Contact>,
    stored: &[ContactRecord],
) -> (Vec<Contact>, Vec<Contact>) {
    let decisions: HashMap<&str, bool> = stored
        .iter()
        .map(|record| (record.chat_address.as_str(), record.accepted))
        .collect();

    let mut approved = Vec::new();
    let mut pending = Vec::new();
    for mut contact in requested {
        match decisions.get(contact.chat_address.as_str()) {
            Some(true) => {
                contact.requested = false;
                approved.push(contact);
            }
            Some(false) => {}
            None => pending.push(contact),
        }
    }
    (approved, pending)
}

impl<L, C, R, E> Chiota<L, C, R, E>
where
    L: LedgerRepository,
    C: TransactionCache,
    R: ContactRepository,
    E: EncryptionProvider,
{
    /// Reads every descriptor sent to the user's request address.
    ///
    /// Descriptors the user cannot decrypt are skipped; duplicates (by chat
    /// address) are collapsed.
    pub async fn get_contacts(&self, request: GetContactsRequest) -> GetContactsResponse {
        respond("GetContacts", self.try_get_contacts(&request).await)
    }

    async fn try_get_contacts(&self, request: &GetContactsRequest) -> Result<GetContactsResponse> {
        let messages = self
            .messenger
            .get_messages_by_address(&request.request_address, BundleParser::RequestContact)
            .await?;

        let mut requested: Vec<Contact> = Vec::new();
        for message in &messages {
            let contact = match self.open_descriptor(&request.key_pair, &message.payload) {
                Ok(contact) => contact,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable contact descriptor");
                    continue;
                }
            };
            if !requested.contains(&contact) {
                requested.push(contact);
            }
        }

        let stored = match self
            .repository
            .load_contacts(&request.public_key_address)
            .await
        {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "contact repository unavailable");
                return Ok(GetContactsResponse::failure(ResponseCode::ContactsUnavailable));
            }
        };

        let (approved_contacts, pending_contact_requests) = partition_contacts(requested, &stored);
        debug!(
            approved = approved_contacts.len(),
            pending = pending_contact_requests.len(),
            "loaded contacts"
        );
        Ok(GetContactsResponse {
            code: ResponseCode::Success,
            approved_contacts,
            pending_contact_requests,
        })
    }

    fn open_descriptor(&self, key_pair: &KeyPair, payload: &str) -> Result<Contact> {
        let json = self.open(key_pair, payload)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(chat_address: &str) -> Contact {
        Contact {
            name: chat_address.to_lowercase(),
            image_hash: String::new(),
            chat_address: chat_address.to_string(),
            chat_key_address: "KEY".to_string(),
            public_key_address: "PK".to_string(),
            contact_address: "REQ".to_string(),
            requested: true,
            rejected: false,
            public_key: None,
        }
    }

    fn record(chat_address: &str, accepted: bool) -> ContactRecord {
        ContactRecord {
            chat_address: chat_address.to_string(),
            accepted,
            public_key_address: "ME".to_string(),
        }
    }

    #[test]
    fn test_partition_approved_and_pending() {
        let (approved, pending) =
            partition_contacts(vec![contact("A"), contact("B")], &[record("A", true)]);

        assert_eq!(approved, vec![contact("A")]);
        assert!(!approved[0].requested);
        assert_eq!(pending, vec![contact("B")]);
        assert!(pending[0].requested);
    }

    #[test]
    fn test_partition_hides_declined() {
        let (approved, pending) =
            partition_contacts(vec![contact("A"), contact("B")], &[record("B", false)]);
        assert!(approved.is_empty());
        assert_eq!(pending, vec![contact("A")]);
    }

    #[test]
    fn test_partition_ignores_unanswered_requests() {
        let (approved, pending) = partition_contacts(Vec::new(), &[record("A", true)]);
        assert!(approved.is_empty());
        assert!(pending.is_empty());
    }
}
