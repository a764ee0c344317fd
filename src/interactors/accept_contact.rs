//! AcceptContact: answers a request and publishes the chat key.

use tracing::info;

use super::{respond, Failure};
use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::frame::encode_key_exchange_records;
use crate::keys::KeyPair;
use crate::ledger::LedgerRepository;
use crate::models::{Contact, Message, MessageType};
use crate::repository::ContactRepository;
use crate::trytes::generate_seed;
use crate::types::{ResponseCode, Result};

/// Accepts a pending contact request.
#[derive(Debug, Clone)]
pub struct AcceptContactRequest {
    /// Name shown to the contact.
    pub name: String,
    /// Hash of the user's avatar image.
    pub image_hash: String,
    /// Address of the user's public key upload.
    pub user_public_key_address: String,
    /// Address the user receives contact requests at.
    pub user_request_address: String,
    /// The user's own key pair.
    pub user_key_pair: KeyPair,
    /// The pending request, as returned by GetContacts.
    pub contact: Contact,
}

#[derive(Debug, Clone)]
pub struct AcceptContactResponse {
    pub code: ResponseCode,
}

impl Failure for AcceptContactResponse {
    fn failure(code: ResponseCode) -> Self {
        Self { code }
    }
}

impl<L, C, R, E> Chiota<L, C, R, E>
where
    L: LedgerRepository,
    C: TransactionCache,
    R: ContactRepository,
    E: EncryptionProvider,
{
    /// Accepts a contact and opens the shared chat channel.
    ///
    /// A random chat password is published at the chat key address twice,
    /// once for the requester and once for the user, then the user's own
    /// descriptor is sent back to the requester's request address.
    pub async fn accept_contact(&self, request: AcceptContactRequest) -> AcceptContactResponse {
        respond("AcceptContact", self.try_accept_contact(&request).await)
    }

    async fn try_accept_contact(
        &self,
        request: &AcceptContactRequest,
    ) -> Result<AcceptContactResponse> {
        let contact = &request.contact;
        let requester = self
            .repository
            .load_contact_information_by_address(&contact.public_key_address)
            .await?;
        let requester_key = requester.public_key()?;

        let password = generate_seed();
        let records = vec![
            self.seal(&requester_key, password.as_bytes())?,
            self.seal(&request.user_key_pair.public_key, password.as_bytes())?,
        ];
        self.messenger
            .send_message(&Message::new(
                MessageType::KeyExchange,
                encode_key_exchange_records(&records)?,
                &contact.chat_key_address,
            ))
            .await?;

        let descriptor = Contact {
            name: request.name.clone(),
            image_hash: request.image_hash.clone(),
            chat_address: contact.chat_address.clone(),
            chat_key_address: contact.chat_key_address.clone(),
            public_key_address: request.user_public_key_address.clone(),
            contact_address: request.user_request_address.clone(),
            requested: true,
            rejected: false,
            public_key: Some(request.user_key_pair.public_key_trytes()),
        };
        self.send_descriptor(
            MessageType::AcceptContact,
            &descriptor,
            &requester_key,
            &contact.contact_address,
        )
        .await?;

        self.repository
            .add_contact(&contact.chat_address, true, &request.user_public_key_address)
            .await?;

        info!(
            contact = %contact.public_key_address,
            chat_address = %contact.chat_address,
            "contact accepted"
        );
        Ok(AcceptContactResponse {
            code: ResponseCode::Success,
        })
    }
}
