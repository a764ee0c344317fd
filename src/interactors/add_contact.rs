//! AddContact: sends an encrypted contact request.

use tracing::info;

use super::{respond, Failure};
use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::keys::KeyPair;
use crate::ledger::LedgerRepository;
use crate::models::{Contact, MessageType};
use crate::repository::ContactRepository;
use crate::trytes::random_address;
use crate::types::{ResponseCode, Result};

/// Sends a contact request to the owner of a public key address.
#[derive(Debug, Clone)]
pub struct AddContactRequest {
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
    /// Public key address of the user to add.
    pub contact_public_key_address: String,
}

#[derive(Debug, Clone)]
pub struct AddContactResponse {
    pub code: ResponseCode,
}

impl Failure for AddContactResponse {
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
    /// Requests a contact.
    ///
    /// Fresh chat and chat key addresses are chosen here and travel in the
    /// encrypted descriptor; the request is stored locally as accepted so the
    /// contact becomes approved once it answers.
    pub async fn add_contact(&self, request: AddContactRequest) -> AddContactResponse {
        respond("AddContact", self.try_add_contact(&request).await)
    }

    async fn try_add_contact(&self, request: &AddContactRequest) -> Result<AddContactResponse> {
        let target = self
            .repository
            .load_contact_information_by_address(&request.contact_public_key_address)
            .await?;

        let descriptor = Contact {
            name: request.name.clone(),
            image_hash: request.image_hash.clone(),
            chat_address: random_address(),
            chat_key_address: random_address(),
            public_key_address: request.user_public_key_address.clone(),
            contact_address: request.user_request_address.clone(),
            requested: true,
            rejected: false,
            public_key: Some(request.user_key_pair.public_key_trytes()),
        };

        self.send_descriptor(
            MessageType::RequestContact,
            &descriptor,
            &target.public_key()?,
            target.request_address(),
        )
        .await?;
        self.repository
            .add_contact(&descriptor.chat_address, true, &request.user_public_key_address)
            .await?;

        info!(
            contact = %request.contact_public_key_address,
            chat_address = %descriptor.chat_address,
            "contact requested"
        );
        Ok(AddContactResponse {
            code: ResponseCode::Success,
        })
    }
}
