//! Use cases of the contact handshake and chat protocol.
//!
//! A user registers (CreateUser), keeps the registration valid (CheckUser),
//! requests a contact (AddContact), answers requests (AcceptContact,
//! DeclineContact), lists contacts (GetContacts) and chats (SendMessage,
//! GetMessages).
//!
//! Interactors never return errors. Every failure is reported through the
//! `code` of the response.

mod accept_contact;
mod add_contact;
mod chat_keys;
mod check_user;
mod create_user;
mod decline_contact;
mod get_contacts;
mod get_messages;
mod send_message;

pub use accept_contact::{AcceptContactRequest, AcceptContactResponse};
pub use add_contact::{AddContactRequest, AddContactResponse};
pub use check_user::{CheckUserRequest, CheckUserResponse};
pub use create_user::{CreateUserRequest, CreateUserResponse};
pub use decline_contact::{DeclineContactRequest, DeclineContactResponse};
pub use get_contacts::{GetContactsRequest, GetContactsResponse};
pub use get_messages::{GetMessagesRequest, GetMessagesResponse};
pub use send_message::{SendMessageRequest, SendMessageResponse};

use tracing::warn;

use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::frame::PublicKeyPayload;
use crate::keys::KeyPair;
use crate::ledger::LedgerRepository;
use crate::models::{Contact, Message, MessageType};
use crate::repository::ContactRepository;
use crate::trytes::{decode_trytes_to_bytes, encode_bytes_to_trytes};
use crate::types::{ChiotaError, ResponseCode, Result, END};

/// A response that can report a failure code.
pub(crate) trait Failure {
    fn failure(code: ResponseCode) -> Self;
}

/// Turns an interactor result into its response.
pub(crate) fn respond<T: Failure>(interactor: &str, result: Result<T>) -> T {
    match result {
        Ok(response) => response,
        Err(err) => {
            let code = err.code();
            warn!(interactor, code = %code, error = %err, "interactor failed");
            T::failure(code)
        }
    }
}

impl<L, C, R, E> Chiota<L, C, R, E>
where
    L: LedgerRepository,
    C: TransactionCache,
    R: ContactRepository,
    E: EncryptionProvider,
{
    /// Encrypts bytes for a public key and encodes the result as trytes.
    pub(crate) fn seal(&self, public_key: &[u8], plaintext: &[u8]) -> Result<String> {
        let ciphertext = self.encryption.encrypt(public_key, plaintext)?;
        Ok(encode_bytes_to_trytes(&ciphertext))
    }

    /// Decodes trytes and decrypts them with a key pair.
    pub(crate) fn open(&self, key_pair: &KeyPair, trytes: &str) -> Result<Vec<u8>> {
        let ciphertext = decode_trytes_to_bytes(trytes)
            .ok_or_else(|| ChiotaError::InvalidTrytes("ciphertext is not a byte encoding".into()))?;
        self.encryption.decrypt(key_pair, &ciphertext)
    }

    /// Uploads the user's public key and request address.
    pub(crate) async fn upload_public_key(
        &self,
        public_key_address: &str,
        request_address: &str,
        key_pair: &KeyPair,
    ) -> Result<PublicKeyPayload> {
        let payload = PublicKeyPayload::new(key_pair.public_key_trytes(), request_address);
        self.messenger
            .send_message(&Message::new(
                MessageType::CreateUser,
                payload.payload(),
                public_key_address,
            ))
            .await?;
        Ok(payload)
    }

    /// Sends a contact descriptor encrypted for a public key.
    pub(crate) async fn send_descriptor(
        &self,
        message_type: MessageType,
        descriptor: &Contact,
        public_key: &[u8],
        receiver_address: &str,
    ) -> Result<()> {
        let json = serde_json::to_vec(descriptor)?;
        let sealed = self.seal(public_key, &json)?;
        self.messenger
            .send_message(&Message::new(
                message_type,
                format!("{sealed}{END}"),
                receiver_address,
            ))
            .await?;
        Ok(())
    }
}
