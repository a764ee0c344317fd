//! Chat key resolution shared by SendMessage and GetMessages.

use tracing::debug;

use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::keys::KeyPair;
use crate::ledger::LedgerRepository;
use crate::parser::BundleParser;
use crate::repository::ContactRepository;
use crate::types::{ChiotaError, Result};

impl<L, C, R, E> Chiota<L, C, R, E>
where
    L: LedgerRepository,
    C: TransactionCache,
    R: ContactRepository,
    E: EncryptionProvider,
{
    /// Resolves the key pair shared by both sides of a chat.
    ///
    /// The first key exchange record at the chat key address that the user
    /// can decrypt holds the chat password; the key pair is derived from the
    /// password and the chat key address.
    pub(crate) async fn chat_key_pair(
        &self,
        chat_key_address: &str,
        user_key_pair: &KeyPair,
    ) -> Result<KeyPair> {
        let records = self
            .messenger
            .get_messages_by_address(chat_key_address, BundleParser::GetContact)
            .await?;

        for record in &records {
            let password = match self
                .open(user_key_pair, &record.payload)
                .and_then(|bytes| {
                    String::from_utf8(bytes)
                        .map_err(|e| ChiotaError::DecryptionError(e.to_string()))
                }) {
                Ok(password) => password,
                Err(_) => continue,
            };
            debug!(chat_key_address = %chat_key_address, "resolved chat key");
            return self.encryption.create_key_pair(&password, chat_key_address);
        }

        Err(ChiotaError::NoContactInformation(chat_key_address.to_string()))
    }
}
