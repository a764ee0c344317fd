//! SendMessage: encrypts a chat message and sends it in two parts.

use chrono::Utc;
use tracing::debug;

use super::{respond, Failure};
use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::frame::ChatFrame;
use crate::keys::KeyPair;
use crate::ledger::LedgerRepository;
use crate::models::{Message, MessageType};
use crate::repository::ContactRepository;
use crate::types::{
    ChiotaError, ResponseCode, Result, CHAT_MESSAGE_PART_SIZE, MESSAGE_CHARACTER_LIMIT,
};

/// Sends a chat message to an accepted contact.
#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    /// Address of the chat channel.
    pub chat_address: String,
    /// Address holding the chat key exchange.
    pub chat_key_address: String,
    /// Text of at most 247 UTF-16 code units.
    pub message: String,
    /// The user's own key pair.
    pub user_key_pair: KeyPair,
}

#[derive(Debug, Clone)]
pub struct SendMessageResponse {
    pub code: ResponseCode,
}

impl Failure for SendMessageResponse {
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
    /// Encrypts a message with the chat key and sends it in two parts.
    ///
    /// Both parts carry the same timestamp so the reader can pair them again.
    /// The length limit counts UTF-16 code units, so a character outside the
    /// Basic Multilingual Plane counts twice.
    pub async fn send_message(&self, request: SendMessageRequest) -> SendMessageResponse {
        respond("SendMessage", self.try_send_message(&request).await)
    }

    async fn try_send_message(&self, request: &SendMessageRequest) -> Result<SendMessageResponse> {
        let length = request.message.encode_utf16().count();
        if length > MESSAGE_CHARACTER_LIMIT {
            return Err(ChiotaError::MessageTooLong(length));
        }

        let chat_key_pair = self
            .chat_key_pair(&request.chat_key_address, &request.user_key_pair)
            .await?;
        let ciphertext = self.seal(&chat_key_pair.public_key, request.message.as_bytes())?;
        let (first, second) = ciphertext.split_at(CHAT_MESSAGE_PART_SIZE.min(ciphertext.len()));

        let sender = request.user_key_pair.public_key_trytes();
        let now = Utc::now();
        for frame in [
            ChatFrame::new(first, &sender, now, true),
            ChatFrame::new(second, &sender, now, false),
        ] {
            self.messenger
                .send_message(&Message::new(
                    MessageType::ChatMessage,
                    frame.encode(),
                    &request.chat_address,
                ))
                .await?;
        }

        debug!(chat_address = %request.chat_address, "chat message sent");
        Ok(SendMessageResponse {
            code: ResponseCode::Success,
        })
    }
}
