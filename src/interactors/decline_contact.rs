//! DeclineContact.

use tracing::info;

use super::{respond, Failure};
use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::ledger::LedgerRepository;
use crate::models::Contact;
use crate::repository::ContactRepository;
use crate::types::{ResponseCode, Result};

/// Declines a pending contact request.
#[derive(Debug, Clone)]
pub struct DeclineContactRequest {
    /// Address of the user's public key upload.
    pub user_public_key_address: String,
    /// The pending request to decline.
    pub contact: Contact,
}

#[derive(Debug, Clone)]
pub struct DeclineContactResponse {
    pub code: ResponseCode,
}

impl Failure for DeclineContactResponse {
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
    /// Declines a contact. Nothing is sent; the request just stops being
    /// pending.
    pub async fn decline_contact(&self, request: DeclineContactRequest) -> DeclineContactResponse {
        respond("DeclineContact", self.try_decline_contact(&request).await)
    }

    async fn try_decline_contact(
        &self,
        request: &DeclineContactRequest,
    ) -> Result<DeclineContactResponse> {
        self.repository
            .add_contact(
                &request.contact.chat_address,
                false,
                &request.user_public_key_address,
            )
            .await?;
        info!(chat_address = %request.contact.chat_address, "contact declined");
        Ok(DeclineContactResponse {
            code: ResponseCode::Success,
        })
    }
}
