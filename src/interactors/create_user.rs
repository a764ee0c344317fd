//! CreateUser: registers a seed and uploads its public key.

use tracing::info;

use super::{respond, Failure};
use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::keys::KeyPair;
use crate::ledger::LedgerRepository;
use crate::repository::ContactRepository;
use crate::trytes::{derive_request_address, validate_seed};
use crate::types::{ResponseCode, Result};

/// Registers a new user.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    /// An 81-tryte seed.
    pub seed: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserResponse {
    pub code: ResponseCode,
    pub public_key_address: String,
    pub request_address: String,
    /// The user's key pair; `None` on failure.
    pub key_pair: Option<KeyPair>,
}

impl Failure for CreateUserResponse {
    fn failure(code: ResponseCode) -> Self {
        Self {
            code,
            public_key_address: String::new(),
            request_address: String::new(),
            key_pair: None,
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
    /// Derives the user's addresses and key pair and publishes the public key.
    ///
    /// The public key address is the seed's first address; contact requests
    /// are received at the derived request address.
    pub async fn create_user(&self, request: CreateUserRequest) -> CreateUserResponse {
        respond("CreateUser", self.try_create_user(&request.seed).await)
    }

    async fn try_create_user(&self, seed: &str) -> Result<CreateUserResponse> {
        let seed = validate_seed(seed)?;
        let public_key_address =
            self.address_generator
                .generate_address(seed, 0, self.config.security_level)?;
        let request_address = derive_request_address(&public_key_address)?;
        let key_pair = self.encryption.create_key_pair(seed, &public_key_address)?;

        self.upload_public_key(&public_key_address, &request_address, &key_pair)
            .await?;
        info!(public_key_address = %public_key_address, "user registered");

        Ok(CreateUserResponse {
            code: ResponseCode::Success,
            public_key_address,
            request_address,
            key_pair: Some(key_pair),
        })
    }
}
