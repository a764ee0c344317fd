//! CheckUser: keeps the public key upload valid after snapshots and collisions.

use tracing::{debug, info};

use super::{respond, Failure};
use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::frame::PublicKeyPayload;
use crate::keys::KeyPair;
use crate::ledger::LedgerRepository;
use crate::repository::ContactRepository;
use crate::trytes::{derive_request_address, increment_trytes, validate_seed};
use crate::types::{ChiotaError, ResponseCode, Result, REQUEST_ADDRESS_SUFFIX_LENGTH};

/// Verifies that a user's public key upload is still the only one at its
/// address.
#[derive(Debug, Clone)]
pub struct CheckUserRequest {
    /// Seed the candidate addresses are derived from.
    pub seed: String,
    /// Current public key address.
    pub public_key_address: String,
    pub request_address: String,
    pub key_pair: KeyPair,
}

/// On [`ResponseCode::NewPublicKeyAddress`] the caller must switch to the
/// returned addresses.
#[derive(Debug, Clone)]
pub struct CheckUserResponse {
    pub code: ResponseCode,
    pub public_key_address: String,
    pub request_address: String,
}

impl Failure for CheckUserResponse {
    fn failure(code: ResponseCode) -> Self {
        Self {
            code,
            public_key_address: String::new(),
            request_address: String::new(),
        }
    }
}

/// What an address holds relative to our own upload.
enum Slot {
    Empty,
    Ours,
    Taken,
}

/// The next candidate seed: the seed with its last twelve symbols incremented.
fn next_candidate_seed(seed: &str) -> String {
    let split = seed.len().saturating_sub(REQUEST_ADDRESS_SUFFIX_LENGTH);
    format!("{}{}", &seed[..split], increment_trytes(&seed[split..]))
}

impl<L, C, R, E> Chiota<L, C, R, E>
where
    L: LedgerRepository,
    C: TransactionCache,
    R: ContactRepository,
    E: EncryptionProvider,
{
    /// Checks the user's public key address and repairs it when needed.
    ///
    /// An address emptied by a snapshot gets the upload again. An address
    /// someone else has written to is abandoned for the first free
    /// candidate address, reported with [`ResponseCode::NewPublicKeyAddress`].
    pub async fn check_user(&self, request: CheckUserRequest) -> CheckUserResponse {
        respond("CheckUser", self.try_check_user(&request).await)
    }

    async fn slot(&self, address: &str, ours: &PublicKeyPayload) -> Result<Slot> {
        match self
            .repository
            .load_contact_information_by_address(address)
            .await
        {
            Ok(found) if found.hash() == ours.hash() => Ok(Slot::Ours),
            Ok(_) | Err(ChiotaError::AmbiguousContactInformation(_)) => Ok(Slot::Taken),
            Err(ChiotaError::NoContactInformation(_)) => Ok(Slot::Empty),
            Err(other) => Err(other),
        }
    }

    async fn try_check_user(&self, request: &CheckUserRequest) -> Result<CheckUserResponse> {
        let ours = PublicKeyPayload::new(
            request.key_pair.public_key_trytes(),
            &request.request_address,
        );

        match self.slot(&request.public_key_address, &ours).await? {
            Slot::Ours => {
                return Ok(CheckUserResponse {
                    code: ResponseCode::Success,
                    public_key_address: request.public_key_address.clone(),
                    request_address: request.request_address.clone(),
                })
            }
            Slot::Empty => {
                self.upload_public_key(
                    &request.public_key_address,
                    &request.request_address,
                    &request.key_pair,
                )
                .await?;
                info!(public_key_address = %request.public_key_address, "public key uploaded again");
                return Ok(CheckUserResponse {
                    code: ResponseCode::Success,
                    public_key_address: request.public_key_address.clone(),
                    request_address: request.request_address.clone(),
                });
            }
            Slot::Taken => {}
        }

        let mut seed = validate_seed(&request.seed)?.to_string();
        for attempt in 0..self.config.max_public_key_address_attempts {
            let candidate = next_candidate_seed(&seed);
            if candidate == seed {
                break;
            }
            seed = candidate;

            let public_key_address =
                self.address_generator
                    .generate_address(&seed, 0, self.config.security_level)?;
            let request_address = derive_request_address(&public_key_address)?;
            let payload =
                PublicKeyPayload::new(request.key_pair.public_key_trytes(), &request_address);

            match self.slot(&public_key_address, &payload).await? {
                Slot::Taken => {
                    debug!(attempt, address = %public_key_address, "candidate address taken");
                    continue;
                }
                Slot::Empty => {
                    self.upload_public_key(&public_key_address, &request_address, &request.key_pair)
                        .await?;
                }
                Slot::Ours => {}
            }

            info!(
                old = %request.public_key_address,
                new = %public_key_address,
                "moved to a new public key address"
            );
            return Ok(CheckUserResponse {
                code: ResponseCode::NewPublicKeyAddress,
                public_key_address,
                request_address,
            });
        }

        Err(ChiotaError::AmbiguousContactInformation(
            request.public_key_address.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_candidate_seed_changes_the_suffix_only() {
        let seed = format!("{}{}", "S".repeat(69), "9".repeat(12));
        let next = next_candidate_seed(&seed);
        assert_eq!(&next[..69], &seed[..69]);
        assert_eq!(&next[69..], "A99999999999");
    }

    #[test]
    fn test_next_candidate_seed_short_seed() {
        assert_eq!(next_candidate_seed("AB"), "BB");
    }

    #[test]
    fn test_next_candidate_seed_exhausted() {
        let seed = "Z".repeat(12);
        assert_eq!(next_candidate_seed(&seed), seed);
    }
}
