//! Type definitions and protocol constants for Chiota.

use std::fmt;

use thiserror::Error;

/// Tag attached to every transaction sent by the messenger.
pub const TAG: &str = "CHIOTAYOURIOTACHATAPP";

/// Separates the public key from the request address in a key upload.
pub const LINE_BREAK: &str = "9CHIOTAYOURIOTACHATAPP9";

/// Separates the ciphertext part from the sender signature in a chat frame.
pub const FIRST_BREAK: &str = "9CHIOTAYOUR9";

/// Separates the sender signature from the timestamp in a chat frame.
pub const SECOND_BREAK: &str = "9IOTACHATAPP9";

/// Terminates every framed payload.
pub const END: &str = "9ENDEGUTALLESGUT9";

/// Maximum number of characters in a chat message.
pub const MESSAGE_CHARACTER_LIMIT: usize = 247;

/// Number of ciphertext trytes carried by the first part of a chat message.
pub const CHAT_MESSAGE_PART_SIZE: usize = 2070;

/// Number of trytes in a signature/message fragment of one transaction.
pub const FRAGMENT_LENGTH: usize = 2187;

/// Number of trytes in an address (without checksum).
pub const ADDRESS_LENGTH: usize = 81;

/// Number of trytes in an address with checksum.
pub const ADDRESS_WITH_CHECKSUM_LENGTH: usize = 90;

/// Number of trytes in a seed.
pub const SEED_LENGTH: usize = 81;

/// Number of trailing address trytes incremented to derive the request address.
pub const REQUEST_ADDRESS_SUFFIX_LENGTH: usize = 12;

/// Number of sender public key trytes used as a chat signature.
pub const SIGNATURE_LENGTH: usize = 30;

/// Key derivation info for contact key pairs.
pub const KEY_DERIVATION_INFO: &[u8] = b"chiota-x25519-key";

/// Encryption info prefix for sealed blocks.
pub const ENCRYPTION_INFO_PREFIX: &[u8] = b"ChiotaV1";

/// Outcome of an interactor call.
///
/// Callers branch on this code instead of on error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Success,
    MessengerException,
    UnknownException,
    MessageTooLong,
    NoContactInformationPresent,
    AmbiguousContactInformation,
    NewPublicKeyAddress,
    ContactsUnavailable,
    InvalidRequest,
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors that can occur during Chiota operations.
#[derive(Error, Debug)]
pub enum ChiotaError {
    // Messenger Errors
    /// The message type is not one the protocol knows.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// A ledger or transport failure surfaced through the messenger.
    #[error("Messenger failed ({code}): {source}")]
    Messenger {
        code: ResponseCode,
        #[source]
        source: Box<ChiotaError>,
    },

    /// The ledger node rejected or failed a request.
    #[error("Ledger request failed: {0}")]
    Ledger(String),

    // Codec Errors
    /// Input is not a valid tryte string.
    #[error("Invalid trytes: {0}")]
    InvalidTrytes(String),

    /// Input is not a valid address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Input is not a valid seed.
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// Address security level outside 1..=3.
    #[error("Invalid security level: {0}")]
    InvalidSecurityLevel(u8),

    // Encryption Errors
    /// Invalid public key format.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    /// Decryption failed.
    #[error("Decryption failed: {0}")]
    DecryptionError(String),

    /// Could not derive a key pair.
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// The bundle could not be signed.
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Contact descriptor (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // Contact Errors
    /// No valid public key upload exists at the address.
    #[error("No contact information at address: {0}")]
    NoContactInformation(String),

    /// Several conflicting public key uploads exist at the address.
    #[error("Ambiguous contact information at address: {0}")]
    AmbiguousContactInformation(String),

    /// Chat message exceeds the character limit.
    #[error("Message too long: {0} characters")]
    MessageTooLong(usize),

    // Storage Errors
    /// Storage operation failed.
    #[error("Storage failed: {0}")]
    StorageFailed(String),
}

impl ChiotaError {
    /// Wraps an error as a messenger failure.
    pub fn messenger(source: ChiotaError) -> Self {
        match source {
            wrapped @ ChiotaError::Messenger { .. } => wrapped,
            other => ChiotaError::Messenger {
                code: ResponseCode::MessengerException,
                source: Box::new(other),
            },
        }
    }

    /// The response code an interactor reports for this error.
    pub fn code(&self) -> ResponseCode {
        match self {
            ChiotaError::Messenger { code, .. } => *code,
            ChiotaError::NoContactInformation(_) => ResponseCode::NoContactInformationPresent,
            ChiotaError::AmbiguousContactInformation(_) => {
                ResponseCode::AmbiguousContactInformation
            }
            ChiotaError::MessageTooLong(_) => ResponseCode::MessageTooLong,
            ChiotaError::InvalidAddress(_)
            | ChiotaError::InvalidSeed(_)
            | ChiotaError::InvalidSecurityLevel(_) => ResponseCode::InvalidRequest,
            _ => ResponseCode::UnknownException,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChiotaError>;
