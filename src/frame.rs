//! Payload framing for Chiota messages.
//!
//! Three payload shapes travel over the ledger:
//!
//! - the public key upload: `public key ‖ LINE_BREAK ‖ request address ‖ END`
//! - the chat message part: `ciphertext ‖ FIRST_BREAK ‖ signature ‖
//!   SECOND_BREAK ‖ timestamp ‖ A|B ‖ END`
//! - the key exchange: one `END`-terminated record per fragment
//!
//! Decoding never fails loudly. Ledger data is public and anyone can write to
//! an address, so malformed payloads simply decode to `None`.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::trytes::{decode_trytes_to_bytes, encode_bytes_to_trytes, is_address, is_trytes, pad_trytes};
use crate::types::{
    ChiotaError, Result, ADDRESS_LENGTH, END, FIRST_BREAK, FRAGMENT_LENGTH, LINE_BREAK,
    SECOND_BREAK, SIGNATURE_LENGTH,
};

/// Part flag of the first half of a chat message.
pub const FIRST_PART_FLAG: char = 'A';

/// Part flag of the second half of a chat message.
pub const SECOND_PART_FLAG: char = 'B';

/// A user's public key upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyPayload {
    public_key_trytes: String,
    request_address: String,
    hash: String,
}

impl PublicKeyPayload {
    /// Creates a payload and computes its content hash.
    pub fn new(public_key_trytes: impl Into<String>, request_address: impl Into<String>) -> Self {
        let public_key_trytes = public_key_trytes.into();
        let request_address = request_address.into();
        let body = format!("{public_key_trytes}{LINE_BREAK}{request_address}");
        let hash = hex::encode(Sha256::digest(body.as_bytes()));
        Self {
            public_key_trytes,
            request_address,
            hash,
        }
    }

    /// Parses a payload with or without its `END` terminator.
    ///
    /// Returns `None` unless the key is a non-empty byte encoding and the
    /// request address is a valid address.
    pub fn parse(payload: &str) -> Option<Self> {
        let body = match payload.find(END) {
            Some(end) => &payload[..end],
            None => payload,
        };
        let (public_key_trytes, request_address) = body.split_once(LINE_BREAK)?;

        if public_key_trytes.is_empty()
            || !is_trytes(public_key_trytes)
            || decode_trytes_to_bytes(public_key_trytes).is_none()
        {
            return None;
        }
        if request_address.len() != ADDRESS_LENGTH || !is_address(request_address) {
            return None;
        }

        Some(Self::new(public_key_trytes, request_address))
    }

    /// Wire form, terminated with `END`.
    pub fn payload(&self) -> String {
        format!(
            "{}{LINE_BREAK}{}{END}",
            self.public_key_trytes, self.request_address
        )
    }

    /// SHA-256 of the key and request address, as hex.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The public key, as trytes.
    pub fn public_key_trytes(&self) -> &str {
        &self.public_key_trytes
    }

    /// The public key bytes.
    pub fn public_key(&self) -> Result<Vec<u8>> {
        decode_trytes_to_bytes(&self.public_key_trytes)
            .ok_or_else(|| ChiotaError::InvalidPublicKey(self.public_key_trytes.clone()))
    }

    /// Address at which the user accepts contact requests.
    pub fn request_address(&self) -> &str {
        &self.request_address
    }
}

/// One half of an encrypted chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatFrame {
    /// Ciphertext trytes carried by this half.
    pub ciphertext: String,
    /// First thirty trytes of the sender public key.
    pub signature: String,
    /// When the message was written.
    pub timestamp: DateTime<Utc>,
    /// Whether this is the first half.
    pub is_first_part: bool,
}

impl ChatFrame {
    /// Builds a frame, deriving the signature from the sender public key.
    pub fn new(
        ciphertext: impl Into<String>,
        sender_public_key_trytes: &str,
        timestamp: DateTime<Utc>,
        is_first_part: bool,
    ) -> Self {
        let signature = sender_public_key_trytes
            .get(..SIGNATURE_LENGTH)
            .unwrap_or(sender_public_key_trytes)
            .to_string();
        Self {
            ciphertext: ciphertext.into(),
            signature,
            timestamp,
            is_first_part,
        }
    }

    /// Wire form, terminated with `END`.
    pub fn encode(&self) -> String {
        let date = self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let flag = if self.is_first_part {
            FIRST_PART_FLAG
        } else {
            SECOND_PART_FLAG
        };
        format!(
            "{}{FIRST_BREAK}{}{SECOND_BREAK}{}{flag}{END}",
            self.ciphertext,
            self.signature,
            encode_bytes_to_trytes(date.as_bytes())
        )
    }

    /// Decodes a frame from a chat payload (trailing padding is ignored).
    pub fn decode(payload: &str) -> Option<Self> {
        let body = &payload[..payload.find(END)?];

        let first = body.find(FIRST_BREAK)?;
        let ciphertext = &body[..first];
        let rest = &body[first + FIRST_BREAK.len()..];

        let second = rest.find(SECOND_BREAK)?;
        let signature = &rest[..second];
        let tail = &rest[second + SECOND_BREAK.len()..];

        // the symbol before END is the part flag
        let flag = tail.chars().last()?;
        let is_first_part = match flag {
            FIRST_PART_FLAG => true,
            SECOND_PART_FLAG => false,
            _ => return None,
        };
        let date_trytes = &tail[..tail.len() - 1];
        let date = String::from_utf8(decode_trytes_to_bytes(date_trytes)?).ok()?;
        let timestamp = DateTime::parse_from_rfc3339(&date).ok()?.with_timezone(&Utc);

        Some(Self {
            ciphertext: ciphertext.to_string(),
            signature: signature.to_string(),
            timestamp,
            is_first_part,
        })
    }
}

/// Frames key exchange records so each one fills its own fragment.
///
/// Fails when a record does not fit in one fragment with its terminator.
pub fn encode_key_exchange_records(records: &[String]) -> Result<String> {
    let mut payload = String::with_capacity(records.len() * FRAGMENT_LENGTH);
    for record in records {
        if !is_trytes(record) || record.len() + END.len() > FRAGMENT_LENGTH {
            return Err(ChiotaError::InvalidTrytes(format!(
                "key exchange record of {} trytes does not fit a fragment",
                record.len()
            )));
        }
        payload.push_str(&pad_trytes(&format!("{record}{END}"), FRAGMENT_LENGTH));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request_address() -> String {
        "R".repeat(ADDRESS_LENGTH)
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 5, 4, 12, 30, 15).unwrap()
    }

    #[test]
    fn test_public_key_payload_roundtrip() {
        let key = encode_bytes_to_trytes(&[42u8; 32]);
        let payload = PublicKeyPayload::new(&key, request_address());
        let wire = payload.payload();
        assert!(wire.ends_with(END));

        let parsed = PublicKeyPayload::parse(&wire).unwrap();
        assert_eq!(parsed, payload);
        assert_eq!(parsed.hash(), payload.hash());
        assert_eq!(parsed.public_key().unwrap(), vec![42u8; 32]);
    }

    #[test]
    fn test_public_key_payload_hash_differs_by_key() {
        let a = PublicKeyPayload::new(encode_bytes_to_trytes(&[1u8; 32]), request_address());
        let b = PublicKeyPayload::new(encode_bytes_to_trytes(&[2u8; 32]), request_address());
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn test_public_key_payload_rejects_garbage() {
        assert!(PublicKeyPayload::parse("").is_none());
        assert!(PublicKeyPayload::parse("NOBREAKHERE").is_none());
        let short_address = format!("AB{LINE_BREAK}SHORT");
        assert!(PublicKeyPayload::parse(&short_address).is_none());
        let empty_key = format!("{LINE_BREAK}{}", request_address());
        assert!(PublicKeyPayload::parse(&empty_key).is_none());
        let odd_key = format!("ABC{LINE_BREAK}{}", request_address());
        assert!(PublicKeyPayload::parse(&odd_key).is_none());
    }

    #[test]
    fn test_chat_frame_roundtrip_with_padding() {
        let sender = encode_bytes_to_trytes(&[200u8; 32]);
        let frame = ChatFrame::new("CIPHERTEXT", &sender, timestamp(), true);
        assert_eq!(frame.signature.len(), SIGNATURE_LENGTH);

        let padded = pad_trytes(&frame.encode(), FRAGMENT_LENGTH);
        let decoded = ChatFrame::decode(&padded).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_chat_frame_second_part_may_be_empty() {
        let frame = ChatFrame::new("", &"S".repeat(64), timestamp(), false);
        let decoded = ChatFrame::decode(&frame.encode()).unwrap();
        assert!(decoded.ciphertext.is_empty());
        assert!(!decoded.is_first_part);
    }

    #[test]
    fn test_chat_frame_keeps_milliseconds() {
        let at = Utc.timestamp_millis_opt(1_525_437_015_123).unwrap();
        let frame = ChatFrame::new("C", &"S".repeat(64), at, true);
        assert_eq!(ChatFrame::decode(&frame.encode()).unwrap().timestamp, at);
    }

    #[test]
    fn test_chat_frame_rejects_malformed() {
        assert!(ChatFrame::decode("").is_none());
        assert!(ChatFrame::decode("NOMARKERS").is_none());

        let frame = ChatFrame::new("C", &"S".repeat(64), timestamp(), true).encode();
        let bad_flag = frame.replacen(&format!("A{END}"), &format!("Q{END}"), 1);
        assert!(ChatFrame::decode(&bad_flag).is_none());

        let no_end = frame.replace(END, "");
        assert!(ChatFrame::decode(&no_end).is_none());
    }

    #[test]
    fn test_key_exchange_records_fill_fragments() {
        let records = vec!["ALPHA".to_string(), "BETA".to_string()];
        let payload = encode_key_exchange_records(&records).unwrap();
        assert_eq!(payload.len(), FRAGMENT_LENGTH * 2);
        assert!(payload.starts_with(&format!("ALPHA{END}")));
        assert!(payload[FRAGMENT_LENGTH..].starts_with(&format!("BETA{END}")));
    }

    #[test]
    fn test_key_exchange_record_too_long() {
        let records = vec!["K".repeat(FRAGMENT_LENGTH)];
        assert!(encode_key_exchange_records(&records).is_err());
    }
}
