//! GetMessages: reads and reassembles a chat.

use tracing::debug;

use super::{respond, Failure};
use crate::cache::TransactionCache;
use crate::client::Chiota;
use crate::crypto::EncryptionProvider;
use crate::frame::ChatFrame;
use crate::keys::KeyPair;
use crate::ledger::LedgerRepository;
use crate::models::ChatMessage;
use crate::parser::BundleParser;
use crate::repository::ContactRepository;
use crate::types::{ResponseCode, Result};

/// Reads the messages of a chat.
#[derive(Debug, Clone)]
pub struct GetMessagesRequest {
    /// Address of the chat channel.
    pub chat_address: String,
    /// Address holding the chat key exchange.
    pub chat_key_address: String,
    /// The user's own key pair.
    pub user_key_pair: KeyPair,
}

#[derive(Debug, Clone)]
pub struct GetMessagesResponse {
    pub code: ResponseCode,
    /// Messages ordered by the time they were written.
    pub messages: Vec<ChatMessage>,
}

impl Failure for GetMessagesResponse {
    fn failure(code: ResponseCode) -> Self {
        Self {
            code,
            messages: Vec::new(),
        }
    }
}

/// Pairs message halves and decrypts each pair.
///
/// Frames are ordered by timestamp. Two neighbours with opposite part flags
/// form a message (first half, then second half). A neighbour with the same
/// flag means the current frame is still waiting for its partner, so it is
/// skipped. A pair that does not decrypt only skips its first frame, so a
/// stray part cannot swallow the message that follows it.
pub(crate) fn assemble_messages<F>(mut frames: Vec<ChatFrame>, mut decrypt: F) -> Vec<ChatMessage>
where
    F: FnMut(&str) -> Option<String>,
{
    frames.sort_by_key(|frame| frame.timestamp);

    let mut messages = Vec::new();
    let mut i = 0;
    while i + 1 < frames.len() {
        let (current, next) = (&frames[i], &frames[i + 1]);
        if current.is_first_part == next.is_first_part {
            i += 1;
            continue;
        }

        let (first, second) = if current.is_first_part {
            (current, next)
        } else {
            (next, current)
        };
        let ciphertext = format!("{}{}", first.ciphertext, second.ciphertext);
        if let Some(message) = decrypt(&ciphertext) {
            messages.push(ChatMessage {
                date: first.timestamp,
                message,
                signature: first.signature.clone(),
                is_first_part: current.is_first_part,
            });
            i += 2;
        } else {
            i += 1;
        }
    }
    messages
}

impl<L, C, R, E> Chiota<L, C, R, E>
where
    L: LedgerRepository,
    C: TransactionCache,
    R: ContactRepository,
    E: EncryptionProvider,
{
    /// Fetches, reassembles and decrypts every message of a chat.
    pub async fn get_messages(&self, request: GetMessagesRequest) -> GetMessagesResponse {
        respond("GetMessages", self.try_get_messages(&request).await)
    }

    async fn try_get_messages(&self, request: &GetMessagesRequest) -> Result<GetMessagesResponse> {
        let chat_key_pair = self
            .chat_key_pair(&request.chat_key_address, &request.user_key_pair)
            .await?;

        let payloads = self
            .messenger
            .get_messages_by_address(&request.chat_address, BundleParser::ChatMessage)
            .await?;
        let frames: Vec<ChatFrame> = payloads
            .iter()
            .filter_map(|message| ChatFrame::decode(&message.payload))
            .collect();
        let frame_count = frames.len();

        let messages = assemble_messages(frames, |ciphertext| {
            let bytes = self.open(&chat_key_pair, ciphertext).ok()?;
            String::from_utf8(bytes).ok()
        });

        debug!(
            chat_address = %request.chat_address,
            frames = frame_count,
            messages = messages.len(),
            "read chat"
        );
        Ok(GetMessagesResponse {
            code: ResponseCode::Success,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const SENDER: &str = "KEVINKEVINKEVINKEVINKEVINKEVINKEVIN";

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 5, 4, 12, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn identity(ciphertext: &str) -> Option<String> {
        Some(ciphertext.to_string())
    }

    #[test]
    fn test_two_parts_reassemble() {
        let frames = vec![
            ChatFrame::new("Hello, ", SENDER, at(0), true),
            ChatFrame::new("Kevin!", SENDER, at(0), false),
        ];
        let messages = assemble_messages(frames, identity);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "Hello, Kevin!");
        assert!(messages[0].is_first_part);
        assert!(messages[0].is_from(SENDER));
    }

    #[test]
    fn test_second_part_first_still_joins_in_order() {
        let frames = vec![
            ChatFrame::new("Kevin!", SENDER, at(0), false),
            ChatFrame::new("Hello, ", SENDER, at(0), true),
        ];
        let messages = assemble_messages(frames, identity);
        assert_eq!(messages[0].message, "Hello, Kevin!");
        assert!(!messages[0].is_first_part);
    }

    #[test]
    fn test_same_flag_neighbour_is_skipped() {
        let frames = vec![
            ChatFrame::new("OLD", SENDER, at(0), true),
            ChatFrame::new("NEW", SENDER, at(1), true),
            ChatFrame::new("PART", SENDER, at(1), false),
        ];
        let messages = assemble_messages(frames, identity);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "NEWPART");
    }

    #[test]
    fn test_undecryptable_pair_is_dropped() {
        let frames = vec![
            ChatFrame::new("BAD", SENDER, at(0), true),
            ChatFrame::new("", SENDER, at(0), false),
            ChatFrame::new("GOOD", SENDER, at(1), true),
            ChatFrame::new("", SENDER, at(1), false),
        ];
        let messages = assemble_messages(frames, |c| (c != "BAD").then(|| c.to_string()));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "GOOD");
    }

    #[test]
    fn test_stray_second_part_does_not_hide_next_message() {
        let frames = vec![
            ChatFrame::new("STRAY", SENDER, at(0), false),
            ChatFrame::new("HELLO", SENDER, at(1), true),
            ChatFrame::new("WORLD", SENDER, at(1), false),
        ];
        let messages = assemble_messages(frames, |c| (c == "HELLOWORLD").then(|| c.to_string()));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "HELLOWORLD");
        assert!(messages[0].is_first_part);
    }

    #[test]
    fn test_messages_are_ordered_by_time() {
        let frames = vec![
            ChatFrame::new("LATER", SENDER, at(10), true),
            ChatFrame::new("", SENDER, at(10), false),
            ChatFrame::new("EARLIER", SENDER, at(1), true),
            ChatFrame::new("", SENDER, at(1), false),
        ];
        let messages = assemble_messages(frames, identity);
        let texts: Vec<_> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["EARLIER", "LATER"]);
    }
}
