//! Bundle parsers.
//!
//! Each parser turns a bundle fetched from the ledger into messages. Ledger
//! data is public and frequently malformed, so parsers never fail: they
//! return fewer (or no) messages instead.

use crate::models::{Message, MessageType};
use crate::transaction::Bundle;
use crate::types::END;

/// Strategy for extracting messages from a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleParser {
    /// The whole bundle is one message.
    ChatMessage,
    /// Every transaction holds its own `END`-terminated record.
    GetContact,
    /// The non-input transactions hold one `END`-terminated message.
    RequestContact,
}

impl BundleParser {
    /// Extracts the messages carried by a bundle.
    pub fn parse(&self, bundle: &Bundle) -> Vec<Message> {
        let Some(address) = bundle.transactions.first().map(|tx| tx.address.clone()) else {
            return Vec::new();
        };

        match self {
            BundleParser::ChatMessage => {
                let payload: String = bundle
                    .transactions
                    .iter()
                    .map(|tx| tx.signature_message_fragment.as_str())
                    .collect();
                vec![Message::new(MessageType::Unknown, payload, address)]
            }
            BundleParser::GetContact => bundle
                .transactions
                .iter()
                .filter_map(|tx| {
                    let fragment = &tx.signature_message_fragment;
                    fragment
                        .find(END)
                        .map(|end| Message::new(MessageType::Unknown, &fragment[..end], &tx.address))
                })
                .collect(),
            BundleParser::RequestContact => {
                let payload: String = bundle
                    .transactions
                    .iter()
                    .filter(|tx| tx.value >= 0)
                    .map(|tx| tx.signature_message_fragment.as_str())
                    .collect();
                match payload.find(END) {
                    Some(end) => vec![Message::new(
                        MessageType::Unknown,
                        &payload[..end],
                        address,
                    )],
                    None => Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use crate::types::{ADDRESS_LENGTH, FRAGMENT_LENGTH, TAG};

    fn bundle_of(fragments: &[&str]) -> Bundle {
        let address = "A".repeat(ADDRESS_LENGTH);
        let transactions = fragments
            .iter()
            .enumerate()
            .map(|(i, fragment)| {
                let mut tx = Transaction::new(&address, fragment, TAG, 0);
                tx.current_index = i as u64;
                tx.last_index = (fragments.len() - 1) as u64;
                tx
            })
            .collect();
        Bundle::from_transactions(transactions)
    }

    #[test]
    fn test_empty_bundle_yields_nothing() {
        for parser in [
            BundleParser::ChatMessage,
            BundleParser::GetContact,
            BundleParser::RequestContact,
        ] {
            assert!(parser.parse(&Bundle::new()).is_empty());
        }
    }

    #[test]
    fn test_chat_message_concatenates_in_order() {
        let bundle = bundle_of(&["FIRST", "SECOND"]);
        let messages = BundleParser::ChatMessage.parse(&bundle);
        assert_eq!(messages.len(), 1);
        let payload = &messages[0].payload;
        assert_eq!(payload.len(), FRAGMENT_LENGTH * 2);
        assert!(payload.starts_with("FIRST9"));
        assert_eq!(&payload[FRAGMENT_LENGTH..FRAGMENT_LENGTH + 6], "SECOND");
    }

    #[test]
    fn test_get_contact_yields_one_message_per_record() {
        let first = format!("ALPHA{END}");
        let second = format!("BETA{END}");
        let bundle = bundle_of(&[&first, "NOTERMINATOR", &second]);
        let messages = BundleParser::GetContact.parse(&bundle);
        let payloads: Vec<_> = messages.iter().map(|m| m.payload.as_str()).collect();
        assert_eq!(payloads, vec!["ALPHA", "BETA"]);
    }

    #[test]
    fn test_request_contact_truncates_at_end() {
        let long = "K".repeat(FRAGMENT_LENGTH);
        let tail = format!("EY{END}GARBAGE");
        let bundle = bundle_of(&[&long, &tail]);
        let messages = BundleParser::RequestContact.parse(&bundle);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload, format!("{long}EY"));
    }

    #[test]
    fn test_request_contact_without_end_is_skipped() {
        let bundle = bundle_of(&["INCOMPLETE"]);
        assert!(BundleParser::RequestContact.parse(&bundle).is_empty());
    }

    #[test]
    fn test_request_contact_ignores_inputs() {
        let mut bundle = bundle_of(&["INPUTSIGNATURE", &format!("KEY{END}")]);
        bundle.transactions[0].value = -10;
        let messages = BundleParser::RequestContact.parse(&bundle);
        assert_eq!(messages[0].payload, "KEY");
    }
}
