//! Chiota - Encrypted chat over the IOTA Tangle
//!
//! Store-and-forward messaging on an append-only ledger: tryte codecs,
//! bundle assembly and parsing, a caching messenger, and the contact
//! handshake and chat use cases.

mod types;
mod trytes;
mod transaction;
mod ledger;
mod cache;
mod models;
mod parser;
mod messenger;
mod keys;
mod crypto;
mod frame;
mod repository;
mod client;
mod interactors;

pub use types::*;
pub use trytes::*;
pub use transaction::*;
pub use ledger::*;
pub use cache::*;
pub use models::*;
pub use parser::*;
pub use messenger::*;
pub use keys::*;
pub use crypto::*;
pub use frame::*;
pub use repository::*;
pub use client::*;
pub use interactors::*;
