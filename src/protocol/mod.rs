//! The wire grammar: length-prefixed words, grouped into sentences.

pub(crate) mod codec;
pub(crate) mod frame;
pub mod reply;

pub use codec::MAX_WORD_LEN;
pub use reply::{ParsedReply, Terminator};
