//! `agora-channels`: the message channel port.
//!
//! Schedulers, resolvers and reports talk to the chat platform only through
//! [`MessageChannel`]; the Telegram adapter provides the real implementation.

pub mod channel;
pub mod error;
pub mod format;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod types;

pub use channel::MessageChannel;
pub use error::ChannelError;
pub use types::{MessageFormat, OpenedPoll, OutboundMessage, RATING_OPTIONS, RATING_QUESTION};
