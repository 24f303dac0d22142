use async_trait::async_trait;

use crate::{
    error::ChannelError,
    types::{OpenedPoll, OutboundMessage},
};

/// Everything the core needs from the chat platform.
///
/// Implementations must be `Send + Sync` so a single adapter can be shared
/// between the message-handling path and fired scheduler jobs.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Deliver a single outbound message.
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;

    /// Post the fixed five-option rating poll (non-anonymous, single answer).
    async fn send_rating_poll(
        &self,
        chat_id: i64,
        thread_id: Option<i32>,
    ) -> Result<OpenedPoll, ChannelError>;

    /// Close a poll and return the final voter count of each option, in
    /// option order.
    async fn stop_poll(&self, chat_id: i64, message_id: i32) -> Result<Vec<u32>, ChannelError>;

    /// Ask the platform who we are. Used as a liveness check; returns the
    /// bot's username.
    async fn identity(&self) -> Result<String, ChannelError>;

    /// Send a plain-text direct message to a user.
    async fn send_direct(&self, user_id: i64, text: &str) -> Result<(), ChannelError> {
        self.send(&OutboundMessage::plain(user_id, text)).await
    }
}
