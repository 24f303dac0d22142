use serde::{Deserialize, Serialize};

use agora_core::types::PollId;

/// Question shown above every rating poll.
pub const RATING_QUESTION: &str = "Rate this pitch:";

/// The fixed five-point scale. Option `i` (0-based) is rank `i + 1`.
pub const RATING_OPTIONS: [&str; 5] = [
    "⭐ 1",
    "⭐⭐ 2",
    "⭐⭐⭐ 3",
    "⭐⭐⭐⭐ 4",
    "⭐⭐⭐⭐⭐ 5",
];

/// A message to be delivered to a chat, optionally inside a forum topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Target chat. Positive ids are users (direct messages).
    pub chat_id: i64,

    /// Forum topic inside the chat, if any.
    pub thread_id: Option<i32>,

    /// Content to deliver.
    pub content: String,

    /// Formatting hint for the target platform.
    pub format: MessageFormat,
}

impl OutboundMessage {
    pub fn plain(chat_id: i64, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            thread_id: None,
            content: content.into(),
            format: MessageFormat::PlainText,
        }
    }

    pub fn html(chat_id: i64, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            thread_id: None,
            content: content.into(),
            format: MessageFormat::Html,
        }
    }

    pub fn in_thread(mut self, thread_id: Option<i32>) -> Self {
        self.thread_id = thread_id;
        self
    }
}

/// Formatting hint for outbound message content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    /// Raw text with no special markup.
    #[default]
    PlainText,

    /// HTML markup as understood by Telegram.
    Html,
}

/// Identifiers of a freshly posted poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPoll {
    pub poll_id: PollId,
    pub message_id: i32,
}
