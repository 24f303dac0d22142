//! [`MessageChannel`] implementation backed by the Telegram Bot API.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, ThreadId};

use agora_channels::{
    ChannelError, MessageChannel, MessageFormat, OpenedPoll, OutboundMessage, RATING_OPTIONS,
    RATING_QUESTION,
};

use crate::error::to_channel_error;

/// Sends messages and rating polls through a shared teloxide [`Bot`].
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn thread(thread_id: i32) -> ThreadId {
    ThreadId(MessageId(thread_id))
}

#[async_trait]
impl MessageChannel for TelegramChannel {
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let mut req = self.bot.send_message(ChatId(msg.chat_id), &msg.content);
        if let Some(t) = msg.thread_id {
            req = req.message_thread_id(thread(t));
        }
        if msg.format == MessageFormat::Html {
            req = req.parse_mode(ParseMode::Html);
        }
        req.await.map_err(to_channel_error)?;
        Ok(())
    }

    async fn send_rating_poll(
        &self,
        chat_id: i64,
        thread_id: Option<i32>,
    ) -> Result<OpenedPoll, ChannelError> {
        let options = RATING_OPTIONS.iter().map(|o| o.to_string());
        let mut req = self
            .bot
            .send_poll(ChatId(chat_id), RATING_QUESTION, options)
            .is_anonymous(false)
            .allows_multiple_answers(false);
        if let Some(t) = thread_id {
            req = req.message_thread_id(thread(t));
        }
        let sent = req.await.map_err(to_channel_error)?;

        let poll = sent.poll().ok_or_else(|| {
            ChannelError::UnexpectedResponse(format!(
                "message {} carries no poll",
                sent.id.0
            ))
        })?;
        Ok(OpenedPoll {
            poll_id: poll.id.to_string().into(),
            message_id: sent.id.0,
        })
    }

    async fn stop_poll(&self, chat_id: i64, message_id: i32) -> Result<Vec<u32>, ChannelError> {
        let poll = self
            .bot
            .stop_poll(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(to_channel_error)?;
        Ok(poll.options.iter().map(|o| o.voter_count as u32).collect())
    }

    async fn identity(&self) -> Result<String, ChannelError> {
        let me = self.bot.get_me().await.map_err(to_channel_error)?;
        Ok(me
            .user
            .username
            .clone()
            .unwrap_or_else(|| me.user.id.to_string()))
    }
}
