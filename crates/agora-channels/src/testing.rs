//! In-memory [`MessageChannel`] that records traffic instead of sending it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    channel::MessageChannel,
    error::ChannelError,
    types::{OpenedPoll, OutboundMessage},
};

/// Poll `n` (1-based) gets id `poll-n` and message id `1000 + n`.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<OutboundMessage>>,
    stopped: Mutex<Vec<(i64, i32)>>,
    votes: Mutex<HashMap<i32, Vec<u32>>>,
    polls_opened: AtomicU32,
    fail_send: AtomicBool,
    fail_poll: AtomicBool,
    fail_stop: AtomicBool,
    fail_identity: AtomicBool,
    stall_stop: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Final counts returned when the poll at `message_id` is stopped.
    /// Unset polls stop with zero votes.
    pub fn set_votes(&self, message_id: i32, counts: [u32; 5]) {
        lock(&self.votes).insert(message_id, counts.to_vec());
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn fail_polls(&self, fail: bool) {
        self.fail_poll.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stops(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    pub fn fail_identity(&self, fail: bool) {
        self.fail_identity.store(fail, Ordering::SeqCst);
    }

    /// Make `stop_poll` hang until the caller gives up on it.
    pub fn stall_stops(&self, stall: bool) {
        self.stall_stop.store(stall, Ordering::SeqCst);
    }

    /// Every message delivered so far, in order.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        lock(&self.sent).clone()
    }

    /// `(chat_id, message_id)` of every stop request that succeeded.
    pub fn stopped(&self) -> Vec<(i64, i32)> {
        lock(&self.stopped).clone()
    }

    pub fn polls_opened(&self) -> u32 {
        self.polls_opened.load(Ordering::SeqCst)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn simulated(what: &str) -> ChannelError {
    ChannelError::Rejected(format!("simulated {what} failure"))
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(simulated("send"));
        }
        lock(&self.sent).push(msg.clone());
        Ok(())
    }

    async fn send_rating_poll(
        &self,
        _chat_id: i64,
        _thread_id: Option<i32>,
    ) -> Result<OpenedPoll, ChannelError> {
        if self.fail_poll.load(Ordering::SeqCst) {
            return Err(simulated("poll"));
        }
        let n = self.polls_opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(OpenedPoll {
            poll_id: format!("poll-{n}").into(),
            message_id: 1000 + n as i32,
        })
    }

    async fn stop_poll(&self, chat_id: i64, message_id: i32) -> Result<Vec<u32>, ChannelError> {
        if self.stall_stop.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(simulated("stop"));
        }
        lock(&self.stopped).push((chat_id, message_id));
        Ok(lock(&self.votes)
            .get(&message_id)
            .cloned()
            .unwrap_or_else(|| vec![0; 5]))
    }

    async fn identity(&self) -> Result<String, ChannelError> {
        if self.fail_identity.load(Ordering::SeqCst) {
            return Err(simulated("identity"));
        }
        Ok("agora_test_bot".to_string())
    }
}
