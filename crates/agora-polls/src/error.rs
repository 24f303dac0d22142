use thiserror::Error;

use agora_channels::ChannelError;
use agora_core::types::PollId;
use agora_scheduler::SchedulerError;

#[derive(Debug, Error)]
pub enum PollError {
    /// A record for this poll id already exists.
    #[error("poll {0} is already tracked")]
    AlreadyTracked(PollId),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

pub type Result<T> = std::result::Result<T, PollError>;
