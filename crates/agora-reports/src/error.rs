use thiserror::Error;

use agora_channels::ChannelError;
use agora_scheduler::SchedulerError;
use agora_store::StoreError;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

pub type Result<T> = std::result::Result<T, ReportError>;
