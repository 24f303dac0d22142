use thiserror::Error;

use agora_core::retry::RetryableError;

/// Errors that can occur within any channel adapter.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The platform request failed in transit or returned a server error.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The platform understood the request and refused it (bad chat id,
    /// poll already closed, bot kicked, ...). Retrying will not help.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// An operation exceeded its allowed time budget.
    #[error("Operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The platform answered with something we could not interpret.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl RetryableError for ChannelError {
    fn timed_out(ms: u64) -> Self {
        ChannelError::Timeout { ms }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChannelError::RequestFailed(_) | ChannelError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(ChannelError::RequestFailed("502".into()).is_retryable());
        assert!(ChannelError::timed_out(10).is_retryable());
        assert!(!ChannelError::Rejected("chat not found".into()).is_retryable());
        assert!(!ChannelError::UnexpectedResponse("no poll".into()).is_retryable());
    }
}
