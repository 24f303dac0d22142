//! Mapping of teloxide request errors onto the channel error taxonomy.

use teloxide::RequestError;

use agora_channels::ChannelError;

/// Classify a failed Bot API call.
///
/// API-level refusals (bad chat, poll already closed, bot blocked) and chat
/// migrations will fail the same way again; transport problems and flood
/// control are transient.
pub fn to_channel_error(e: RequestError) -> ChannelError {
    match e {
        RequestError::Api(_) | RequestError::MigrateToChatId(_) => {
            ChannelError::Rejected(e.to_string())
        }
        RequestError::InvalidJson { .. } => ChannelError::UnexpectedResponse(e.to_string()),
        _ => ChannelError::RequestFailed(e.to_string()),
    }
}
