//! `agora-core`: configuration, shared domain types and the job descriptor
//! used by every other crate in the workspace.

pub mod action;
pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use action::JobAction;
pub use error::{AgoraError, Result};
pub use types::{PollRecord, TimeWindow};
