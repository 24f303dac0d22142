pub mod adapter;
pub mod allow;
pub mod channel;
pub mod command;
pub mod context;
pub mod error;
pub mod handler;
pub mod ingest;

pub use adapter::TelegramAdapter;
pub use channel::TelegramChannel;
pub use context::BotContext;
