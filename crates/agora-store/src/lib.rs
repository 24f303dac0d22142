//! `agora-store`: the bot's persistent collections and the SQLite backend
//! behind them.
//!
//! Callers depend on the [`Store`] trait; [`SqliteStore`] is the production
//! implementation. Every collection carries a timestamp column written with
//! [`agora_core::types::format_timestamp`], so `[start, end)` windows are
//! plain string comparisons.

pub mod db;
pub mod error;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;
pub use store::Store;
pub use types::*;
