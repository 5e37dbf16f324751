//! `ticker-core` — configuration and shared error types for the tick server.

pub mod config;
pub mod error;

pub use config::{Environment, TickerConfig};
pub use error::{Result, TickerError};
