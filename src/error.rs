//! Crate-wide error re-exports.
//!
//! Each subsystem defines its own `thiserror`-derived error enum next to the code
//! that produces it (`protocol::ProtocolError`, `account::AccountError`,
//! `exchange::ExchangeError`, `config::ConfigError`); this module just gathers the
//! ones that cross subsystem boundaries so callers don't need to know which file
//! they live in.

pub use crate::account::AccountError;
pub use crate::config::ConfigError;
pub use crate::exchange::ExchangeError;
pub use crate::protocol::ProtocolError;
