//! Account store: a process-wide name → account map, each account independently
//! lockable.
//!
//! Grounded on `account.c`'s fixed `account_map` + per-account mutex design, and
//! on the teacher's `src/balance.rs` for the checked-arithmetic, `Result`-returning
//! mutation style. Unlike the teacher's multi-asset `Balance`, a single instrument
//! means each account just holds one cash balance and one inventory count.

mod error;
mod store;

pub use error::AccountError;
pub use store::{Account, AccountStore};
