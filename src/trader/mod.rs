//! Trader sessions: the binding between a logged-in socket and an account.
//!
//! Grounded on `trader.c`. The original's explicit `refcount`/`trader_ref`/
//! `trader_unref` with an abort-on-negative-count guard is the classic C pattern
//! for "free this object exactly when the last interested party is done with
//! it" — which is precisely what `Arc` gives for free in Rust, including the
//! negative-refcount-is-impossible guarantee the C code has to check for by
//! hand. `TraderSession` is therefore handed out as `Arc<TraderSession>`; no
//! separate ref/unref API is needed, only `Arc::clone`/drop.

mod registry;
mod session;

pub use registry::TraderRegistry;
pub use session::TraderSession;
