//! Connection servicing and process lifecycle.
//!
//! Grounded on `server.c` (per-connection dispatch) and `main.c` (startup,
//! accept loop, shutdown sequencing).

mod lifecycle;
mod servicer;

pub use lifecycle::Lifecycle;
