//! "Bourse" exchange server.
//!
//! ```text
//! ┌────────┐   ┌───────────┐   ┌──────────────┐   ┌──────────┐
//! │ Config │──▶│ Registries│──▶│ Accept loop  │──▶│ Servicer │
//! │ (-p)   │   │ (accounts,│   │ (per-conn    │   │ (per-conn│
//! │        │   │  traders, │   │  thread)     │   │  loop)   │
//! │        │   │  exchange)│   │              │   │          │
//! └────────┘   └───────────┘   └──────────────┘   └──────────┘
//! ```
//!
//! Usage: `bourse -p <port>`. A SIGHUP requests a graceful shutdown: every live
//! connection is half-closed, the server waits for all of them to drain, the
//! matchmaker stops and refunds whatever orders are still resting, and the
//! process exits.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use signal_hook::consts::SIGHUP;
use signal_hook::iterator::Signals;
use tracing::error;

use bourse::config::Config;
use bourse::logging;
use bourse::server::Lifecycle;

fn main() -> ExitCode {
    logging::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::parse(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Usage: bourse -p <port>");
            return ExitCode::FAILURE;
        }
    };

    let lifecycle = Lifecycle::new();

    // `Signals` masks SIGHUP and receives it on a dedicated background thread
    // via a self-pipe, rather than running our closure inside the real signal
    // handler context. That matters: `request_shutdown` takes a `Mutex`/
    // `Condvar` and joins the matchmaker thread, none of which are
    // async-signal-safe to do from inside an actual `sigaction` handler (the
    // interrupted thread could already be holding one of those locks, which
    // would deadlock it against itself). The original C server keeps its
    // handler to a single flag write for the same reason; `Signals::forever`
    // is the idiomatic-Rust way to get that same separation.
    let mut signals = match Signals::new([SIGHUP]) {
        Ok(signals) => signals,
        Err(err) => {
            error!(%err, "failed to install SIGHUP handler");
            return ExitCode::FAILURE;
        }
    };
    let shutdown_lifecycle = Arc::clone(&lifecycle);
    thread::spawn(move || {
        for _signal in signals.forever() {
            shutdown_lifecycle.request_shutdown();
        }
    });

    let ran_cleanly = AtomicBool::new(true);
    if let Err(err) = lifecycle.run(config.port) {
        error!(%err, "server error");
        ran_cleanly.store(false, Ordering::Relaxed);
    }

    if ran_cleanly.load(Ordering::Relaxed) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
