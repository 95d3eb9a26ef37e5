//! Process lifecycle: wiring the subsystems together, the accept loop, and
//! graceful shutdown.
//!
//! Grounded on `main.c`'s init order (registry → accounts → traders → exchange
//! → listening socket → accept loop) and `terminate()` (shutdown_all →
//! wait_for_empty → finalize every module, in that order).
//!
//! One deliberate departure from the original: `main.c`'s signal handler closes
//! the single shared `listen_fd` directly, which interrupts the blocked
//! `accept()` call in the main thread because it's the very same file
//! descriptor. Safe Rust has no equivalent of reaching into another thread's
//! blocking syscall like that without `unsafe` raw-fd surgery, so the listener
//! is instead put into non-blocking mode and polled with a short sleep between
//! attempts, checking the shutdown flag on each `WouldBlock`. This keeps
//! shutdown latency bounded and avoids unsafe code for a single flag check.
//! The `shutting_down` flag is also checked on every successful `accept`, not
//! just on `WouldBlock`: a connection accepted in the window between
//! `request_shutdown` setting the flag and the next `WouldBlock` poll is
//! dropped unserviced rather than handed a socket that could post an order
//! after `exchange.finalize()` has already stopped the matchmaker and
//! refunded the book.

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::account::AccountStore;
use crate::exchange::Exchange;
use crate::registry::ClientRegistry;
use crate::trader::TraderRegistry;

use super::servicer::service_connection;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns every long-lived subsystem and drives the server's accept loop and
/// shutdown sequence.
pub struct Lifecycle {
    client_registry: Arc<ClientRegistry>,
    traders: Arc<TraderRegistry>,
    exchange: Arc<Exchange>,
    shutting_down: AtomicBool,
    next_conn_id: AtomicU64,
}

impl Lifecycle {
    pub fn new() -> Arc<Lifecycle> {
        let accounts = Arc::new(AccountStore::new());
        let traders = Arc::new(TraderRegistry::new(accounts));
        let exchange = Exchange::start(Arc::clone(&traders));

        Arc::new(Lifecycle {
            client_registry: Arc::new(ClientRegistry::new()),
            traders,
            exchange,
            shutting_down: AtomicBool::new(false),
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Bind and run the accept loop until shutdown is requested. Each accepted
    /// connection is serviced on its own detached thread.
    pub fn run(self: &Arc<Self>, port: u16) -> std::io::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        info!(port, "bourse server listening");

        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if self.shutting_down.load(Ordering::Acquire) {
                        // Shutdown began between the previous WouldBlock and this
                        // accept; drop the connection unserviced rather than let it
                        // post an order after the matchmaker has already finalized.
                        let _ = stream.shutdown(std::net::Shutdown::Both);
                        continue;
                    }
                    let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
                    info!(conn_id, %peer, "accepted connection");
                    let client_registry = Arc::clone(&self.client_registry);
                    let traders = Arc::clone(&self.traders);
                    let exchange = Arc::clone(&self.exchange);
                    let spawned = thread::Builder::new()
                        .name(format!("client-{conn_id}"))
                        .spawn(move || {
                            service_connection(
                                stream,
                                conn_id,
                                &client_registry,
                                &traders,
                                &exchange,
                            )
                        });
                    if let Err(err) = spawned {
                        warn!(%err, "failed to spawn client thread");
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if self.shutting_down.load(Ordering::Acquire) {
                        break;
                    }
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(err) => {
                    warn!(%err, "accept failed");
                }
            }
        }

        Ok(())
    }

    /// Request graceful shutdown. Safe to call from any thread, including a
    /// signal-handling thread (see `main.rs`).
    pub fn request_shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return; // already shutting down
        }
        info!("shutdown requested");
        self.client_registry.shutdown_all();
        self.client_registry.wait_until_empty();
        self.exchange.finalize();
        info!("bourse server terminated");
    }
}
