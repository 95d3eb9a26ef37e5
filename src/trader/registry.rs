use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::account::AccountStore;
use crate::protocol::{NotifyInfo, PacketHeader, PacketType};

use super::session::TraderSession;

/// Name-indexed map of currently logged-in traders, and the account store they
/// draw their accounts from.
///
/// Names are raw bytes (see [`TraderSession::name`]), so the map is keyed on
/// `Box<[u8]>` rather than `String`.
///
/// Grounded on `trader.c`'s `trader_map` (a name → trader association protected
/// by one global mutex) and `trader_broadcast_packet` (snapshot the live set
/// under the lock, take a reference on each, release the lock, then send).
pub struct TraderRegistry {
    accounts: Arc<AccountStore>,
    sessions: Mutex<FxHashMap<Box<[u8]>, Arc<TraderSession>>>,
}

/// Reason a login attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    AlreadyLoggedIn,
    AccountUnavailable,
}

impl TraderRegistry {
    pub fn new(accounts: Arc<AccountStore>) -> TraderRegistry {
        TraderRegistry {
            accounts,
            sessions: Mutex::new(FxHashMap::default()),
        }
    }

    /// Attempt to log a socket in under `name`. Fails if `name` is already the
    /// identity of a logged-in session.
    pub fn login(
        &self,
        name: &[u8],
        socket: TcpStream,
    ) -> Result<Arc<TraderSession>, LoginError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(name) {
            return Err(LoginError::AlreadyLoggedIn);
        }
        let account = self
            .accounts
            .lookup(name)
            .map_err(|_| LoginError::AccountUnavailable)?;
        let session = Arc::new(TraderSession::new(Box::from(name), account, socket));
        sessions.insert(Box::from(name), Arc::clone(&session));
        debug!(trader = %session.display_name(), "logged in");
        Ok(session)
    }

    /// Remove `name` from the index. The session itself (and its socket) lives
    /// on until every other `Arc` reference to it is dropped.
    pub fn logout(&self, name: &[u8]) {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(name);
        debug!(trader = %String::from_utf8_lossy(name), "logged out");
    }

    /// Send `notify` to every currently logged-in session.
    pub fn broadcast(&self, ty: PacketType, notify: NotifyInfo) {
        let snapshot: Vec<Arc<TraderSession>> = {
            let sessions = self.sessions.lock().unwrap();
            sessions.values().cloned().collect()
        };
        let payload = notify.to_bytes();
        for session in snapshot {
            let header = PacketHeader::new(ty, payload.len() as u16);
            if let Err(err) = session.send_packet(header, &payload) {
                debug!(trader = %session.display_name(), %err, "broadcast send failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn local_socket() -> TcpStream {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        drop(client);
        server
    }

    #[test]
    fn login_is_unique_per_name() {
        let registry = TraderRegistry::new(Arc::new(AccountStore::new()));
        let _alice = registry.login(b"alice", local_socket()).unwrap();
        let err = registry.login(b"alice", local_socket()).unwrap_err();
        assert_eq!(err, LoginError::AlreadyLoggedIn);
    }

    #[test]
    fn logout_frees_the_name_for_reuse() {
        let registry = TraderRegistry::new(Arc::new(AccountStore::new()));
        let alice = registry.login(b"alice", local_socket()).unwrap();
        registry.logout(&alice.name);
        registry.login(b"alice", local_socket()).unwrap();
    }

    #[test]
    fn same_name_reuses_the_same_account() {
        let registry = TraderRegistry::new(Arc::new(AccountStore::new()));
        let alice = registry.login(b"alice", local_socket()).unwrap();
        alice.account.increase_balance(100).unwrap();
        registry.logout(b"alice");
        let alice_again = registry.login(b"alice", local_socket()).unwrap();
        assert_eq!(alice_again.account.snapshot(), (100, 0));
    }

    #[test]
    fn distinct_non_utf8_names_do_not_collide() {
        let registry = TraderRegistry::new(Arc::new(AccountStore::new()));
        let a = registry.login(&[0xFF, 0x01], local_socket()).unwrap();
        let b = registry.login(&[0xFF, 0x02], local_socket()).unwrap();
        a.account.increase_balance(10).unwrap();
        assert_eq!(b.account.snapshot(), (0, 0));
    }
}
