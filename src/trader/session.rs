use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::account::Account;
use crate::protocol::{PacketHeader, ProtocolError, send_packet};

/// A logged-in client: a name, the account it owns, and the socket it talks
/// over.
///
/// `name` is the raw identity byte string from LOGIN, not a `String`: it's
/// kept exactly as received so two distinct non-UTF-8 names can never collide.
/// It's only ever decoded (lossily) for display in logs.
///
/// All sends go through `socket`'s mutex, which is what serializes the
/// matchmaker's notifications against the servicer's own ACKs/NACKs on the same
/// connection so that two packets can never interleave on the wire.
pub struct TraderSession {
    pub name: Box<[u8]>,
    pub account: Arc<Account>,
    socket: Mutex<TcpStream>,
}

impl TraderSession {
    pub fn new(name: Box<[u8]>, account: Arc<Account>, socket: TcpStream) -> TraderSession {
        TraderSession {
            name,
            account,
            socket: Mutex::new(socket),
        }
    }

    /// Display-only rendering of the trader's name, for logging.
    pub fn display_name(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Send one packet. Blocks if another send on this session is in flight.
    pub fn send_packet(
        &self,
        header: PacketHeader,
        payload: &[u8],
    ) -> Result<(), ProtocolError> {
        let mut socket = self.socket.lock().unwrap();
        debug!(trader = %self.display_name(), ty = ?header.ty, "sending packet");
        send_packet(&mut *socket, header, payload)
    }
}
