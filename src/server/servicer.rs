//! Per-connection service loop.
//!
//! Grounded on `server.c`'s `brs_client_service`: register with the client
//! registry, loop receiving packets, require LOGIN before anything else,
//! dispatch by type afterward, and clean up on EOF/error.

use std::net::TcpStream;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core_types::{OrderId, Quantity};
use crate::exchange::{Exchange, Side};
use crate::protocol::{
    CancelInfo, EscrowInfo, FundsInfo, NotifyInfo, OrderInfo, PacketHeader, PacketType,
    ProtocolError, StatusInfo, recv_packet, send_packet,
};
use crate::registry::{ClientRegistry, ConnId};
use crate::trader::{LoginError, TraderRegistry, TraderSession};

/// Drive one client connection to completion.
pub fn service_connection(
    stream: TcpStream,
    conn_id: ConnId,
    client_registry: &ClientRegistry,
    traders: &Arc<TraderRegistry>,
    exchange: &Arc<Exchange>,
) {
    let registry_handle = match stream.try_clone() {
        Ok(s) => s,
        Err(err) => {
            warn!(%err, "failed to clone stream for registry");
            return;
        }
    };
    client_registry.register(conn_id, registry_handle);

    let mut reader = match stream.try_clone() {
        Ok(s) => s,
        Err(err) => {
            warn!(%err, "failed to clone stream for reading");
            client_registry.unregister(conn_id);
            return;
        }
    };

    let mut session: Option<Arc<TraderSession>> = None;

    loop {
        let (header, payload) = match recv_packet(&mut reader) {
            Ok(v) => v,
            Err(ProtocolError::Eof) => {
                debug!(conn_id, "client disconnected cleanly");
                break;
            }
            Err(err) => {
                debug!(conn_id, %err, "protocol error, closing connection");
                break;
            }
        };

        match &session {
            None => {
                session = handle_pre_login(&stream, traders, header.ty, &payload);
            }
            Some(active) => {
                dispatch(active, traders, exchange, header.ty, &payload);
            }
        }
    }

    if let Some(session) = session.take() {
        traders.logout(&session.name);
    }
    client_registry.unregister(conn_id);
}

fn send_raw(stream: &TcpStream, ty: PacketType, payload: &[u8]) {
    let header = PacketHeader::new(ty, payload.len() as u16);
    let mut writer = stream;
    if let Err(err) = send_packet(&mut writer, header, payload) {
        debug!(%err, "send failed on not-yet-logged-in connection");
    }
}

/// Handle one packet while no session exists yet: only LOGIN is acceptable.
fn handle_pre_login(
    stream: &TcpStream,
    traders: &Arc<TraderRegistry>,
    ty: PacketType,
    payload: &[u8],
) -> Option<Arc<TraderSession>> {
    if ty != PacketType::Login {
        send_raw(stream, PacketType::Nack, &[]);
        return None;
    }

    if payload.is_empty() {
        send_raw(stream, PacketType::Nack, &[]);
        return None;
    }
    // `payload` is the identity key verbatim: an arbitrary non-empty byte
    // string, not necessarily UTF-8. Keep it as bytes so two distinct
    // non-UTF-8 names can never collide onto the same account/session.
    let handle = match stream.try_clone() {
        Ok(h) => h,
        Err(_) => {
            send_raw(stream, PacketType::Nack, &[]);
            return None;
        }
    };

    match traders.login(payload, handle) {
        Ok(session) => {
            send_raw(stream, PacketType::Ack, &[]);
            Some(session)
        }
        Err(LoginError::AlreadyLoggedIn) | Err(LoginError::AccountUnavailable) => {
            send_raw(stream, PacketType::Nack, &[]);
            None
        }
    }
}

fn send_ack_status(session: &TraderSession, info: StatusInfo) {
    let payload = info.to_bytes();
    let header = PacketHeader::new(PacketType::Ack, payload.len() as u16);
    let _ = session.send_packet(header, &payload);
}

fn send_nack(session: &TraderSession) {
    let header = PacketHeader::new(PacketType::Nack, 0);
    let _ = session.send_packet(header, &[]);
}

fn status_for(
    session: &TraderSession,
    exchange: &Exchange,
    orderid: OrderId,
    quantity: Quantity,
) -> StatusInfo {
    let (balance, inventory) = session.account.snapshot();
    let market = exchange.status();
    StatusInfo {
        orderid,
        balance,
        inventory,
        bid: market.bid,
        ask: market.ask,
        last: market.last,
        quantity,
    }
}

/// Dispatch one post-login request. Every request gets exactly one reply: ACK
/// (with a full status, except on LOGIN-while-logged-in) or NACK.
fn dispatch(
    session: &Arc<TraderSession>,
    traders: &Arc<TraderRegistry>,
    exchange: &Arc<Exchange>,
    ty: PacketType,
    payload: &[u8],
) {
    match ty {
        PacketType::Login => send_nack(session),

        PacketType::Status => {
            send_ack_status(session, status_for(session, exchange, 0, 0));
        }

        PacketType::Deposit => match FundsInfo::from_bytes(payload) {
            Ok(info) => match session.account.increase_balance(info.amount) {
                Ok(()) => send_ack_status(session, status_for(session, exchange, 0, 0)),
                Err(_) => send_nack(session),
            },
            Err(err) => {
                debug!(%err, "bad Deposit payload");
                send_nack(session);
            }
        },

        PacketType::Withdraw => match FundsInfo::from_bytes(payload) {
            Ok(info) => match session.account.decrease_balance(info.amount) {
                Ok(()) => send_ack_status(session, status_for(session, exchange, 0, 0)),
                Err(_) => send_nack(session),
            },
            Err(err) => {
                debug!(%err, "bad Withdraw payload");
                send_nack(session);
            }
        },

        PacketType::Escrow => match EscrowInfo::from_bytes(payload) {
            Ok(info) => match session.account.increase_inventory(info.quantity) {
                Ok(()) => send_ack_status(session, status_for(session, exchange, 0, 0)),
                Err(_) => send_nack(session),
            },
            Err(err) => {
                debug!(%err, "bad Escrow payload");
                send_nack(session);
            }
        },

        PacketType::Release => match EscrowInfo::from_bytes(payload) {
            Ok(info) => match session.account.decrease_inventory(info.quantity) {
                Ok(()) => send_ack_status(session, status_for(session, exchange, 0, 0)),
                Err(_) => send_nack(session),
            },
            Err(err) => {
                debug!(%err, "bad Release payload");
                send_nack(session);
            }
        },

        PacketType::Buy | PacketType::Sell => match OrderInfo::from_bytes(payload) {
            Ok(info) => {
                let side = if ty == PacketType::Buy {
                    Side::Buy
                } else {
                    Side::Sell
                };
                match exchange.post(side, session, info.quantity, info.price) {
                    Ok(order_id) => {
                        let notify = match side {
                            Side::Buy => NotifyInfo {
                                buyer: order_id,
                                seller: 0,
                                quantity: info.quantity,
                                price: info.price,
                            },
                            Side::Sell => NotifyInfo {
                                buyer: 0,
                                seller: order_id,
                                quantity: info.quantity,
                                price: info.price,
                            },
                        };
                        traders.broadcast(PacketType::Posted, notify);
                        send_ack_status(session, status_for(session, exchange, order_id, 0));
                    }
                    Err(_) => send_nack(session),
                }
            }
            Err(err) => {
                debug!(%err, "bad Buy/Sell payload");
                send_nack(session);
            }
        },

        PacketType::Cancel => match CancelInfo::from_bytes(payload) {
            Ok(info) => match exchange.cancel(session, info.order) {
                Ok(refunded) => {
                    send_ack_status(session, status_for(session, exchange, info.order, refunded))
                }
                Err(_) => send_nack(session),
            },
            Err(err) => {
                debug!(%err, "bad Cancel payload");
                send_nack(session);
            }
        },

        PacketType::NoPkt
        | PacketType::Ack
        | PacketType::Nack
        | PacketType::Bought
        | PacketType::Sold
        | PacketType::Posted
        | PacketType::Canceled
        | PacketType::Traded => send_nack(session),
    }
}
