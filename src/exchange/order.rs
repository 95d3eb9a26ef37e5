use std::sync::Arc;

use crate::core_types::{Funds, OrderId, Quantity};
use crate::trader::TraderSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// A resting limit order. Holds a reference to the session that owns it for
/// the order's entire lifetime, exactly as `exchange.c`'s `struct order` holds a
/// `trader_ref`'d pointer until the order is removed.
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub remaining: Quantity,
    pub limit_price: Funds,
    pub owner: Arc<TraderSession>,
}
