use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info};

use crate::account::AccountError;
use crate::core_types::{Funds, OrderId, Quantity};
use crate::protocol::{NotifyInfo, PacketHeader, PacketType};
use crate::trader::{TraderRegistry, TraderSession};

use super::book::OrderBook;
use super::order::{Order, Side};
use super::signal::MatchSignal;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("order quantity and price must both be nonzero")]
    InvalidOrder,
    #[error("order value overflows the funds range")]
    Overflow,
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("order not found or not owned by this trader")]
    OrderNotFound,
}

/// Market-wide status, independent of any particular trader's account.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeStatus {
    pub bid: Funds,
    pub ask: Funds,
    pub last: Funds,
}

struct Inner {
    book: OrderBook,
    next_order_id: OrderId,
    last_trade_price: Funds,
}

/// The order book, matchmaker worker, and trade-pricing logic for one
/// instrument. One exchange-wide mutex protects the book, the order-id
/// counter, and the last trade price together, per the lock ordering in
/// `SPEC_FULL.md`.
pub struct Exchange {
    inner: Mutex<Inner>,
    signal: MatchSignal,
    running: AtomicBool,
    traders: Arc<TraderRegistry>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Exchange {
    /// Construct the exchange and start its dedicated matchmaker thread.
    pub fn start(traders: Arc<TraderRegistry>) -> Arc<Exchange> {
        let exchange = Arc::new(Exchange {
            inner: Mutex::new(Inner {
                book: OrderBook::new(),
                next_order_id: 1,
                last_trade_price: 0,
            }),
            signal: MatchSignal::new(),
            running: AtomicBool::new(true),
            traders,
            worker: Mutex::new(None),
        });

        let worker_exchange = Arc::clone(&exchange);
        let handle = thread::Builder::new()
            .name("matchmaker".to_string())
            .spawn(move || worker_exchange.matchmaker_loop())
            .expect("failed to spawn matchmaker thread");
        *exchange.worker.lock().unwrap() = Some(handle);

        exchange
    }

    fn matchmaker_loop(&self) {
        loop {
            self.signal.wait();
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            self.run_matching_to_quiescence();
        }
    }

    /// Post a BUY or SELL limit order, encumbering the trader's balance or
    /// inventory first.
    pub fn post(
        &self,
        side: Side,
        owner: &Arc<TraderSession>,
        quantity: Quantity,
        limit_price: Funds,
    ) -> Result<OrderId, ExchangeError> {
        if quantity == 0 || limit_price == 0 {
            return Err(ExchangeError::InvalidOrder);
        }

        match side {
            Side::Buy => {
                let cost = quantity
                    .checked_mul(limit_price)
                    .ok_or(ExchangeError::Overflow)?;
                owner.account.decrease_balance(cost)?;
            }
            Side::Sell => {
                owner.account.decrease_inventory(quantity)?;
            }
        }

        let order_id = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_order_id;
            inner.next_order_id += 1;
            inner.book.insert(Order {
                id,
                side,
                remaining: quantity,
                limit_price,
                owner: Arc::clone(owner),
            });
            id
        };

        debug!(?side, order_id, quantity, limit_price, "order posted");
        self.signal.post();
        Ok(order_id)
    }

    /// Cancel a live order owned by `owner`, refunding its remaining
    /// encumbrance and broadcasting CANCELED.
    pub fn cancel(
        &self,
        owner: &Arc<TraderSession>,
        order_id: OrderId,
    ) -> Result<Quantity, ExchangeError> {
        let (side, remaining) = {
            let mut inner = self.inner.lock().unwrap();
            let (side, idx) = inner
                .book
                .find(order_id)
                .ok_or(ExchangeError::OrderNotFound)?;
            if !Arc::ptr_eq(&inner.book.get(side, idx).owner, owner) {
                return Err(ExchangeError::OrderNotFound);
            }
            let removed = inner.book.remove(side, idx);
            match side {
                Side::Buy => {
                    let refund = removed
                        .remaining
                        .checked_mul(removed.limit_price)
                        .expect("encumbrance was checked to fit at post time");
                    owner
                        .account
                        .increase_balance(refund)
                        .expect("refund of previously-encumbered funds cannot overflow");
                }
                Side::Sell => {
                    owner
                        .account
                        .increase_inventory(removed.remaining)
                        .expect("refund of previously-encumbered inventory cannot overflow");
                }
            }
            (side, removed.remaining)
        };

        let notify = match side {
            Side::Buy => NotifyInfo {
                buyer: order_id,
                seller: 0,
                quantity: remaining,
                price: 0,
            },
            Side::Sell => NotifyInfo {
                buyer: 0,
                seller: order_id,
                quantity: remaining,
                price: 0,
            },
        };
        self.traders.broadcast(PacketType::Canceled, notify);

        Ok(remaining)
    }

    /// Current best bid/ask/last-trade-price, independent of any account.
    pub fn status(&self) -> ExchangeStatus {
        let inner = self.inner.lock().unwrap();
        let bid = inner
            .book
            .best_buy_index()
            .map(|i| inner.book.get(Side::Buy, i).limit_price)
            .unwrap_or(0);
        let ask = inner
            .book
            .best_sell_index()
            .map(|i| inner.book.get(Side::Sell, i).limit_price)
            .unwrap_or(0);
        ExchangeStatus {
            bid,
            ask,
            last: inner.last_trade_price,
        }
    }

    /// Repeatedly match the best crossing buy/sell pair until none remains.
    /// Runs entirely under the exchange lock; notifications are sent from
    /// inside the critical section, which is safe because sends only acquire
    /// the strictly-lower session write lock.
    fn run_matching_to_quiescence(&self) {
        let mut inner = self.inner.lock().unwrap();
        loop {
            let (buy_idx, sell_idx) =
                match (inner.book.best_buy_index(), inner.book.best_sell_index()) {
                    (Some(b), Some(s)) => (b, s),
                    _ => break,
                };

            let buy_price = inner.book.get(Side::Buy, buy_idx).limit_price;
            let sell_price = inner.book.get(Side::Sell, sell_idx).limit_price;
            if buy_price < sell_price {
                break;
            }

            let trade_price = trade_price(sell_price, buy_price, inner.last_trade_price);
            let trade_qty = inner
                .book
                .get(Side::Buy, buy_idx)
                .remaining
                .min(inner.book.get(Side::Sell, sell_idx).remaining);

            inner.last_trade_price = trade_price;

            let buy_owner = Arc::clone(&inner.book.get(Side::Buy, buy_idx).owner);
            let sell_owner = Arc::clone(&inner.book.get(Side::Sell, sell_idx).owner);
            let buy_id = inner.book.get(Side::Buy, buy_idx).id;
            let sell_id = inner.book.get(Side::Sell, sell_idx).id;

            sell_owner
                .account
                .increase_balance(
                    trade_qty
                        .checked_mul(trade_price)
                        .expect("trade proceeds fit funds range: bounded by encumbered cost"),
                )
                .expect("trade proceeds credit cannot overflow a freshly-vacated slot");
            buy_owner
                .account
                .increase_inventory(trade_qty)
                .expect("trade inventory credit cannot overflow");

            let refund = trade_qty
                .checked_mul(buy_price - trade_price)
                .expect("refund is bounded by the original encumbrance");
            if refund > 0 {
                buy_owner
                    .account
                    .increase_balance(refund)
                    .expect("refund of the buyer's own encumbrance cannot overflow");
            }

            inner.book.get_mut(Side::Buy, buy_idx).remaining -= trade_qty;
            inner.book.get_mut(Side::Sell, sell_idx).remaining -= trade_qty;

            let notify = NotifyInfo {
                buyer: buy_id,
                seller: sell_id,
                quantity: trade_qty,
                price: trade_price,
            };
            let payload = notify.to_bytes();
            let _ = buy_owner.send_packet(
                PacketHeader::new(PacketType::Bought, payload.len() as u16),
                &payload,
            );
            let _ = sell_owner.send_packet(
                PacketHeader::new(PacketType::Sold, payload.len() as u16),
                &payload,
            );
            self.traders.broadcast(PacketType::Traded, notify);

            info!(buy_id, sell_id, trade_qty, trade_price, "trade executed");

            if inner.book.get(Side::Buy, buy_idx).remaining == 0 {
                inner.book.remove(Side::Buy, buy_idx);
            }
            if inner.book.get(Side::Sell, sell_idx).remaining == 0 {
                inner.book.remove(Side::Sell, sell_idx);
            }
        }
    }

    /// Stop the matchmaker thread, then refund and discard every order still
    /// resting on the book, mirroring `exchange_fini`.
    pub fn finalize(&self) {
        self.running.store(false, Ordering::Release);
        self.signal.post();
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }

        let mut inner = self.inner.lock().unwrap();
        for order in inner.book.drain_all() {
            match order.side {
                Side::Buy => {
                    let refund = order.remaining.saturating_mul(order.limit_price);
                    let _ = order.owner.account.increase_balance(refund);
                }
                Side::Sell => {
                    let _ = order.owner.account.increase_inventory(order.remaining);
                }
            }
        }
    }
}

/// The trade-price overlap rule: anchor to `last` when it already sits inside
/// `[low, high]`, otherwise clamp to whichever bound `last` is outside of, and
/// split the difference on the very first trade.
fn trade_price(low: Funds, high: Funds, last: Funds) -> Funds {
    if last == 0 {
        low + (high - low) / 2
    } else if last < low {
        low
    } else if last > high {
        high
    } else {
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountStore;
    use std::net::{TcpListener, TcpStream};
    use std::time::Duration;

    #[test]
    fn trade_price_midpoint_when_no_last() {
        assert_eq!(trade_price(50, 100, 0), 75);
    }

    #[test]
    fn trade_price_anchors_to_last_within_overlap() {
        assert_eq!(trade_price(60, 90, 75), 75);
    }

    #[test]
    fn trade_price_clamps_below_low() {
        assert_eq!(trade_price(60, 90, 10), 60);
    }

    #[test]
    fn trade_price_clamps_above_high() {
        assert_eq!(trade_price(60, 90, 200), 90);
    }

    fn session(traders: &Arc<TraderRegistry>, name: &str) -> Arc<TraderSession> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        drop(client);
        traders.login(name.as_bytes(), server).unwrap()
    }

    #[test]
    fn cross_at_midpoint_from_empty_book() {
        let traders = Arc::new(TraderRegistry::new(Arc::new(AccountStore::new())));
        let exchange = Exchange::start(Arc::clone(&traders));

        let alice = session(&traders, "alice");
        alice.account.increase_balance(10_000).unwrap();
        let bob = session(&traders, "bob");
        bob.account.increase_inventory(10).unwrap();

        exchange.post(Side::Sell, &bob, 10, 50).unwrap();
        exchange.post(Side::Buy, &alice, 10, 100).unwrap();

        // give the matchmaker thread a moment to run
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(alice.account.snapshot(), (10_000 - 10 * 75, 10));
        assert_eq!(bob.account.snapshot(), (10 * 75, 0));
        assert_eq!(exchange.status().last, 75);

        exchange.finalize();
    }

    #[test]
    fn cancel_refunds_encumbrance() {
        let traders = Arc::new(TraderRegistry::new(Arc::new(AccountStore::new())));
        let exchange = Exchange::start(Arc::clone(&traders));

        let carol = session(&traders, "carol");
        carol.account.increase_balance(500).unwrap();

        let order_id = exchange.post(Side::Buy, &carol, 5, 100).unwrap();
        assert_eq!(carol.account.snapshot(), (0, 0));

        let refunded = exchange.cancel(&carol, order_id).unwrap();
        assert_eq!(refunded, 5);
        assert_eq!(carol.account.snapshot(), (500, 0));

        exchange.finalize();
    }

    #[test]
    fn partial_fill_leaves_remainder_on_book() {
        let traders = Arc::new(TraderRegistry::new(Arc::new(AccountStore::new())));
        let exchange = Exchange::start(Arc::clone(&traders));

        let alice = session(&traders, "alice");
        alice.account.increase_inventory(100).unwrap();
        let bob = session(&traders, "bob");
        bob.account.increase_balance(400).unwrap();

        exchange.post(Side::Sell, &alice, 100, 10).unwrap();
        exchange.post(Side::Buy, &bob, 30, 10).unwrap();

        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(bob.account.snapshot(), (100, 30));
        assert_eq!(alice.account.snapshot(), (300, 0));

        exchange.finalize();
    }

    #[test]
    fn finalize_refunds_resting_orders() {
        let traders = Arc::new(TraderRegistry::new(Arc::new(AccountStore::new())));
        let exchange = Exchange::start(Arc::clone(&traders));

        let dave = session(&traders, "dave");
        dave.account.increase_balance(1000).unwrap();
        exchange.post(Side::Buy, &dave, 5, 100).unwrap();

        exchange.finalize();

        assert_eq!(dave.account.snapshot(), (1000, 0));
    }
}
