use super::order::{Order, Side};

/// Two linear bags of resting orders, one per side.
///
/// No price-level index: correctness only requires finding the current best
/// price on each side and breaking ties by arrival order, and a scan over the
/// expected small book sizes is simpler than maintaining a sorted structure.
/// Orders are appended at the tail and removed with a stable `Vec::remove`, so
/// position in the vector always reflects arrival order (oldest at index 0);
/// a front-to-back scan that keeps the first-seen order at a tied best price
/// therefore always prefers the earliest arrival, per the matching rule.
#[derive(Default)]
pub struct OrderBook {
    buy_orders: Vec<Order>,
    sell_orders: Vec<Order>,
}

impl OrderBook {
    pub fn new() -> OrderBook {
        OrderBook::default()
    }

    fn bag(&self, side: Side) -> &Vec<Order> {
        match side {
            Side::Buy => &self.buy_orders,
            Side::Sell => &self.sell_orders,
        }
    }

    fn bag_mut(&mut self, side: Side) -> &mut Vec<Order> {
        match side {
            Side::Buy => &mut self.buy_orders,
            Side::Sell => &mut self.sell_orders,
        }
    }

    pub fn insert(&mut self, order: Order) {
        self.bag_mut(order.side).push(order);
    }

    /// Index of the best BUY (highest price, earliest arrival on ties), if any.
    pub fn best_buy_index(&self) -> Option<usize> {
        best_index(&self.buy_orders, |a, b| a.limit_price > b.limit_price)
    }

    /// Index of the best SELL (lowest price, earliest arrival on ties), if any.
    pub fn best_sell_index(&self) -> Option<usize> {
        best_index(&self.sell_orders, |a, b| a.limit_price < b.limit_price)
    }

    pub fn get(&self, side: Side, index: usize) -> &Order {
        &self.bag(side)[index]
    }

    pub fn get_mut(&mut self, side: Side, index: usize) -> &mut Order {
        self.bag_mut(side).get_mut(index).unwrap()
    }

    pub fn remove(&mut self, side: Side, index: usize) -> Order {
        self.bag_mut(side).remove(index)
    }

    /// Find a live order by id regardless of side. Returns the side and index.
    pub fn find(&self, id: crate::core_types::OrderId) -> Option<(Side, usize)> {
        if let Some(i) = self.buy_orders.iter().position(|o| o.id == id) {
            return Some((Side::Buy, i));
        }
        if let Some(i) = self.sell_orders.iter().position(|o| o.id == id) {
            return Some((Side::Sell, i));
        }
        None
    }

    /// Drain every resting order on both sides (used during shutdown to refund
    /// encumbrance on whatever is left).
    pub fn drain_all(&mut self) -> Vec<Order> {
        self.buy_orders
            .drain(..)
            .chain(self.sell_orders.drain(..))
            .collect()
    }
}

fn best_index(orders: &[Order], better: impl Fn(&Order, &Order) -> bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, order) in orders.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(bi) if better(order, &orders[bi]) => best = Some(i),
            _ => {}
        }
    }
    best
}
