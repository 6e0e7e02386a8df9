//! Per-symbol order book, grounded on
//! `original_source/trading/market_data/order_book.h`: parallel fixed-length
//! arrays for bids and asks, O(1) per-level updates, totals recomputed (not
//! incrementally maintained) on every update.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::messages::{Price, Qty, PRICE_INVALID};

/// A fixed-depth order book for one ticker. All mutation happens from the
/// event-loop thread; `last_update_ns` is the only field a reader thread
/// may safely peek at concurrently.
pub struct OrderBook {
    max_levels: usize,
    bid_prices: Vec<Price>,
    bid_qtys: Vec<Qty>,
    bid_orders: Vec<u32>,
    ask_prices: Vec<Price>,
    ask_qtys: Vec<Qty>,
    ask_orders: Vec<u32>,
    bid_depth: usize,
    ask_depth: usize,
    total_bid_qty: u64,
    total_ask_qty: u64,
    last_update_ns: AtomicU64,
}

impl OrderBook {
    pub fn new(max_levels: usize) -> Self {
        OrderBook {
            max_levels,
            bid_prices: vec![PRICE_INVALID; max_levels],
            bid_qtys: vec![0; max_levels],
            bid_orders: vec![0; max_levels],
            ask_prices: vec![PRICE_INVALID; max_levels],
            ask_qtys: vec![0; max_levels],
            ask_orders: vec![0; max_levels],
            bid_depth: 0,
            ask_depth: 0,
            total_bid_qty: 0,
            total_ask_qty: 0,
            last_update_ns: AtomicU64::new(0),
        }
    }

    pub fn reset(&mut self) {
        self.clear_bids();
        self.clear_asks();
    }

    pub fn clear_bids(&mut self) {
        self.bid_depth = 0;
        self.total_bid_qty = 0;
    }

    pub fn clear_asks(&mut self) {
        self.ask_depth = 0;
        self.total_ask_qty = 0;
    }

    /// Updates one bid level (O(1)); `level` must be within `max_levels`.
    pub fn update_bid(&mut self, price: Price, qty: Qty, order_count: u32, level: usize) {
        debug_assert!(level < self.max_levels);
        self.bid_prices[level] = price;
        self.bid_qtys[level] = qty;
        self.bid_orders[level] = order_count;
        self.bid_depth = self.bid_depth.max(level + 1);
        self.recalculate_bid_qty();
    }

    pub fn update_ask(&mut self, price: Price, qty: Qty, order_count: u32, level: usize) {
        debug_assert!(level < self.max_levels);
        self.ask_prices[level] = price;
        self.ask_qtys[level] = qty;
        self.ask_orders[level] = order_count;
        self.ask_depth = self.ask_depth.max(level + 1);
        self.recalculate_ask_qty();
    }

    fn recalculate_bid_qty(&mut self) {
        self.total_bid_qty = self.bid_qtys[..self.bid_depth].iter().map(|&q| q as u64).sum();
    }

    fn recalculate_ask_qty(&mut self) {
        self.total_ask_qty = self.ask_qtys[..self.ask_depth].iter().map(|&q| q as u64).sum();
    }

    pub fn update_timestamp(&self, ts: u64) {
        self.last_update_ns.store(ts, Ordering::Relaxed);
    }

    pub fn last_update_ns(&self) -> u64 {
        self.last_update_ns.load(Ordering::Relaxed)
    }

    pub fn best_bid(&self) -> Price {
        if self.bid_depth == 0 { PRICE_INVALID } else { self.bid_prices[0] }
    }

    pub fn best_ask(&self) -> Price {
        if self.ask_depth == 0 { PRICE_INVALID } else { self.ask_prices[0] }
    }

    pub fn best_bid_qty(&self) -> Qty {
        if self.bid_depth == 0 { 0 } else { self.bid_qtys[0] }
    }

    pub fn best_ask_qty(&self) -> Qty {
        if self.ask_depth == 0 { 0 } else { self.ask_qtys[0] }
    }

    pub fn spread(&self) -> Option<Price> {
        let (bid, ask) = (self.best_bid(), self.best_ask());
        if bid == PRICE_INVALID || ask == PRICE_INVALID {
            None
        } else {
            Some(ask - bid)
        }
    }

    pub fn mid_price(&self) -> Option<f64> {
        let (bid, ask) = (self.best_bid(), self.best_ask());
        if bid == PRICE_INVALID || ask == PRICE_INVALID {
            None
        } else {
            Some((bid as f64 + ask as f64) / 2.0)
        }
    }

    pub fn total_bid_qty(&self) -> u64 {
        self.total_bid_qty
    }

    pub fn total_ask_qty(&self) -> u64 {
        self.total_ask_qty
    }

    /// Order-flow imbalance in `[-1.0, 1.0]`; positive favors the bid side.
    pub fn imbalance(&self) -> f64 {
        let total = self.total_bid_qty + self.total_ask_qty;
        if total == 0 {
            0.0
        } else {
            (self.total_bid_qty as f64 - self.total_ask_qty as f64) / total as f64
        }
    }

    pub fn bid_level(&self, level: usize) -> Option<(Price, Qty, u32)> {
        if level >= self.bid_depth {
            None
        } else {
            Some((self.bid_prices[level], self.bid_qtys[level], self.bid_orders[level]))
        }
    }

    pub fn ask_level(&self, level: usize) -> Option<(Price, Qty, u32)> {
        if level >= self.ask_depth {
            None
        } else {
            Some((self.ask_prices[level], self.ask_qtys[level], self.ask_orders[level]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_levels_start_invalid() {
        let book = OrderBook::new(20);
        assert_eq!(book.best_bid(), PRICE_INVALID);
        assert_eq!(book.best_ask(), PRICE_INVALID);
        assert_eq!(book.spread(), None);
    }

    #[test]
    fn single_bid_and_ask_crossing_spread_threshold() {
        let mut book = OrderBook::new(20);
        book.update_bid(100, 50, 1, 0);
        book.update_ask(105, 30, 1, 0);
        assert_eq!(book.best_bid(), 100);
        assert_eq!(book.best_ask(), 105);
        assert_eq!(book.spread(), Some(5));
        assert_eq!(book.total_bid_qty(), 50);
        assert_eq!(book.total_ask_qty(), 30);
    }

    #[test]
    fn totals_recomputed_not_accumulated() {
        let mut book = OrderBook::new(20);
        book.update_bid(100, 50, 1, 0);
        book.update_bid(100, 20, 1, 0); // overwrite, not add
        assert_eq!(book.total_bid_qty(), 20);
    }
}
