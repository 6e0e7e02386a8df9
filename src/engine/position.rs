//! Per-ticker position and P&L bookkeeping, grounded on
//! `original_source/trading/strategy/position_keeper.h`'s `PositionKeeper`/
//! `PositionInfo`: running position, buy/sell volume and value (for VWAP),
//! and realized/unrealized P&L, fed by trade prints and fills.

use crate::engine::messages::{Price, Side, TickerId, PRICE_INVALID};

/// Running position and P&L for one ticker.
#[derive(Debug, Clone, Copy)]
pub struct PositionInfo {
    pub position: i64,
    pub buy_volume: u64,
    pub sell_volume: u64,
    pub buy_value: i64,
    pub sell_value: i64,
    pub realized_pnl: i64,
    pub unrealized_pnl: i64,
    pub last_price: Price,
    pub avg_buy_price: Price,
    pub avg_sell_price: Price,
}

impl Default for PositionInfo {
    fn default() -> Self {
        PositionInfo {
            position: 0,
            buy_volume: 0,
            sell_volume: 0,
            buy_value: 0,
            sell_value: 0,
            realized_pnl: 0,
            unrealized_pnl: 0,
            last_price: PRICE_INVALID,
            avg_buy_price: 0,
            avg_sell_price: 0,
        }
    }
}

impl PositionInfo {
    /// Volume-weighted average price across both sides.
    pub fn vwap(&self) -> Price {
        let total_volume = self.buy_volume + self.sell_volume;
        if total_volume == 0 {
            0
        } else {
            (self.buy_value + self.sell_value) / total_volume as i64
        }
    }
}

/// Tracks position and P&L across all tickers. All mutation happens from
/// the event-loop thread, matching [`crate::engine::book::OrderBook`].
pub struct PositionKeeper {
    positions: Vec<PositionInfo>,
    total_realized_pnl: i64,
    total_unrealized_pnl: i64,
}

impl PositionKeeper {
    pub fn new(max_tickers: usize) -> Self {
        PositionKeeper {
            positions: vec![PositionInfo::default(); max_tickers],
            total_realized_pnl: 0,
            total_unrealized_pnl: 0,
        }
    }

    pub fn position(&self, ticker_id: TickerId) -> Option<&PositionInfo> {
        self.positions.get(ticker_id as usize)
    }

    pub fn total_realized_pnl(&self) -> i64 {
        self.total_realized_pnl
    }

    pub fn total_unrealized_pnl(&self) -> i64 {
        self.total_unrealized_pnl
    }

    pub fn total_pnl(&self) -> i64 {
        self.total_realized_pnl + self.total_unrealized_pnl
    }

    /// Applies a fill: updates volume, value, average price, position, and
    /// realizes P&L on the closing (sell) side against the average buy price.
    pub fn on_fill(&mut self, ticker_id: TickerId, side: Side, filled_qty: u32, fill_price: Price) {
        let Some(pos) = self.positions.get_mut(ticker_id as usize) else {
            return;
        };
        let qty = i64::from(filled_qty);

        match side {
            Side::Buy => {
                pos.buy_volume += u64::from(filled_qty);
                pos.buy_value += qty * fill_price;
                pos.position += qty;
                if pos.buy_volume > 0 {
                    pos.avg_buy_price = pos.buy_value / pos.buy_volume as i64;
                }
            }
            Side::Sell => {
                pos.sell_volume += u64::from(filled_qty);
                pos.sell_value += qty * fill_price;
                pos.position -= qty;
                if pos.sell_volume > 0 {
                    pos.avg_sell_price = pos.sell_value / pos.sell_volume as i64;
                }
                if pos.avg_buy_price > 0 {
                    let realized = qty * (fill_price - pos.avg_buy_price);
                    pos.realized_pnl += realized;
                    self.total_realized_pnl += realized;
                }
            }
        }

        pos.last_price = fill_price;
        self.update_unrealized(ticker_id, fill_price);
    }

    /// Marks a fresh trade print against the ticker's last price, refreshing
    /// unrealized P&L without changing position.
    pub fn on_trade_print(&mut self, ticker_id: TickerId, price: Price) {
        if let Some(pos) = self.positions.get_mut(ticker_id as usize) {
            pos.last_price = price;
        }
        self.update_unrealized(ticker_id, price);
    }

    fn update_unrealized(&mut self, ticker_id: TickerId, market_price: Price) {
        let Some(pos) = self.positions.get_mut(ticker_id as usize) else {
            return;
        };
        if pos.position == 0 || market_price == PRICE_INVALID {
            return;
        }
        let avg_price = if pos.position > 0 { pos.avg_buy_price } else { pos.avg_sell_price };
        if avg_price <= 0 {
            return;
        }
        let unrealized = pos.position * (market_price - avg_price);
        let delta = unrealized - pos.unrealized_pnl;
        pos.unrealized_pnl = unrealized;
        self.total_unrealized_pnl += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_then_sell_realizes_pnl() {
        let mut keeper = PositionKeeper::new(4);
        keeper.on_fill(0, Side::Buy, 10, 100);
        assert_eq!(keeper.position(0).unwrap().position, 10);

        keeper.on_fill(0, Side::Sell, 10, 110);
        assert_eq!(keeper.position(0).unwrap().position, 0);
        assert_eq!(keeper.total_realized_pnl(), 100); // 10 * (110 - 100)
    }

    #[test]
    fn trade_print_marks_unrealized_pnl_without_moving_position() {
        let mut keeper = PositionKeeper::new(4);
        keeper.on_fill(0, Side::Buy, 10, 100);
        keeper.on_trade_print(0, 120);

        assert_eq!(keeper.position(0).unwrap().position, 10);
        assert_eq!(keeper.total_unrealized_pnl(), 200); // 10 * (120 - 100)
    }

    #[test]
    fn out_of_range_ticker_is_a_noop() {
        let mut keeper = PositionKeeper::new(2);
        keeper.on_fill(5, Side::Buy, 10, 100);
        assert!(keeper.position(5).is_none());
    }
}
