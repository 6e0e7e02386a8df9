//! Strategy injection point: the event loop is oblivious to policy, calling
//! back into whatever implements this trait. Grounded on
//! `original_source/trading/strategy/trade_engine.h`'s `MarketMaker`/
//! `LiquidityTaker` being opaque collaborators invoked from `onMarketUpdate`
//! / `onOrderResponse`.

use crate::engine::book::OrderBook;
use crate::engine::messages::{ClientResponse, MarketUpdate, Price, Qty, Side, TickerId};

/// An order the strategy wants the engine to attempt to send. The risk
/// predicate (see [`RiskCheck`]) is consulted before this ever reaches the
/// outbound queue.
#[derive(Debug, Clone, Copy)]
pub struct OrderIntent {
    pub ticker_id: TickerId,
    pub side: Side,
    pub price: Price,
    pub quantity: Qty,
}

/// Strategy callbacks invoked synchronously on the event-loop thread.
pub trait StrategyCallbacks {
    fn on_book_update(&mut self, ticker_id: TickerId, book: &OrderBook) -> Vec<OrderIntent> {
        let _ = (ticker_id, book);
        Vec::new()
    }

    fn on_trade(&mut self, ticker_id: TickerId, side: Side, price: Price, quantity: Qty) {
        let _ = (ticker_id, side, price, quantity);
    }

    fn on_order_response(&mut self, response: &ClientResponse) {
        let _ = response;
    }

    fn on_market_update(&mut self, update: &MarketUpdate) {
        let _ = update;
    }
}

/// The inline, I/O-free risk predicate consulted before every order intent
/// is turned into an outbound request. Grounded on `RiskManager::checkOrder`
/// being called synchronously inside `sendOrderRequest`, before enqueue.
pub trait RiskCheck {
    fn allow(&mut self, intent: &OrderIntent) -> bool;
}

impl<F: FnMut(&OrderIntent) -> bool> RiskCheck for F {
    fn allow(&mut self, intent: &OrderIntent) -> bool {
        self(intent)
    }
}
