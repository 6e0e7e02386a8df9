//! The trade-engine event loop (spec §4.5): a pinned single-threaded loop
//! draining market updates and order responses, updating per-symbol order
//! books, dispatching to injected strategy/risk policy, and publishing
//! orders through the shared ring/pool primitives.

pub mod book;
pub mod messages;
pub mod order_table;
pub mod position;
pub mod runner;
pub mod strategy;

pub use book::OrderBook;
pub use messages::{
    ClientRequest, ClientRequestType, ClientResponse, ClientResponseType, MarketUpdate,
    MarketUpdateType, OrderId, Price, QueuePtr, Qty, Side, TickerId,
};
pub use order_table::{OrderState, OrderTable};
pub use position::{PositionInfo, PositionKeeper};
pub use runner::{EngineChannels, EngineError, EngineHandle, EventLoop};
pub use strategy::{OrderIntent, RiskCheck, StrategyCallbacks};
