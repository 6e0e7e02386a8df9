//! Wire-level message types for the event loop's three queues, grounded on
//! `original_source/trading/strategy/trade_engine.h`'s `ClientRequest`,
//! `ClientResponse`, and `MarketUpdate`.

pub type TickerId = u32;
pub type ClientId = u32;
pub type OrderId = u64;
pub type Price = i64;
pub type Qty = u32;

pub const TICKER_ID_INVALID: TickerId = TickerId::MAX;
pub const ORDER_ID_INVALID: OrderId = OrderId::MAX;
pub const PRICE_INVALID: Price = Price::MAX;

/// A raw pointer into a pool arena, passed through an SPSC between the
/// thread that populated the block and the thread that consumes it. Raw
/// pointers are `!Send` by default; this wrapper asserts the hand-off is
/// safe because the pool + queue protocol gives the receiver exclusive
/// access once the pointer is read off the queue, matching how the
/// original implementation moves `ClientRequest*`/`MarketUpdate*` between
/// threads.
#[derive(Debug)]
pub struct QueuePtr<T>(pub *mut T);

unsafe impl<T> Send for QueuePtr<T> {}

impl<T> Clone for QueuePtr<T> {
    fn clone(&self) -> Self {
        QueuePtr(self.0)
    }
}
impl<T> Copy for QueuePtr<T> {}

impl<T> QueuePtr<T> {
    pub fn new(ptr: *mut T) -> Self {
        QueuePtr(ptr)
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    pub fn as_ptr(self) -> *mut T {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRequestType {
    NewOrder,
    CancelOrder,
    ModifyOrder,
}

#[derive(Debug, Clone, Copy)]
pub struct ClientRequest {
    pub kind: ClientRequestType,
    pub client_id: ClientId,
    pub ticker_id: TickerId,
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Qty,
    pub timestamp_ns: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientResponseType {
    Ack,
    Fill,
    Cancel,
    Reject,
}

#[derive(Debug, Clone, Copy)]
pub struct ClientResponse {
    pub kind: ClientResponseType,
    pub client_id: ClientId,
    pub ticker_id: TickerId,
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Qty,
    pub leaves_qty: Qty,
    pub timestamp_ns: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketUpdateType {
    Trade,
    BidUpdate,
    AskUpdate,
}

#[derive(Debug, Clone, Copy)]
pub struct MarketUpdate {
    pub kind: MarketUpdateType,
    pub ticker_id: TickerId,
    pub price: Price,
    pub quantity: Qty,
    pub side: Side,
    pub timestamp_ns: u64,
}
