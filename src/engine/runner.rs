//! The pinned, single-threaded trade-engine event loop (spec §4.5),
//! grounded on `original_source/trading/strategy/trade_engine.cpp`'s
//! `run()`/`sendOrderRequest()`/`onMarketUpdate()`/`onOrderResponse()`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::book::OrderBook;
use crate::engine::messages::{
    ClientRequest, ClientRequestType, ClientResponse, ClientResponseType, MarketUpdate,
    MarketUpdateType, OrderId, QueuePtr, TickerId,
};
use crate::engine::order_table::{OrderState, OrderTable};
use crate::engine::position::PositionKeeper;
use crate::engine::strategy::{OrderIntent, RiskCheck, StrategyCallbacks};
use crate::pool::Pool;
use crate::spsc::Spsc;
use crate::thread_pin::pin_current_thread_to;

/// Error returned when an order intent cannot be sent.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("order rejected by risk check")]
    RiskRejected,
    #[error("outbound request queue is full")]
    OutboundFull,
    #[error("request pool exhausted")]
    PoolExhausted,
}

/// Queues and pool the event loop drains/publishes to. Constructed once at
/// startup and shared with the adapters that sit on the other end.
pub struct EngineChannels {
    pub market_updates_in: Arc<Spsc<QueuePtr<MarketUpdate>>>,
    pub responses_in: Arc<Spsc<QueuePtr<ClientResponse>>>,
    pub requests_out: Arc<Spsc<QueuePtr<ClientRequest>>>,
    /// Pool the event loop acquires from when it emits a new `ClientRequest`.
    pub request_pool: Arc<Pool>,
    /// Pool the upstream feed handler allocated `MarketUpdate` blocks from;
    /// the event loop releases each block back here once dispatched.
    pub update_pool: Arc<Pool>,
    /// Pool the upstream gateway allocated `ClientResponse` blocks from;
    /// the event loop releases each block back here once dispatched.
    pub response_pool: Arc<Pool>,
}

pub struct EventLoop<S, R> {
    config: EngineConfig,
    channels: EngineChannels,
    order_books: Vec<OrderBook>,
    order_table: OrderTable,
    position_keeper: PositionKeeper,
    strategy: S,
    risk: R,
    client_id: u32,
    next_order_id: AtomicU64,
    running: Arc<AtomicBool>,
    messages_processed: Arc<AtomicU64>,
    orders_sent: Arc<AtomicU64>,
    last_event_time_ns: Arc<AtomicU64>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl<S, R> EventLoop<S, R>
where
    S: StrategyCallbacks + Send + 'static,
    R: RiskCheck + Send + 'static,
{
    pub fn new(client_id: u32, config: EngineConfig, channels: EngineChannels, strategy: S, risk: R) -> Self {
        let order_books = (0..config.max_tickers)
            .map(|_| OrderBook::new(config.max_levels))
            .collect();
        EventLoop {
            config,
            channels,
            order_books,
            order_table: OrderTable::new(100_000),
            position_keeper: PositionKeeper::new(config.max_tickers),
            strategy,
            risk,
            client_id,
            next_order_id: AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(false)),
            messages_processed: Arc::new(AtomicU64::new(0)),
            orders_sent: Arc::new(AtomicU64::new(0)),
            last_event_time_ns: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    pub fn orders_sent(&self) -> u64 {
        self.orders_sent.load(Ordering::Relaxed)
    }

    /// Runs one drain-and-dispatch iteration; returns `true` if any message
    /// was processed (the caller issues a CPU pause when it returns `false`).
    pub fn step(&mut self) -> bool {
        let mut processed = false;

        for _ in 0..self.config.k_market {
            let Some(mut slot) = self.channels.market_updates_in.try_read_slot() else {
                break;
            };
            let ptr = slot.take();
            drop(slot);
            self.on_market_update(ptr);
            processed = true;
        }

        for _ in 0..self.config.k_response {
            let Some(mut slot) = self.channels.responses_in.try_read_slot() else {
                break;
            };
            let ptr = slot.take();
            drop(slot);
            self.on_order_response(ptr);
            processed = true;
        }

        processed
    }

    fn on_market_update(&mut self, update_ptr: QueuePtr<MarketUpdate>) {
        if update_ptr.is_null() {
            return;
        }
        let raw = update_ptr.as_ptr();
        let update = unsafe { *raw };
        if (update.ticker_id as usize) >= self.order_books.len() {
            self.channels.update_pool.release(raw.cast());
            return;
        }

        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        self.last_event_time_ns.store(update.timestamp_ns, Ordering::Relaxed);

        {
            let book = &mut self.order_books[update.ticker_id as usize];
            match update.kind {
                MarketUpdateType::BidUpdate => book.update_bid(update.price, update.quantity, 1, 0),
                MarketUpdateType::AskUpdate => book.update_ask(update.price, update.quantity, 1, 0),
                MarketUpdateType::Trade => {}
            }
            book.update_timestamp(update.timestamp_ns);
        }

        if update.kind == MarketUpdateType::Trade {
            self.position_keeper.on_trade_print(update.ticker_id, update.price);
            self.strategy
                .on_trade(update.ticker_id, update.side, update.price, update.quantity);
        }

        self.strategy.on_market_update(&update);
        let intents = {
            let book = &self.order_books[update.ticker_id as usize];
            self.strategy.on_book_update(update.ticker_id, book)
        };

        for intent in intents {
            let _ = self.send_order(intent);
        }

        // The pointer is owned by the caller's pool (update_pool_ in the
        // original); the event loop's job ends at dispatch, not ownership.
        self.channels.update_pool.release(raw.cast());
    }

    fn on_order_response(&mut self, response_ptr: QueuePtr<ClientResponse>) {
        if response_ptr.is_null() {
            return;
        }
        let raw = response_ptr.as_ptr();
        let response = unsafe { *raw };
        self.messages_processed.fetch_add(1, Ordering::Relaxed);

        match response.kind {
            ClientResponseType::Ack => {
                self.order_table.transition(response.order_id, OrderState::Live, response.quantity);
            }
            ClientResponseType::Fill => {
                let state = if response.leaves_qty == 0 {
                    OrderState::Filled
                } else {
                    OrderState::Live
                };
                self.order_table.transition(response.order_id, state, response.leaves_qty);
                self.position_keeper.on_fill(
                    response.ticker_id,
                    response.side,
                    response.quantity,
                    response.price,
                );
            }
            ClientResponseType::Cancel => {
                self.order_table.transition(response.order_id, OrderState::Canceled, 0);
            }
            ClientResponseType::Reject => {
                self.order_table.transition(response.order_id, OrderState::Rejected, 0);
            }
        }

        self.strategy.on_order_response(&response);
        self.channels.response_pool.release(raw.cast());
    }

    /// Risk-checks `intent`; on pass, acquires a request block from the
    /// pool, fills it, and publishes it to the outbound queue. On any
    /// rejection the pointer never reaches the outbound queue.
    pub fn send_order(&mut self, intent: OrderIntent) -> Result<OrderId, EngineError> {
        if !self.risk.allow(&intent) {
            return Err(EngineError::RiskRejected);
        }

        let Some(block) = self.channels.request_pool.acquire() else {
            return Err(EngineError::PoolExhausted);
        };
        let request_ptr = block.cast::<ClientRequest>();
        // Client-assigned id, unique for the lifetime of this event loop; the
        // exchange echoes it back on every response so the order table can
        // key on it. Distinct from ORDER_ID_INVALID, which marks an
        // untracked, fire-and-forget request this event loop never sends.
        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        unsafe {
            request_ptr.write(ClientRequest {
                kind: ClientRequestType::NewOrder,
                client_id: self.client_id,
                ticker_id: intent.ticker_id,
                order_id,
                side: intent.side,
                price: intent.price,
                quantity: intent.quantity,
                timestamp_ns: now_ns(),
            });
        }

        match self.channels.requests_out.push(QueuePtr::new(request_ptr)) {
            Ok(()) => {
                self.orders_sent.fetch_add(1, Ordering::Relaxed);
                self.order_table.insert_pending(order_id, intent.ticker_id, intent.quantity);
                Ok(order_id)
            }
            Err(_) => {
                self.channels.request_pool.release(request_ptr.cast());
                Err(EngineError::OutboundFull)
            }
        }
    }

    pub fn order_table_len(&self) -> usize {
        self.order_table.len()
    }

    pub fn ticker_book(&self, ticker_id: TickerId) -> Option<&OrderBook> {
        self.order_books.get(ticker_id as usize)
    }

    pub fn position(&self, ticker_id: TickerId) -> Option<&crate::engine::position::PositionInfo> {
        self.position_keeper.position(ticker_id)
    }
}

impl<S, R> EventLoop<S, R>
where
    S: StrategyCallbacks + Send + 'static,
    R: RiskCheck + Send + 'static,
{
    /// Spawns the pinned engine thread and begins draining. Blocking `run`
    /// itself is not exposed; callers drive iterations through the spawned
    /// thread and observe progress via the atomics exposed on `self`.
    pub fn start(mut self) -> EngineHandle {
        self.running.store(true, Ordering::Release);
        let running = self.running.clone();
        let core = self.config.engine_core;
        let messages_processed = self.messages_processed.clone();

        let handle = std::thread::Builder::new()
            .name("trade-core-engine".into())
            .spawn(move || {
                if let Some(core) = core {
                    pin_current_thread_to(core);
                }
                while running.load(Ordering::Acquire) {
                    if !self.step() {
                        std::hint::spin_loop();
                    }
                }
            })
            .expect("failed to spawn trade engine thread");

        EngineHandle {
            running,
            handle: Some(handle),
            messages_processed,
        }
    }
}

/// Handle to a running [`EventLoop`] thread.
pub struct EngineHandle {
    running: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
    messages_processed: Arc<AtomicU64>,
}

impl EngineHandle {
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
