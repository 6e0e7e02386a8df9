//! Fixed-capacity order lifecycle tracking, grounded on the `OrderManager`
//! referenced in `original_source/trading/strategy/trade_engine.h`.

use std::collections::HashMap;

use crate::engine::messages::{OrderId, Qty, TickerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    PendingNew,
    Live,
    PendingCancel,
    PendingModify,
    Filled,
    Canceled,
    Rejected,
}

impl OrderState {
    /// Terminal states release the order table slot.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Filled | OrderState::Canceled | OrderState::Rejected)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrderSlot {
    pub ticker_id: TickerId,
    pub state: OrderState,
    pub leaves_qty: Qty,
}

/// A bounded map from `(ticker_id, order_id)` to live order state. Capacity
/// is enforced by the caller via `max_orders`; insertion beyond it fails
/// rather than growing, matching the fixed-capacity policy of the other
/// core components.
pub struct OrderTable {
    max_orders: usize,
    slots: HashMap<OrderId, OrderSlot>,
}

impl OrderTable {
    pub fn new(max_orders: usize) -> Self {
        OrderTable {
            max_orders,
            slots: HashMap::with_capacity(max_orders),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Inserts a new order in `PendingNew`. Fails (returns `false`) if the
    /// table is at capacity.
    pub fn insert_pending(&mut self, order_id: OrderId, ticker_id: TickerId, qty: Qty) -> bool {
        if self.slots.len() >= self.max_orders {
            return false;
        }
        self.slots.insert(
            order_id,
            OrderSlot {
                ticker_id,
                state: OrderState::PendingNew,
                leaves_qty: qty,
            },
        );
        true
    }

    pub fn get(&self, order_id: OrderId) -> Option<&OrderSlot> {
        self.slots.get(&order_id)
    }

    /// Transitions `order_id` to `state`; releases the slot if `state` is
    /// terminal. No-op if the order isn't tracked.
    pub fn transition(&mut self, order_id: OrderId, state: OrderState, leaves_qty: Qty) {
        if state.is_terminal() {
            self.slots.remove(&order_id);
            return;
        }
        if let Some(slot) = self.slots.get_mut(&order_id) {
            slot.state = state;
            slot.leaves_qty = leaves_qty;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_transition_releases_slot() {
        let mut table = OrderTable::new(4);
        assert!(table.insert_pending(1, 0, 100));
        assert_eq!(table.len(), 1);
        table.transition(1, OrderState::Filled, 0);
        assert_eq!(table.len(), 0);
        assert!(table.get(1).is_none());
    }

    #[test]
    fn insert_rejected_past_capacity() {
        let mut table = OrderTable::new(1);
        assert!(table.insert_pending(1, 0, 10));
        assert!(!table.insert_pending(2, 0, 10));
    }
}
