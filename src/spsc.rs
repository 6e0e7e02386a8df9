//! Single-producer, single-consumer bounded ring queue (spec §4.1), grounded
//! on `original_source/common/lf_queue.h`'s `SPSCLFQueue`: a fixed-capacity
//! power-of-two ring with a separate `count` atomic disambiguating full from
//! empty, each hot index on its own cache line to avoid false sharing
//! between the producer and consumer threads.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::config::SpscConfig;
use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_monotonic,
};
use crate::metrics::{RingMetrics, RingMetricsCell};

struct Slot<T>(UnsafeCell<MaybeUninit<T>>);

unsafe impl<T: Send> Sync for Slot<T> {}

/// A bounded single-producer/single-consumer queue over fixed-size `T`.
///
/// The producer only ever calls [`Spsc::try_write_slot`]/[`Spsc::commit_write`];
/// the consumer only ever calls [`Spsc::try_read_slot`]/[`Spsc::commit_read`].
/// Calling producer methods from more than one thread, or consumer methods
/// from more than one thread, is a logic error the type does not guard
/// against (matching the original's single-writer/single-reader contract).
pub struct Spsc<T> {
    cells: Box<[Slot<T>]>,
    mask: usize,
    write_idx: CachePadded<AtomicUsize>,
    read_idx: CachePadded<AtomicUsize>,
    count: CachePadded<AtomicUsize>,
    metrics: RingMetricsCell,
}

unsafe impl<T: Send> Send for Spsc<T> {}
unsafe impl<T: Send> Sync for Spsc<T> {}

impl<T> Spsc<T> {
    pub fn new(config: SpscConfig) -> Self {
        let capacity = config.capacity;
        let mut cells = Vec::with_capacity(capacity);
        cells.resize_with(capacity, || Slot(UnsafeCell::new(MaybeUninit::uninit())));
        Spsc {
            cells: cells.into_boxed_slice(),
            mask: capacity - 1,
            write_idx: CachePadded::new(AtomicUsize::new(0)),
            read_idx: CachePadded::new(AtomicUsize::new(0)),
            count: CachePadded::new(AtomicUsize::new(0)),
            metrics: RingMetricsCell::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Returns a handle to the next slot to populate, or `None` if the queue
    /// is full. The producer must follow with [`Spsc::commit_write`] after
    /// initializing the returned slot.
    pub fn try_write_slot(&self) -> Option<WriteSlot<'_, T>> {
        if self.count.load(Ordering::Acquire) == self.capacity() {
            return None;
        }
        let write = self.write_idx.load(Ordering::Relaxed);
        let cell = &self.cells[write & self.mask];
        Some(WriteSlot { queue: self, cell })
    }

    /// Writes `value` into the next slot, returning it back on a full queue.
    pub fn push(&self, value: T) -> Result<(), T> {
        match self.try_write_slot() {
            Some(slot) => {
                slot.write(value);
                Ok(())
            }
            None => Err(value),
        }
    }

    fn commit_write(&self) {
        let write = self.write_idx.load(Ordering::Relaxed);
        let next = write.wrapping_add(1);
        debug_assert_monotonic!(write, next);
        self.write_idx.store(next, Ordering::Release);
        self.count.fetch_add(1, Ordering::Release);
        self.metrics.record_send();
    }

    /// Returns a handle to the next slot to consume, or `None` if the queue
    /// is empty. The consumer must follow with [`Spsc::commit_read`] after
    /// reading (and the handle's `Drop` takes care of dropping the value).
    pub fn try_read_slot(&self) -> Option<ReadSlot<'_, T>> {
        if self.count.load(Ordering::Acquire) == 0 {
            return None;
        }
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        debug_assert_head_not_past_tail!(read, write);
        let cell = &self.cells[read & self.mask];
        Some(ReadSlot { queue: self, cell, taken: false })
    }

    /// Pops the next value, or `None` if empty.
    pub fn pop(&self) -> Option<T> {
        let mut slot = self.try_read_slot()?;
        Some(slot.take())
    }

    fn commit_read(&self) {
        let read = self.read_idx.load(Ordering::Relaxed);
        let next = read.wrapping_add(1);
        self.read_idx.store(next, Ordering::Release);
        self.count.fetch_sub(1, Ordering::Release);
        self.metrics.record_recv();
        debug_assert_bounded_count!(self.count.load(Ordering::Relaxed), self.capacity());
    }

    pub fn metrics(&self) -> RingMetrics {
        self.metrics.snapshot()
    }
}

/// A reserved write slot; drop without calling [`WriteSlot::write`] to
/// abandon the reservation (nothing was published, no index moved).
pub struct WriteSlot<'a, T> {
    queue: &'a Spsc<T>,
    cell: &'a Slot<T>,
}

impl<'a, T> WriteSlot<'a, T> {
    /// Initializes the slot and publishes it (advances the write index).
    pub fn write(self, value: T) {
        unsafe {
            (*self.cell.0.get()).write(value);
        }
        self.queue.commit_write();
    }
}

/// A reserved read slot; the held value is dropped when the slot is dropped
/// without being [`ReadSlot::take`]n, and the read index is always advanced.
pub struct ReadSlot<'a, T> {
    queue: &'a Spsc<T>,
    cell: &'a Slot<T>,
    taken: bool,
}

impl<'a, T> ReadSlot<'a, T> {
    /// Returns a reference to the slot's value without consuming it.
    pub fn get(&self) -> &T {
        unsafe { (*self.cell.0.get()).assume_init_ref() }
    }

    /// Moves the value out of the slot.
    pub fn take(&mut self) -> T {
        self.taken = true;
        unsafe { (*self.cell.0.get()).assume_init_read() }
    }
}

impl<'a, T> Drop for ReadSlot<'a, T> {
    fn drop(&mut self) {
        if !self.taken {
            unsafe {
                (*self.cell.0.get()).assume_init_drop();
            }
        }
        self.queue.commit_read();
    }
}

impl<T> Drop for Spsc<T> {
    fn drop(&mut self) {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Relaxed);
        let mut idx = read;
        while idx != write {
            let cell = &self.cells[idx & self.mask];
            unsafe {
                (*cell.0.get()).assume_init_drop();
            }
            idx = idx.wrapping_add(1);
        }
    }
}
