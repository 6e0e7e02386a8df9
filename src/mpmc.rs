//! Multi-producer, multi-consumer bounded ring queue (spec §4.2) using the
//! Vyukov ticket-ring algorithm, grounded on
//! `original_source/common/lf_queue.h`'s `MPMCLFQueue` and the queue
//! embedded in `original_source/common/logging.cpp`. Each cell carries its
//! own sequence number; producers and consumers race on `tail`/`head` via
//! CAS and settle ordering per-cell, so no global lock is ever held.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::backoff::Backoff;
use crate::config::MpmcConfig;
use crate::metrics::{RingMetrics, RingMetricsCell};

const MAX_CAPACITY: usize = 65_536;

struct Cell<T> {
    sequence: AtomicUsize,
    data: UnsafeCell<MaybeUninit<T>>,
}

fn round_up_pow2(n: usize) -> usize {
    n.max(2).next_power_of_two().min(MAX_CAPACITY)
}

/// A bounded multi-producer/multi-consumer queue. `capacity` is rounded up
/// to the next power of two, capped at 65,536.
pub struct Mpmc<T> {
    cells: Box<[CachePadded<Cell<T>>]>,
    mask: usize,
    enqueue_pos: CachePadded<AtomicUsize>,
    dequeue_pos: CachePadded<AtomicUsize>,
    metrics: RingMetricsCell,
}

unsafe impl<T: Send> Send for Mpmc<T> {}
unsafe impl<T: Send> Sync for Mpmc<T> {}

impl<T> Mpmc<T> {
    pub fn new(config: MpmcConfig) -> Self {
        let capacity = round_up_pow2(config.capacity);
        let cells: Vec<CachePadded<Cell<T>>> = (0..capacity)
            .map(|i| {
                CachePadded::new(Cell {
                    sequence: AtomicUsize::new(i),
                    data: UnsafeCell::new(MaybeUninit::uninit()),
                })
            })
            .collect();
        Mpmc {
            cells: cells.into_boxed_slice(),
            mask: capacity - 1,
            enqueue_pos: CachePadded::new(AtomicUsize::new(0)),
            dequeue_pos: CachePadded::new(AtomicUsize::new(0)),
            metrics: RingMetricsCell::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    pub fn is_empty(&self) -> bool {
        let head = self.dequeue_pos.load(Ordering::Acquire);
        let cell = &self.cells[head & self.mask];
        let seq = cell.sequence.load(Ordering::Acquire);
        seq != head.wrapping_add(1)
    }

    /// Enqueues `value`, returning it back if the queue is full.
    pub fn enqueue(&self, mut value: T) -> Result<(), T> {
        let mut backoff = Backoff::new();
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let cell = &self.cells[pos & self.mask];
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;
            if diff == 0 {
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe {
                            (*cell.data.get()).write(value);
                        }
                        cell.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        self.metrics.record_send();
                        return Ok(());
                    }
                    Err(current) => {
                        pos = current;
                        backoff.spin();
                        self.metrics.record_spin();
                    }
                }
            } else if diff < 0 {
                return Err(value);
            } else {
                pos = self.enqueue_pos.load(Ordering::Relaxed);
                backoff.spin();
                // value is unchanged; loop and retry with the fresh position.
                let _ = &mut value;
            }
        }
    }

    /// Dequeues the next value, or `None` if empty.
    pub fn dequeue(&self) -> Option<T> {
        let mut backoff = Backoff::new();
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let cell = &self.cells[pos & self.mask];
            let seq = cell.sequence.load(Ordering::Acquire);
            let diff = seq as isize - (pos.wrapping_add(1)) as isize;
            if diff == 0 {
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { (*cell.data.get()).assume_init_read() };
                        cell.sequence
                            .store(pos.wrapping_add(self.capacity()), Ordering::Release);
                        self.metrics.record_recv();
                        return Some(value);
                    }
                    Err(current) => {
                        pos = current;
                        backoff.spin();
                        self.metrics.record_spin();
                    }
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
                backoff.spin();
            }
        }
    }

    pub fn metrics(&self) -> RingMetrics {
        self.metrics.snapshot()
    }
}

impl<T> Drop for Mpmc<T> {
    fn drop(&mut self) {
        while self.dequeue().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn rounds_capacity_up_to_power_of_two() {
        let q: Mpmc<u32> = Mpmc::new(MpmcConfig::new(10));
        assert_eq!(q.capacity(), 16);
    }

    #[test]
    fn single_thread_roundtrip() {
        let q: Mpmc<u32> = Mpmc::new(MpmcConfig::new(8));
        for i in 0..8 {
            q.enqueue(i).unwrap();
        }
        assert!(q.enqueue(999).is_err());
        for i in 0..8 {
            assert_eq!(q.dequeue(), Some(i));
        }
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn stress_multiset_preserved_across_producers_and_consumers() {
        use std::sync::atomic::AtomicBool;

        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: usize = 10_000;

        let q: Arc<Mpmc<(usize, usize)>> = Arc::new(Mpmc::new(MpmcConfig::new(1024)));
        let producing_done = Arc::new(AtomicBool::new(false));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let q = q.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut v = (p, i);
                        loop {
                            match q.enqueue(v) {
                                Ok(()) => break,
                                Err(back) => v = back,
                            }
                        }
                    }
                })
            })
            .collect();

        let collected = Arc::new(std::sync::Mutex::new(Vec::new()));
        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let q = q.clone();
                let collected = collected.clone();
                let producing_done = producing_done.clone();
                thread::spawn(move || loop {
                    match q.dequeue() {
                        Some(v) => collected.lock().unwrap().push(v),
                        None => {
                            if producing_done.load(Ordering::Acquire) && q.is_empty() {
                                break;
                            }
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        producing_done.store(true, Ordering::Release);
        for c in consumers {
            c.join().unwrap();
        }

        let collected = collected.lock().unwrap();
        assert_eq!(collected.len(), PRODUCERS * PER_PRODUCER);
        let set: HashSet<_> = collected.iter().copied().collect();
        assert_eq!(set.len(), PRODUCERS * PER_PRODUCER, "no item popped twice");
    }
}
