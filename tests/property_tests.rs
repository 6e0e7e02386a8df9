//! Property-based tests for the invariants listed in the spec's Testable
//! Properties section, in the style of
//! `debasishg-ringmpsc-rs/crates/ringmpsc/tests/property_tests.rs`: bounded
//! count, monotonic progress, happens-before ordering, and pool accounting.

use proptest::prelude::*;

use trade_core::config::{MpmcConfig, PoolConfig, SpscConfig};
use trade_core::{Mpmc, Pool, Spsc};

// Bounded count: an SPSC ring never reports more items live than its
// capacity, regardless of the write/read interleaving.
proptest! {
    #[test]
    fn prop_spsc_bounded_count(
        ops in prop::collection::vec(prop::bool::ANY, 1..200),
    ) {
        let queue: Spsc<u64> = Spsc::new(SpscConfig::new(64));
        let capacity = queue.capacity();
        let mut produced = 0u64;
        let mut consumed = 0u64;

        for write_op in ops {
            if write_op {
                if queue.push(produced).is_ok() {
                    produced += 1;
                }
            } else if queue.pop().is_some() {
                consumed += 1;
            }
            prop_assert!(queue.len() <= capacity,
                "bounded count violated: len {} > capacity {}", queue.len(), capacity);
        }

        prop_assert!(consumed <= produced);
    }
}

// Happens-before: nothing is ever read out of an SPSC that was not first
// written, and the values recovered are exactly the ones written, in order.
proptest! {
    #[test]
    fn prop_spsc_happens_before(
        writes in 0usize..64,
    ) {
        let queue: Spsc<u64> = Spsc::new(SpscConfig::new(64));
        let mut produced = 0usize;
        for i in 0..writes {
            if queue.push(i as u64).is_ok() {
                produced += 1;
            }
        }

        let mut consumed = 0usize;
        let mut expected = 0u64;
        while let Some(v) = queue.pop() {
            prop_assert_eq!(v, expected, "happens-before violated: out-of-order value");
            expected += 1;
            consumed += 1;
        }

        prop_assert!(consumed <= produced);
        prop_assert_eq!(queue.pop(), None);
    }
}

// Monotonic progress: the running produced/consumed tally never lets
// consumed exceed produced, and the queue reports empty exactly when it
// has none outstanding.
proptest! {
    #[test]
    fn prop_mpmc_monotonic_progress(
        ops in prop::collection::vec(prop::bool::ANY, 1..200),
    ) {
        let queue: Mpmc<u64> = Mpmc::new(MpmcConfig::new(64));
        let mut produced = 0u64;
        let mut consumed = 0u64;

        for write_op in ops {
            if write_op {
                if queue.enqueue(produced).is_ok() {
                    produced += 1;
                }
            } else if queue.dequeue().is_some() {
                consumed += 1;
            }
            prop_assert!(consumed <= produced);
        }

        if produced == consumed {
            prop_assert!(queue.is_empty());
        }
    }
}

// Pool accounting: allocated + free always equals total, and a pointer
// handed out is never reused until it has been released.
proptest! {
    #[test]
    fn prop_pool_accounting(
        ops in prop::collection::vec(prop::bool::ANY, 1..200),
    ) {
        let pool = Pool::new(PoolConfig::new(64, 16));
        let mut held = Vec::new();

        for acquire_op in ops {
            if acquire_op {
                if let Some(ptr) = pool.acquire() {
                    prop_assert!(!held.contains(&(ptr as usize)),
                        "pool handed out a still-live pointer");
                    held.push(ptr as usize);
                }
            } else if let Some(ptr) = held.pop() {
                pool.release(ptr as *mut u8);
            }

            prop_assert_eq!(
                pool.allocated_blocks() + pool.free_blocks(),
                pool.total_blocks()
            );
            prop_assert_eq!(pool.allocated_blocks(), held.len());
        }

        for ptr in held {
            pool.release(ptr as *mut u8);
        }
        prop_assert_eq!(pool.allocated_blocks(), 0);
    }
}
