//! Fixed-capacity typed memory pool (spec §4.3), grounded on
//! `original_source/common/mem_pool.h`: a struct-of-arrays layout (headers
//! separate from payloads), a singly-linked free list of block indices
//! guarded by one spinlock, and idempotent release via a per-block
//! state CAS so a double-release never corrupts the free list.

use std::alloc::{alloc, dealloc, Layout};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::backoff::Backoff;
use crate::config::PoolConfig;
use crate::invariants::debug_assert_valid_ptr_range;
use crate::metrics::PoolMetrics;

const CACHE_LINE: usize = 64;
const FREE: u8 = 0;
const IN_USE: u8 = 1;
const SENTINEL: u32 = u32::MAX;

/// When to zero a block's payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroPolicy {
    /// Never zero; caller reads whatever was previously written there.
    None,
    /// Zero the block before handing it back from `acquire`.
    OnAcquire,
    /// Zero the block right before it is returned to the free list.
    OnRelease,
}

struct Header {
    state: CachePadded<AtomicU8>,
    next_free: AtomicU32,
}

fn aligned_block_size(block_size: usize) -> usize {
    (block_size + CACHE_LINE - 1) / CACHE_LINE * CACHE_LINE
}

/// A fixed-capacity pool of `num_blocks` blocks of `block_size` bytes each.
///
/// Acquire/release are O(1) and touch only a spinlock-guarded free-list
/// pointer swing plus one header CAS; neither allocates.
pub struct Pool {
    headers: Box<[Header]>,
    payloads: *mut u8,
    payload_layout: Layout,
    block_size: usize,
    aligned_block_size: usize,
    num_blocks: usize,
    free_head: AtomicU32,
    lock: AtomicBool,
    allocated: CachePadded<AtomicUsize>,
    zero_policy: ZeroPolicy,
}

unsafe impl Send for Pool {}
unsafe impl Sync for Pool {}

impl Pool {
    pub fn new(config: PoolConfig) -> Self {
        let aligned = aligned_block_size(config.block_size);
        let total_bytes = aligned * config.num_blocks;
        let payload_layout = Layout::from_size_align(total_bytes.max(1), CACHE_LINE).unwrap();
        let payloads = unsafe { alloc(payload_layout) };
        assert!(!payloads.is_null(), "pool arena allocation failed");

        #[cfg(feature = "numa")]
        if let Some(node) = config.numa_node {
            apply_numa_hint(payloads, total_bytes, node);
        }

        let headers: Vec<Header> = (0..config.num_blocks)
            .map(|i| Header {
                state: CachePadded::new(AtomicU8::new(FREE)),
                next_free: AtomicU32::new(if i + 1 < config.num_blocks {
                    (i + 1) as u32
                } else {
                    SENTINEL
                }),
            })
            .collect();

        Pool {
            headers: headers.into_boxed_slice(),
            payloads,
            payload_layout,
            block_size: config.block_size,
            aligned_block_size: aligned,
            num_blocks: config.num_blocks,
            free_head: AtomicU32::new(if config.num_blocks > 0 { 0 } else { SENTINEL }),
            lock: AtomicBool::new(false),
            allocated: CachePadded::new(AtomicUsize::new(0)),
            zero_policy: config.zero_policy,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn total_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn allocated_blocks(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn free_blocks(&self) -> usize {
        self.num_blocks - self.allocated_blocks()
    }

    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            allocated: self.allocated_blocks() as u64,
            free: self.free_blocks() as u64,
            total: self.num_blocks as u64,
        }
    }

    fn lock_free_list(&self) -> FreeListGuard<'_> {
        let mut backoff = Backoff::new();
        loop {
            if self
                .lock
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return FreeListGuard { pool: self };
            }
            if backoff.is_completed() {
                std::thread::yield_now();
            } else {
                backoff.spin();
            }
        }
    }

    fn index_to_ptr(&self, idx: u32) -> *mut u8 {
        unsafe { self.payloads.add(idx as usize * self.aligned_block_size) }
    }

    fn ptr_to_index(&self, ptr: *const u8) -> Option<u32> {
        let base = self.payloads as usize;
        let addr = ptr as usize;
        if addr < base {
            return None;
        }
        let offset = addr - base;
        if offset % self.aligned_block_size != 0 {
            return None;
        }
        let idx = offset / self.aligned_block_size;
        if idx >= self.num_blocks {
            return None;
        }
        Some(idx as u32)
    }

    /// Pops a free block, returning a null-equivalent `None` if the pool is
    /// exhausted.
    pub fn acquire(&self) -> Option<*mut u8> {
        let idx = {
            let _guard = self.lock_free_list();
            let head = self.free_head.load(Ordering::Relaxed);
            if head == SENTINEL {
                return None;
            }
            let next = self.headers[head as usize].next_free.load(Ordering::Relaxed);
            self.free_head.store(next, Ordering::Relaxed);
            head
        };
        self.headers[idx as usize].state.store(IN_USE, Ordering::Release);
        self.allocated.fetch_add(1, Ordering::Relaxed);
        let ptr = self.index_to_ptr(idx);
        if self.zero_policy == ZeroPolicy::OnAcquire {
            unsafe { std::ptr::write_bytes(ptr, 0, self.block_size) };
        }
        Some(ptr)
    }

    /// Returns `block` to the pool. A null pointer, a misaligned pointer, a
    /// pointer outside the arena, or a pointer already released is a silent
    /// no-op — releases are idempotent by construction.
    pub fn release(&self, block: *mut u8) {
        if block.is_null() {
            return;
        }
        let Some(idx) = self.ptr_to_index(block) else {
            return;
        };
        debug_assert_valid_ptr_range!(block, self.payloads, self.payload_layout.size());

        let header = &self.headers[idx as usize];
        if header
            .state
            .compare_exchange(IN_USE, FREE, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            // Already free: idempotent double-release, no-op.
            return;
        }

        if self.zero_policy == ZeroPolicy::OnRelease {
            unsafe { std::ptr::write_bytes(block, 0, self.block_size) };
        }

        {
            let _guard = self.lock_free_list();
            let old_head = self.free_head.load(Ordering::Relaxed);
            header.next_free.store(old_head, Ordering::Relaxed);
            self.free_head.store(idx, Ordering::Relaxed);
        }
        // Defensive: never underflow if release races ahead of bookkeeping.
        self.allocated
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)))
            .ok();
    }

    /// Acquires `n` blocks, stopping early if the pool runs out. Atomically
    /// correct per block but not transactional across the whole batch.
    pub fn acquire_bulk(&self, out: &mut Vec<*mut u8>, n: usize) -> usize {
        let mut acquired = 0;
        for _ in 0..n {
            match self.acquire() {
                Some(ptr) => {
                    out.push(ptr);
                    acquired += 1;
                }
                None => break,
            }
        }
        acquired
    }

    /// Releases every pointer in `blocks`. Atomically correct per block but
    /// not transactional across the whole batch.
    pub fn release_bulk(&self, blocks: &[*mut u8]) {
        for &ptr in blocks {
            self.release(ptr);
        }
    }
}

struct FreeListGuard<'a> {
    pool: &'a Pool,
}

impl<'a> Drop for FreeListGuard<'a> {
    fn drop(&mut self) {
        self.pool.lock.store(false, Ordering::Release);
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if self.payload_layout.size() > 0 {
            unsafe { dealloc(self.payloads, self.payload_layout) };
        }
    }
}

#[cfg(all(feature = "numa", target_os = "linux"))]
fn apply_numa_hint(ptr: *mut u8, len: usize, node: u32) {
    const MPOL_BIND: libc::c_int = 2;
    let mut nodemask: u64 = 1u64 << (node as u64);
    unsafe {
        libc::syscall(
            libc::SYS_mbind,
            ptr as *mut libc::c_void,
            len,
            MPOL_BIND,
            &mut nodemask as *mut u64,
            64u64,
            0u32,
        );
    }
}

#[cfg(all(feature = "numa", not(target_os = "linux")))]
fn apply_numa_hint(_ptr: *mut u8, _len: usize, _node: u32) {
    // No NUMA placement support outside Linux; acquire proceeds unplaced.
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquire_release_returns_to_original_count() {
        let pool = Pool::new(PoolConfig::new(64, 3));
        assert_eq!(pool.free_blocks(), 3);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(pool.allocated_blocks(), 2);
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.allocated_blocks(), 0);
        assert_eq!(pool.free_blocks(), 3);
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let pool = Pool::new(PoolConfig::new(64, 2));
        let _a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn double_release_is_idempotent() {
        let pool = Pool::new(PoolConfig::new(64, 3));
        let a = pool.acquire().unwrap();
        pool.release(a);
        let after_first = pool.allocated_blocks();
        pool.release(a);
        assert_eq!(pool.allocated_blocks(), after_first);
    }

    #[test]
    fn out_of_range_release_is_noop() {
        let pool = Pool::new(PoolConfig::new(64, 3));
        let mut bogus = [0u8; 8];
        pool.release(bogus.as_mut_ptr());
        pool.release(std::ptr::null_mut());
        assert_eq!(pool.allocated_blocks(), 0);
    }

    #[test]
    fn zero_on_acquire_clears_payload() {
        let pool = Pool::new(PoolConfig::new(64, 1).with_zero_policy(ZeroPolicy::OnAcquire));
        let ptr = pool.acquire().unwrap();
        unsafe {
            let slice = std::slice::from_raw_parts(ptr, 64);
            assert!(slice.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn concurrent_acquire_release_never_double_hands_out_a_pointer() {
        const THREADS: usize = 8;
        const ITERS: usize = 1000;

        let pool = Arc::new(Pool::new(PoolConfig::new(64, 64)));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || {
                    let mut seen = HashSet::new();
                    for _ in 0..ITERS {
                        if let Some(ptr) = pool.acquire() {
                            assert!(seen.insert(ptr as usize), "pointer handed out twice while live");
                            pool.release(ptr);
                            seen.remove(&(ptr as usize));
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.allocated_blocks() + pool.free_blocks(), pool.total_blocks());
        assert_eq!(pool.allocated_blocks(), 0);
    }
}
