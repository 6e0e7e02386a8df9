use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time snapshot of an SPSC/MPMC ring's counters. A "batch" is one
/// commit operation — for these single-slot rings that is always one
/// message, but it is tracked as its own counter (distinct from
/// `messages_sent`/`messages_received`) so the shape matches a ring that
/// commits in groups, per the teacher's `Ring::reserve`/`consume_batch`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RingMetrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub batches_sent: u64,
    pub batches_received: u64,
    pub reserve_spins: u64,
}

/// Atomics backing a [`RingMetrics`] snapshot. Relaxed throughout: these are
/// sampled for observability, never consulted for correctness.
#[derive(Debug, Default)]
pub struct RingMetricsCell {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    batches_sent: AtomicU64,
    batches_received: AtomicU64,
    reserve_spins: AtomicU64,
}

impl RingMetricsCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one committed send. Each call here is itself a batch of one.
    pub fn record_send(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one consumed message. Each call here is itself a batch of one.
    pub fn record_recv(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.batches_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spin(&self) {
        self.reserve_spins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RingMetrics {
        RingMetrics {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_received: self.batches_received.load(Ordering::Relaxed),
            reserve_spins: self.reserve_spins.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of a pool's block accounting.
#[derive(Debug, Default, Clone, Copy)]
pub struct PoolMetrics {
    pub allocated: u64,
    pub free: u64,
    pub total: u64,
}

/// Point-in-time snapshot of the logger's write/drop accounting.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggerMetrics {
    pub messages_written: u64,
    pub messages_dropped: u64,
    pub bytes_written: u64,
}

#[derive(Debug, Default)]
pub struct LoggerMetricsCell {
    messages_written: AtomicU64,
    messages_dropped: AtomicU64,
    bytes_written: AtomicU64,
}

impl LoggerMetricsCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_written(&self, bytes: u64) {
        self.messages_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LoggerMetrics {
        LoggerMetrics {
            messages_written: self.messages_written.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}
