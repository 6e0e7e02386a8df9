//! Asynchronous batching logger (spec §4.4), grounded on
//! `original_source/common/logging.cpp`: many producer threads enqueue
//! value-copied records into an MPMC queue; a single writer thread wakes on
//! the empty-to-nonempty transition, drains in batches, and writes them out.

mod record;
mod writer;

pub use record::{Level, LogRecord, MAX_MSG_LEN};

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::config::{LoggerConfig, MpmcConfig};
use crate::metrics::LoggerMetrics;
use crate::mpmc::Mpmc;
use writer::WriterShared;

/// A running logger: an MPMC queue feeding a dedicated writer thread.
///
/// Cloning shares the same underlying queue and writer (it is an `Arc`
/// handle); only [`Logger::init`]/[`Logger::shutdown`] touch the process-wide
/// global instance, everything else accepts a `&Logger`.
pub struct Logger {
    shared: Arc<WriterShared>,
    writer: Option<std::thread::JoinHandle<()>>,
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

impl Logger {
    /// Starts a new logger with its own writer thread.
    pub fn start(config: LoggerConfig) -> Self {
        let shared = Arc::new(WriterShared {
            queue: Mpmc::new(MpmcConfig::new(config.queue_capacity)),
            running: AtomicBool::new(true),
            was_empty: AtomicBool::new(true),
            cv: std::sync::Condvar::new(),
            cv_lock: std::sync::Mutex::new(()),
            metrics: crate::metrics::LoggerMetricsCell::new(),
        });
        let writer = writer::spawn(shared.clone(), config);
        Logger {
            shared,
            writer: Some(writer),
        }
    }

    /// Initializes the process-wide global logger. Subsequent calls are
    /// no-ops; only the first `init` in a process takes effect.
    pub fn init(config: LoggerConfig) -> &'static Logger {
        GLOBAL.get_or_init(|| Logger::start(config))
    }

    /// Returns the global logger if [`Logger::init`] has been called.
    pub fn global() -> Option<&'static Logger> {
        GLOBAL.get()
    }

    /// Enqueues a record. Drops (and counts the drop) if the queue is full;
    /// never blocks the caller.
    pub fn log(&self, level: Level, message: &str) {
        let record = LogRecord::new(level, current_thread_tag(), message);
        match self.shared.queue.enqueue(record) {
            Ok(()) => {
                if self.shared.was_empty.swap(false, Ordering::AcqRel) {
                    let _guard = self.shared.cv_lock.lock().unwrap();
                    self.shared.cv.notify_one();
                }
            }
            Err(_) => {
                self.shared.metrics.record_dropped();
            }
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }
    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }
    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }
    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
    pub fn fatal(&self, message: &str) {
        self.log(Level::Fatal, message);
    }

    pub fn metrics(&self) -> LoggerMetrics {
        self.shared.metrics.snapshot()
    }

    /// Signals the writer thread to drain and exit, then joins it.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        {
            let _guard = self.shared.cv_lock.lock().unwrap();
            self.shared.cv.notify_all();
        }
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.writer.is_some() {
            self.shutdown();
        }
    }
}

fn current_thread_tag() -> u64 {
    let id = std::thread::current().id();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_written_or_dropped_account_for_every_call() {
        let tmp = std::env::temp_dir().join(format!(
            "trade-core-logger-test-{}.log",
            std::process::id()
        ));
        let config = LoggerConfig::new(&tmp).with_queue_capacity(4096);
        let mut logger = Logger::start(config);

        const CALLS: usize = 20_000;
        for i in 0..CALLS {
            logger.log(Level::Info, &format!("message {i}"));
        }
        logger.shutdown();

        let metrics = logger.metrics();
        assert_eq!(metrics.messages_written + metrics.messages_dropped, CALLS as u64);
        let _ = std::fs::remove_file(&tmp);
    }

    #[test]
    fn unopenable_path_drops_everything_without_panicking() {
        let bogus = std::path::PathBuf::from("/nonexistent-dir-for-test/trade-core.log");
        let config = LoggerConfig::new(bogus).with_queue_capacity(64);
        let mut logger = Logger::start(config);
        for _ in 0..10 {
            logger.log(Level::Error, "should be dropped, not panic");
        }
        logger.shutdown();
        let metrics = logger.metrics();
        assert_eq!(metrics.messages_dropped, 10);
    }

    #[test]
    fn tid_tag_is_stable_within_a_thread() {
        let a = current_thread_tag();
        let b = current_thread_tag();
        assert_eq!(a, b);
    }
}
