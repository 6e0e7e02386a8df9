//! The logger's dedicated writer thread: adaptive spin-then-wait, batched
//! drain, thread-id prefix memoization, and scatter/gather write. Grounded
//! on `original_source/common/logging.cpp`'s `writerLoop`.

use std::fs::File;
use std::io::{IoSlice, Write};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::config::LoggerConfig;
use crate::logger::record::LogRecord;
use crate::mpmc::Mpmc;
use crate::metrics::LoggerMetricsCell;
use crate::thread_pin::pin_current_thread_to;

const MAX_THREADS: usize = 256;

#[derive(Clone, Copy, Default)]
struct TidEntry {
    thread_id: u64,
    prefix_len: usize,
    prefix: [u8; 24],
}

pub(super) struct WriterShared {
    pub queue: Mpmc<LogRecord>,
    pub running: std::sync::atomic::AtomicBool,
    pub was_empty: std::sync::atomic::AtomicBool,
    pub cv: Condvar,
    pub cv_lock: Mutex<()>,
    pub metrics: LoggerMetricsCell,
}

pub(super) fn spawn(shared: Arc<WriterShared>, config: LoggerConfig) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("trade-core-logger".into())
        .spawn(move || writer_loop(&shared, &config))
        .expect("failed to spawn logger writer thread")
}

fn writer_loop(shared: &WriterShared, config: &LoggerConfig) {
    if let Some(core) = config.writer_core {
        pin_current_thread_to(core);
    }

    let mut file = File::create(&config.file_path).ok();
    if file.is_none() {
        // Non-fatal: the writer keeps draining and dropping so producers
        // never block on a logger that failed to open its file.
        eprintln!(
            "trade-core logger: failed to open {:?}, writes will be dropped",
            config.file_path
        );
    }

    let mut batch: Vec<LogRecord> = Vec::with_capacity(config.batch_size);
    let mut since_flush = 0usize;
    let mut last_flush = std::time::Instant::now();
    let mut tid_cache = [TidEntry::default(); MAX_THREADS];

    loop {
        let running = shared.running.load(Ordering::Acquire);
        if !running && shared.queue.is_empty() {
            break;
        }

        if shared.queue.is_empty() {
            adaptive_wait(shared, config.spin_count);
            continue;
        }

        batch.clear();
        while batch.len() < config.batch_size {
            match shared.queue.dequeue() {
                Some(record) => batch.push(record),
                None => break,
            }
        }

        if !batch.is_empty() {
            if let Some(f) = file.as_mut() {
                write_batch(f, &batch, &mut tid_cache, &shared.metrics);
            } else {
                for _ in &batch {
                    shared.metrics.record_dropped();
                }
            }
            since_flush += batch.len();
        }

        if shared.queue.is_empty() {
            shared.was_empty.store(true, Ordering::Release);
        }

        let elapsed = last_flush.elapsed().as_millis() as u64;
        if since_flush >= config.flush_batch_threshold || elapsed >= config.flush_interval_ms {
            if let Some(f) = file.as_mut() {
                let _ = f.flush();
            }
            since_flush = 0;
            last_flush = std::time::Instant::now();
        }
    }

    if let Some(mut f) = file {
        let _ = f.flush();
    }
}

fn adaptive_wait(shared: &WriterShared, spin_count: u32) {
    for _ in 0..spin_count {
        if !shared.queue.is_empty() {
            return;
        }
        std::hint::spin_loop();
    }
    let guard = shared.cv_lock.lock().unwrap();
    let _ = shared
        .cv
        .wait_timeout_while(guard, Duration::from_millis(1), |_| {
            shared.queue.is_empty() && shared.running.load(Ordering::Acquire)
        });
}

fn tid_prefix<'a>(cache: &'a mut [TidEntry; MAX_THREADS], thread_id: u64) -> &'a [u8] {
    let slot = (thread_id as usize) % MAX_THREADS;
    let entry = &mut cache[slot];
    if entry.thread_id != thread_id || entry.prefix_len == 0 {
        let mut buf = [0u8; 24];
        let mut cursor = std::io::Cursor::new(&mut buf[..]);
        let _ = write!(cursor, "T{}", thread_id);
        let written = cursor.position() as usize;
        entry.thread_id = thread_id;
        entry.prefix = buf;
        entry.prefix_len = written;
    }
    &cache[slot].prefix[..cache[slot].prefix_len]
}

fn write_batch(
    file: &mut File,
    batch: &[LogRecord],
    tid_cache: &mut [TidEntry; MAX_THREADS],
    metrics: &LoggerMetricsCell,
) {
    let mut lines: Vec<Vec<u8>> = Vec::with_capacity(batch.len());
    for record in batch {
        let prefix = tid_prefix(tid_cache, record.thread_id).to_vec();
        let secs = record.timestamp_ns / 1_000_000_000;
        let nanos = record.timestamp_ns % 1_000_000_000;
        let mut line = Vec::with_capacity(record.len as usize + 48);
        line.extend_from_slice(format!("[{}.{:09}]", secs, nanos).as_bytes());
        line.push(b'[');
        line.extend_from_slice(record.level.label().as_bytes());
        line.push(b']');
        line.push(b'[');
        line.extend_from_slice(&prefix);
        line.push(b']');
        line.push(b' ');
        line.extend_from_slice(&record.msg[..record.len as usize]);
        line.push(b'\n');
        lines.push(line);
    }

    let slices: Vec<IoSlice> = lines.iter().map(|l| IoSlice::new(l)).collect();
    let total_bytes: u64 = lines.iter().map(|l| l.len() as u64).sum();

    match file.write_vectored(&slices) {
        Ok(written) if written as u64 == total_bytes => {
            for line in &lines {
                metrics.record_written(line.len() as u64);
            }
        }
        _ => {
            // Scatter/gather write failed or was partial: fall back to a
            // sequential per-record write for this batch.
            for line in &lines {
                if file.write_all(line).is_ok() {
                    metrics.record_written(line.len() as u64);
                } else {
                    metrics.record_dropped();
                }
            }
        }
    }
}
