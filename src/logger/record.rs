//! Log record layout, grounded on `original_source/bldg_blocks/logging.h`'s
//! `LogEntry` and the `LogRecord` embedded in `original_source/common/logging.cpp`.

use std::time::{SystemTime, UNIX_EPOCH};

pub const MAX_MSG_LEN: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Fixed-width label, matching the original's column-aligned output.
    pub fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO ",
            Level::Warn => "WARN ",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

/// A value-copied, fixed-size log record. Enqueued into the logger's MPMC
/// queue with no pointer to caller memory surviving the call.
#[derive(Clone, Copy)]
pub struct LogRecord {
    pub timestamp_ns: u128,
    pub thread_id: u64,
    pub level: Level,
    pub len: u8,
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogRecord {
    /// Builds a record from `message`, capturing the timestamp at the call
    /// site (not when the writer thread eventually drains it) and
    /// truncating the message to `MAX_MSG_LEN` bytes.
    pub fn new(level: Level, thread_id: u64, message: &str) -> Self {
        let bytes = message.as_bytes();
        let len = bytes.len().min(MAX_MSG_LEN);
        let mut msg = [0u8; MAX_MSG_LEN];
        msg[..len].copy_from_slice(&bytes[..len]);
        LogRecord {
            timestamp_ns: now_ns(),
            thread_id,
            level,
            len: len as u8,
            msg,
        }
    }

    pub fn message(&self) -> &str {
        std::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<non-utf8>")
    }
}

fn now_ns() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_messages() {
        let long = "x".repeat(1000);
        let record = LogRecord::new(Level::Info, 1, &long);
        assert_eq!(record.len as usize, MAX_MSG_LEN);
        assert_eq!(record.message().len(), MAX_MSG_LEN);
    }

    #[test]
    fn label_widths_match() {
        for level in [Level::Debug, Level::Info, Level::Warn, Level::Error, Level::Fatal] {
            assert_eq!(level.label().len(), 5);
        }
    }
}
