//! Construction-time configuration for every component. Values are read
//! once at construction; there is no live reconfiguration and no TOML/KV
//! loader — callers build these structs in code.

use crate::pool::ZeroPolicy;

/// Configuration for [`crate::spsc::Spsc`].
#[derive(Debug, Clone, Copy)]
pub struct SpscConfig {
    pub capacity: usize,
}

impl SpscConfig {
    pub const fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "SPSC capacity must be a power of two");
        assert!(capacity >= 2, "SPSC capacity must be at least 2");
        SpscConfig { capacity }
    }
}

pub const MARKET_UPDATE_QUEUE: SpscConfig = SpscConfig::new(262_144);
pub const ORDER_RESPONSE_QUEUE: SpscConfig = SpscConfig::new(65_536);
pub const ORDER_REQUEST_QUEUE: SpscConfig = SpscConfig::new(65_536);

/// Configuration for [`crate::mpmc::Mpmc`]. `capacity` is rounded up to the
/// next power of two (capped at 65,536) by the queue itself.
#[derive(Debug, Clone, Copy)]
pub struct MpmcConfig {
    pub capacity: usize,
}

impl MpmcConfig {
    pub const fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "MPMC capacity must be at least 2");
        MpmcConfig { capacity }
    }
}

/// Error returned by [`PoolConfig::try_new`] when a pool would be
/// constructed with invalid parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pool block_size must be at least 64 bytes, got {0}")]
    BlockSizeTooSmall(usize),
    #[error("pool must have at least one block, got {0}")]
    NoBlocks(usize),
}

/// Configuration for [`crate::pool::Pool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub block_size: usize,
    pub num_blocks: usize,
    pub numa_node: Option<u32>,
    pub zero_policy: ZeroPolicy,
}

impl PoolConfig {
    /// Builds a config, panicking on invalid parameters. Used for the `const`
    /// presets below, where a fallible constructor cannot be used.
    pub const fn new(block_size: usize, num_blocks: usize) -> Self {
        assert!(block_size >= 64, "pool block_size must be at least 64 bytes");
        assert!(num_blocks > 0, "pool must have at least one block");
        PoolConfig {
            block_size,
            num_blocks,
            numa_node: None,
            zero_policy: ZeroPolicy::None,
        }
    }

    /// Fallible counterpart to [`PoolConfig::new`], for callers building a
    /// pool from externally supplied (non-`const`) parameters.
    pub fn try_new(block_size: usize, num_blocks: usize) -> Result<Self, PoolError> {
        if block_size < 64 {
            return Err(PoolError::BlockSizeTooSmall(block_size));
        }
        if num_blocks == 0 {
            return Err(PoolError::NoBlocks(num_blocks));
        }
        Ok(PoolConfig {
            block_size,
            num_blocks,
            numa_node: None,
            zero_policy: ZeroPolicy::None,
        })
    }

    pub const fn with_numa_node(mut self, node: u32) -> Self {
        self.numa_node = Some(node);
        self
    }

    pub const fn with_zero_policy(mut self, policy: ZeroPolicy) -> Self {
        self.zero_policy = policy;
        self
    }
}

pub const REQUEST_POOL: PoolConfig = PoolConfig::new(64, 10_000);
pub const RESPONSE_POOL: PoolConfig = PoolConfig::new(64, 10_000);
pub const UPDATE_POOL: PoolConfig = PoolConfig::new(64, 100_000);

/// Configuration for [`crate::logger::Logger`].
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub spin_count: u32,
    pub flush_interval_ms: u64,
    pub flush_batch_threshold: usize,
    pub file_path: std::path::PathBuf,
    pub writer_core: Option<usize>,
}

impl LoggerConfig {
    pub fn new(file_path: impl Into<std::path::PathBuf>) -> Self {
        LoggerConfig {
            queue_capacity: 4096,
            batch_size: 1024,
            spin_count: 1000,
            flush_interval_ms: 1,
            flush_batch_threshold: 256,
            file_path: file_path.into(),
            writer_core: None,
        }
    }

    pub fn with_writer_core(mut self, core: usize) -> Self {
        self.writer_core = Some(core);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

/// Configuration for [`crate::engine::EventLoop`].
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub engine_core: Option<usize>,
    pub k_market: usize,
    pub k_response: usize,
    pub max_tickers: usize,
    pub max_levels: usize,
}

impl EngineConfig {
    pub const fn new(max_tickers: usize) -> Self {
        EngineConfig {
            engine_core: None,
            k_market: 100,
            k_response: 10,
            max_tickers,
            max_levels: 20,
        }
    }

    pub const fn with_engine_core(mut self, core: usize) -> Self {
        self.engine_core = Some(core);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::new(8)
    }
}
