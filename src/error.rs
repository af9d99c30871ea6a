use thiserror::Error;

/// Error types for pool construction, population and reclamation.
///
/// An empty pool is not an error: [`crate::ObjectPool::acquire`] signals it
/// by returning `None` and the caller decides how to fall back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Rejected argument or unsupported configuration.
    #[error("invalid argument: {reason}")]
    Invalid {
        /// What was rejected.
        reason: &'static str,
    },
    /// A backing allocation for a shard failed.
    #[error("shard allocation of {bytes} bytes failed")]
    OutOfMemory {
        /// Size of the allocation that failed.
        bytes: usize,
    },
    /// Every shard rejected the enqueue.
    ///
    /// For `release` this indicates a caller bug (most likely a double
    /// release), since the sum of shard capacities always covers the pool's
    /// own objects.
    #[error("all shards are full")]
    Full,
}
