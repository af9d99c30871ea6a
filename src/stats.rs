//! Optional per-shard counters.
//!
//! Disabled by default; when enabled via [`crate::PoolConfig::with_stats`]
//! each shard counts its own traffic with relaxed atomics, so the counters
//! inherit the pool's locality instead of becoming a shared hot spot.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters owned by a single shard.
#[derive(Debug, Default)]
pub(crate) struct ShardStats {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) releases: AtomicU64,
    pub(crate) remote_acquires: AtomicU64,
}

impl ShardStats {
    #[inline]
    pub(crate) fn record_hit(&self, walked: bool) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        if walked {
            self.remote_acquires.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }
}

/// Aggregated snapshot over all shards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquires that returned an object.
    pub acquire_hits: u64,
    /// Acquires that walked every shard and found the pool empty.
    pub acquire_misses: u64,
    /// Successful releases.
    pub releases: u64,
    /// Acquires satisfied by a shard other than the caller's home shard.
    pub remote_acquires: u64,
}

impl PoolStats {
    pub(crate) fn absorb(&mut self, shard: &ShardStats) {
        self.acquire_hits += shard.hits.load(Ordering::Relaxed);
        self.acquire_misses += shard.misses.load(Ordering::Relaxed);
        self.releases += shard.releases.load(Ordering::Relaxed);
        self.remote_acquires += shard.remote_acquires.load(Ordering::Relaxed);
    }
}
